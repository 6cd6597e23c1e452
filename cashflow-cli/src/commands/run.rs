//! Run command - the periodic scheduler loop

use anyhow::Result;
use tokio::sync::watch;

use super::get_context;

pub async fn run() -> Result<()> {
    let ctx = get_context()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = ctx.scheduler_service.clone();
    let runner = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    println!(
        "Scheduler running every {}s, Ctrl-C to stop",
        ctx.config.scheduler.interval_secs
    );

    tokio::signal::ctrl_c().await?;
    println!("Stopping; waiting for any in-flight cycle to finish");

    shutdown_tx.send(true)?;
    runner.await?;
    Ok(())
}
