//! Process commands - trigger balance recomputation

use anyhow::Result;
use chrono::NaiveDate;
use colored::Colorize;

use super::get_context;
use crate::output;

pub async fn run(date: NaiveDate, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let balance = ctx.balance_service.process(date).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&balance)?);
        return Ok(());
    }

    println!("{}", format!("Processed balance for {}", date).bold());
    println!();
    println!("{}", output::balance_detail(&balance));
    Ok(())
}

pub async fn run_range(start: NaiveDate, end: NaiveDate, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let balances = ctx.balance_service.process_range(start, end).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&balances)?);
        return Ok(());
    }

    println!(
        "{}",
        format!("Processed {} balances from {} to {}", balances.len(), start, end).bold()
    );
    println!();
    println!("{}", output::balance_rows(&balances));
    Ok(())
}
