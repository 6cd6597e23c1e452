//! Show commands - single-date lookups

use anyhow::Result;
use chrono::NaiveDate;
use colored::Colorize;

use super::get_context;
use crate::output;

pub async fn run(date: NaiveDate, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let balance = ctx.balance_service.get_balance(date).await?;

    let Some(balance) = balance else {
        anyhow::bail!("No balance stored for {}", date);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&balance)?);
        return Ok(());
    }

    println!("{}", format!("Balance for {}", date).bold());
    println!();
    println!("{}", output::balance_detail(&balance));
    Ok(())
}

pub async fn run_summary(date: NaiveDate, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let summary = ctx.balance_service.summary(date).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", output::summary_rows(std::slice::from_ref(&summary)));
    Ok(())
}
