//! List commands - range and paginated listings

use anyhow::Result;
use chrono::NaiveDate;
use colored::Colorize;

use super::get_context;
use crate::output;

pub async fn run_period(start: NaiveDate, end: NaiveDate, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let balances = ctx.balance_service.get_by_period(start, end).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&balances)?);
        return Ok(());
    }

    if balances.is_empty() {
        println!("No balances stored between {} and {}", start, end);
        return Ok(());
    }

    println!("{}", format!("Balances from {} to {}", start, end).bold());
    println!();
    println!("{}", output::balance_rows(&balances));
    Ok(())
}

pub async fn run_paginated(page: u32, size: u32, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let listing = ctx.balance_service.get_paginated(page, size).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if listing.items.is_empty() {
        println!("No balances stored");
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "Daily balances - page {} of {} ({} total)",
            listing.page_number, listing.total_pages, listing.total_count
        )
        .bold()
    );
    println!();
    println!("{}", output::summary_rows(&listing.items));
    Ok(())
}
