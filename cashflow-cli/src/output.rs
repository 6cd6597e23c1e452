//! Table rendering for balances

use cashflow_core::{BalanceSummary, DailyBalance};
use comfy_table::{ContentArrangement, Table};

/// Render one balance as vertical key-value pairs
pub fn balance_detail(balance: &DailyBalance) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec!["Date", &balance.balance_date.to_string()]);
    table.add_row(vec!["Previous balance", &balance.previous_balance.to_string()]);
    table.add_row(vec!["Total credits", &balance.total_credits.to_string()]);
    table.add_row(vec!["Total debits", &balance.total_debits.to_string()]);
    table.add_row(vec!["Final balance", &balance.final_balance.to_string()]);
    table.add_row(vec!["Updated at", &balance.updated_at.to_rfc3339()]);

    table
}

/// Render balances as one row per date
pub fn balance_rows(balances: &[DailyBalance]) -> Table {
    summary_rows(&balances.iter().map(DailyBalance::summary).collect::<Vec<_>>())
}

/// Render summaries as one row per date
pub fn summary_rows(summaries: &[BalanceSummary]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Date", "Previous", "Credits", "Debits", "Final"]);

    for summary in summaries {
        table.add_row(vec![
            summary.balance_date.to_string(),
            summary.previous_balance.to_string(),
            summary.total_credits.to_string(),
            summary.total_debits.to_string(),
            summary.final_balance.to_string(),
        ]);
    }

    table
}
