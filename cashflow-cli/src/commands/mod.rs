//! CLI command implementations

pub mod list;
pub mod process;
pub mod run;
pub mod show;

use std::path::PathBuf;

use anyhow::{Context, Result};
use cashflow_core::CashflowContext;

/// Get the application directory from environment or default
pub fn get_app_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CASHFLOW_DIR") {
        PathBuf::from(dir)
    } else {
        dirs::home_dir()
            .expect("Could not find home directory")
            .join(".cashflow")
    }
}

/// Get or create the cashflow context
pub fn get_context() -> Result<CashflowContext> {
    let app_dir = get_app_dir();

    std::fs::create_dir_all(&app_dir)
        .with_context(|| format!("Failed to create cashflow directory: {:?}", app_dir))?;

    CashflowContext::new(&app_dir).context("Failed to initialize cashflow context")
}
