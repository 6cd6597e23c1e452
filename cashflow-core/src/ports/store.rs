//! Balance store port - persistence abstraction

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::result::Result;
use crate::domain::DailyBalance;

/// Largest page size a paginated read will serve
pub const MAX_PAGE_SIZE: u32 = 100;

/// Persistence for daily balances, one row per calendar date.
///
/// Implementations (adapters) provide the actual storage. Reads are expected
/// to go through whatever caching layer the adapter carries; writes must
/// leave no cached view of the affected date behind.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Upsert keyed by balance date.
    ///
    /// Inserting assigns the row's id and created_at once; re-saving an
    /// existing date overwrites the four amounts and updated_at only.
    /// Returns the persisted row.
    async fn save(&self, balance: &DailyBalance) -> Result<DailyBalance>;

    /// Get the balance for a single calendar date
    async fn get_by_date(&self, date: NaiveDate) -> Result<Option<DailyBalance>>;

    /// Get balances with `start <= date <= end`, ascending
    async fn get_by_period(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyBalance>>;

    /// Get every stored balance
    async fn get_all(&self) -> Result<Vec<DailyBalance>>;

    /// Get one page ordered by date descending, plus the total row count.
    /// Page and size must already be normalized by the caller; adapters may
    /// clamp defensively but not re-interpret.
    async fn get_paginated(&self, page: u32, size: u32) -> Result<(Vec<DailyBalance>, u64)>;
}
