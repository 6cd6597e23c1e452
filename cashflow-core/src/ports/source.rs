//! Transaction source port
//!
//! Defines the interface for fetching transactions from the upstream
//! transaction API. The upstream serves bounded pages; the source hides the
//! pagination behind full-result-set operations.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::result::Result;
use crate::domain::Transaction;

/// Which transactions a fetch targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionQuery {
    All,
    ByDate(NaiveDate),
    ByPeriod { start: NaiveDate, end: NaiveDate },
}

/// One bounded page as reported by the upstream
#[derive(Debug, Default)]
pub struct TransactionPage {
    pub items: Vec<Transaction>,
    pub has_next_page: bool,
}

/// A single page request against the upstream, however it is transported.
///
/// Two transports exist (the paginated REST envelope and the JSON-RPC call);
/// both reduce to "fetch page N of size S for this query", so the pagination
/// loop is written once against this trait.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(
        &self,
        query: TransactionQuery,
        page_number: u32,
        page_size: u32,
    ) -> Result<TransactionPage>;
}

/// Full-result-set access to the upstream transactions.
///
/// The source is read-only and authoritative; the core never writes to it.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Transaction>>;

    async fn get_by_date(&self, date: NaiveDate) -> Result<Vec<Transaction>>;

    async fn get_by_period(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Transaction>>;
}
