//! Paginated transaction source
//!
//! One pagination loop serves both upstream transports. The loop is
//! parameterized only by "fetch page N of size S" ([`PageFetcher`]), so the
//! REST and RPC clients stay thin and cannot drift apart.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::result::Result;
use crate::domain::{Transaction, TransactionKind};
use crate::ports::{PageFetcher, TransactionQuery, TransactionSource};

/// Page size requested from the upstream when none is configured
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// A transaction as serialized by the upstream API, for either transport
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub id: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "crate::domain::transaction::deserialize_amount")]
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(default)]
    pub origin: Option<String>,
    pub transaction_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub message_id: Option<String>,
}

impl TransactionDto {
    pub fn into_transaction(self) -> Transaction {
        Transaction {
            id: self.id,
            amount: self.amount,
            kind: self.kind,
            transaction_date: self.transaction_date,
            description: self.description,
            origin: self.origin,
            created_at: self.created_at,
            message_id: self.message_id,
        }
    }
}

/// [`TransactionSource`] over any [`PageFetcher`].
///
/// Requests page 1, then each subsequent page, accumulating items until the
/// upstream reports no further pages or returns an empty page. Fetching is
/// fail-fast on every page: a failure anywhere fails the whole call and
/// discards what was accumulated, so callers never compute from a truncated
/// transaction set.
pub struct PagedTransactionSource {
    fetcher: Arc<dyn PageFetcher>,
    page_size: u32,
}

impl PagedTransactionSource {
    pub fn new(fetcher: Arc<dyn PageFetcher>, page_size: u32) -> Self {
        Self {
            fetcher,
            page_size: page_size.max(1),
        }
    }

    async fn fetch_all_pages(&self, query: TransactionQuery) -> Result<Vec<Transaction>> {
        let mut items = Vec::new();
        let mut page_number = 1u32;

        loop {
            let page = self
                .fetcher
                .fetch_page(query, page_number, self.page_size)
                .await?;

            if page.items.is_empty() {
                break;
            }
            items.extend(page.items);

            if !page.has_next_page {
                break;
            }
            page_number += 1;
        }

        debug!(pages = page_number, count = items.len(), "fetched transactions");
        Ok(items)
    }
}

#[async_trait]
impl TransactionSource for PagedTransactionSource {
    async fn get_all(&self) -> Result<Vec<Transaction>> {
        info!("fetching all transactions from upstream");
        self.fetch_all_pages(TransactionQuery::All).await
    }

    async fn get_by_date(&self, date: NaiveDate) -> Result<Vec<Transaction>> {
        info!(%date, "fetching transactions for date");
        self.fetch_all_pages(TransactionQuery::ByDate(date)).await
    }

    async fn get_by_period(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Transaction>> {
        info!(%start, %end, "fetching transactions for period");
        self.fetch_all_pages(TransactionQuery::ByPeriod { start, end })
            .await
    }
}
