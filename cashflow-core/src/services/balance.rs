//! Balance service - daily balance computation and queries

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::KeyedLocks;
use crate::domain::result::{Error, Result};
use crate::domain::{BalanceSummary, DailyBalance, TransactionKind};
use crate::ports::{BalanceStore, TransactionSource, MAX_PAGE_SIZE};

/// Page size used when a listing request does not specify one
const DEFAULT_PAGE_SIZE: u32 = 10;

/// Computes, persists, and serves daily balances.
///
/// Holds its own per-date lock registry so two concurrent recomputations of
/// the same date (a scheduled run racing an on-demand trigger) serialize
/// instead of interleaving reads and writes.
pub struct BalanceService {
    source: Arc<dyn TransactionSource>,
    store: Arc<dyn BalanceStore>,
    date_locks: KeyedLocks,
}

impl BalanceService {
    pub fn new(source: Arc<dyn TransactionSource>, store: Arc<dyn BalanceStore>) -> Self {
        Self {
            source,
            store,
            date_locks: KeyedLocks::new(),
        }
    }

    /// Compute and persist the balance for one calendar date.
    ///
    /// Sums the date's transactions by kind, chains onto the previous day's
    /// stored final balance (zero when none exists), and upserts the result.
    /// Reprocessing a date overwrites it; nothing is written if the fetch,
    /// the previous-day lookup, or the save fails.
    pub async fn process(&self, date: NaiveDate) -> Result<DailyBalance> {
        let _guard = self.date_locks.lock(&date.to_string()).await;

        let transactions = self.source.get_by_date(date).await?;

        let mut total_credits = Decimal::ZERO;
        let mut total_debits = Decimal::ZERO;
        for tx in &transactions {
            match tx.kind {
                TransactionKind::Credit => total_credits += tx.amount,
                TransactionKind::Debit => total_debits += tx.amount,
            }
        }

        let previous_day = date
            .pred_opt()
            .ok_or_else(|| Error::validation(format!("date {} has no previous day", date)))?;
        let previous_balance = self
            .store
            .get_by_date(previous_day)
            .await?
            .map(|b| b.final_balance)
            .unwrap_or(Decimal::ZERO);

        let balance = DailyBalance::new(date, previous_balance, total_credits, total_debits);
        let persisted = self.store.save(&balance).await?;

        info!(
            %date,
            transactions = transactions.len(),
            final_balance = %persisted.final_balance,
            "processed daily balance"
        );
        Ok(persisted)
    }

    /// Process every date in `[start, end]` in ascending order.
    ///
    /// Ascending order is a hard requirement: day N's previous balance is
    /// day N-1's stored result, so N-1 must be persisted first.
    pub async fn process_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBalance>> {
        if start > end {
            return Err(Error::validation(format!(
                "range start {} is after end {}",
                start, end
            )));
        }

        let mut results = Vec::new();
        let mut current = start;
        while current <= end {
            results.push(self.process(current).await?);
            current = match current.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
        Ok(results)
    }

    /// Get the stored balance for a date, if any
    pub async fn get_balance(&self, date: NaiveDate) -> Result<Option<DailyBalance>> {
        self.store.get_by_date(date).await
    }

    /// Get stored balances with `start <= date <= end`, ascending
    pub async fn get_by_period(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBalance>> {
        if start > end {
            return Err(Error::validation(format!(
                "range start {} is after end {}",
                start, end
            )));
        }
        self.store.get_by_period(start, end).await
    }

    /// Get one page of balance summaries, newest date first.
    ///
    /// Page and size are normalized: zero page or size falls back to the
    /// defaults, size is capped at [`MAX_PAGE_SIZE`].
    pub async fn get_paginated(&self, page: u32, size: u32) -> Result<PaginatedBalances> {
        let page = page.max(1);
        let size = if size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            size.min(MAX_PAGE_SIZE)
        };

        let (items, total_count) = self.store.get_paginated(page, size).await?;
        let total_pages = total_count.div_ceil(size as u64) as u32;

        Ok(PaginatedBalances {
            items: items.iter().map(DailyBalance::summary).collect(),
            page_number: page,
            page_size: size,
            total_count,
            total_pages,
        })
    }

    /// Get the compact summary for a date; NotFound when no balance exists
    pub async fn summary(&self, date: NaiveDate) -> Result<BalanceSummary> {
        self.store
            .get_by_date(date)
            .await?
            .map(|b| b.summary())
            .ok_or_else(|| Error::not_found(format!("no balance stored for {}", date)))
    }
}

/// One page of balance summaries plus pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedBalances {
    pub items: Vec<BalanceSummary>,
    pub page_number: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u32,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::domain::Transaction;

    /// Transaction source over a fixed map, counting fetches
    struct FixedSource {
        by_date: HashMap<NaiveDate, Vec<Transaction>>,
        calls: AtomicUsize,
    }

    impl FixedSource {
        fn new(by_date: HashMap<NaiveDate, Vec<Transaction>>) -> Self {
            Self {
                by_date,
                calls: AtomicUsize::new(0),
            }
        }

        fn empty() -> Self {
            Self::new(HashMap::new())
        }
    }

    #[async_trait]
    impl TransactionSource for FixedSource {
        async fn get_all(&self) -> Result<Vec<Transaction>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.by_date.values().flatten().cloned().collect())
        }

        async fn get_by_date(&self, date: NaiveDate) -> Result<Vec<Transaction>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.by_date.get(&date).cloned().unwrap_or_default())
        }

        async fn get_by_period(
            &self,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Vec<Transaction>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .by_date
                .iter()
                .filter(|(date, _)| **date >= start && **date <= end)
                .flat_map(|(_, txs)| txs.clone())
                .collect())
        }
    }

    /// Balance store over a plain map, no cache
    struct MapStore {
        rows: Mutex<HashMap<NaiveDate, DailyBalance>>,
        saves: AtomicUsize,
    }

    impl MapStore {
        fn new() -> Self {
            Self {
                rows: Mutex::new(HashMap::new()),
                saves: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BalanceStore for MapStore {
        async fn save(&self, balance: &DailyBalance) -> Result<DailyBalance> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            let mut rows = self.rows.lock().unwrap();
            let persisted = match rows.get(&balance.balance_date) {
                Some(existing) => DailyBalance {
                    id: existing.id,
                    created_at: existing.created_at,
                    updated_at: Utc::now(),
                    ..balance.clone()
                },
                None => balance.clone(),
            };
            rows.insert(persisted.balance_date, persisted.clone());
            Ok(persisted)
        }

        async fn get_by_date(&self, date: NaiveDate) -> Result<Option<DailyBalance>> {
            Ok(self.rows.lock().unwrap().get(&date).cloned())
        }

        async fn get_by_period(
            &self,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Vec<DailyBalance>> {
            let mut rows: Vec<DailyBalance> = self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|b| b.balance_date >= start && b.balance_date <= end)
                .cloned()
                .collect();
            rows.sort_by_key(|b| b.balance_date);
            Ok(rows)
        }

        async fn get_all(&self) -> Result<Vec<DailyBalance>> {
            let mut rows: Vec<DailyBalance> =
                self.rows.lock().unwrap().values().cloned().collect();
            rows.sort_by_key(|b| b.balance_date);
            Ok(rows)
        }

        async fn get_paginated(&self, page: u32, size: u32) -> Result<(Vec<DailyBalance>, u64)> {
            let mut rows: Vec<DailyBalance> =
                self.rows.lock().unwrap().values().cloned().collect();
            rows.sort_by_key(|b| std::cmp::Reverse(b.balance_date));
            let total = rows.len() as u64;
            let items = rows
                .into_iter()
                .skip(((page - 1) * size) as usize)
                .take(size as usize)
                .collect();
            Ok((items, total))
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn credit(id: i64, day: NaiveDate, cents: i64) -> Transaction {
        Transaction::new(
            id,
            Decimal::new(cents, 2),
            TransactionKind::Credit,
            day.and_hms_opt(10, 0, 0).unwrap().and_utc(),
        )
    }

    fn debit(id: i64, day: NaiveDate, cents: i64) -> Transaction {
        Transaction::new(
            id,
            Decimal::new(cents, 2),
            TransactionKind::Debit,
            day.and_hms_opt(10, 0, 0).unwrap().and_utc(),
        )
    }

    fn service(source: FixedSource, store: MapStore) -> (BalanceService, Arc<MapStore>) {
        let store = Arc::new(store);
        let service = BalanceService::new(Arc::new(source), store.clone());
        (service, store)
    }

    #[tokio::test]
    async fn test_process_sums_by_kind_over_previous_balance() {
        let today = date(2024, 1, 15);
        let yesterday = date(2024, 1, 14);

        let store = MapStore::new();
        // Seed yesterday at 200.00
        store
            .save(&DailyBalance::new(
                yesterday,
                Decimal::ZERO,
                Decimal::new(20000, 2),
                Decimal::ZERO,
            ))
            .await
            .unwrap();

        let mut by_date = HashMap::new();
        by_date.insert(
            today,
            vec![
                credit(1, today, 10000),
                credit(2, today, 5000),
                debit(3, today, 3000),
            ],
        );

        let (service, _) = service(FixedSource::new(by_date), store);
        let balance = service.process(today).await.unwrap();

        assert_eq!(balance.previous_balance, Decimal::new(20000, 2));
        assert_eq!(balance.total_credits, Decimal::new(15000, 2));
        assert_eq!(balance.total_debits, Decimal::new(3000, 2));
        assert_eq!(balance.final_balance, Decimal::new(32000, 2));
    }

    #[tokio::test]
    async fn test_process_without_prior_day_starts_from_zero() {
        let today = date(2024, 1, 15);
        let mut by_date = HashMap::new();
        by_date.insert(today, vec![credit(1, today, 10000), debit(2, today, 3000)]);

        let (service, _) = service(FixedSource::new(by_date), MapStore::new());
        let balance = service.process(today).await.unwrap();

        assert_eq!(balance.previous_balance, Decimal::ZERO);
        assert_eq!(balance.final_balance, Decimal::new(7000, 2));
    }

    #[tokio::test]
    async fn test_process_day_with_no_transactions_keeps_previous() {
        let today = date(2024, 1, 15);
        let yesterday = date(2024, 1, 14);

        let store = MapStore::new();
        store
            .save(&DailyBalance::new(
                yesterday,
                Decimal::ZERO,
                Decimal::new(5000, 2),
                Decimal::ZERO,
            ))
            .await
            .unwrap();

        let (service, _) = service(FixedSource::empty(), store);
        let balance = service.process(today).await.unwrap();

        assert_eq!(balance.total_credits, Decimal::ZERO);
        assert_eq!(balance.total_debits, Decimal::ZERO);
        assert_eq!(balance.final_balance, Decimal::new(5000, 2));
    }

    #[tokio::test]
    async fn test_range_validation_issues_no_fetches() {
        let source = FixedSource::empty();
        let (service, store) = service(source, MapStore::new());

        let result = service
            .process_range(date(2024, 1, 10), date(2024, 1, 5))
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);

        let result = service
            .get_by_period(date(2024, 1, 10), date(2024, 1, 5))
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_process_range_chains_days_in_order() {
        let day1 = date(2024, 1, 1);
        let day2 = date(2024, 1, 2);
        let day3 = date(2024, 1, 3);

        let mut by_date = HashMap::new();
        by_date.insert(day1, vec![credit(1, day1, 10000)]);
        by_date.insert(day2, vec![debit(2, day2, 2500)]);
        by_date.insert(day3, vec![credit(3, day3, 500)]);

        let (service, _) = service(FixedSource::new(by_date), MapStore::new());
        let balances = service.process_range(day1, day3).await.unwrap();

        assert_eq!(balances.len(), 3);
        assert_eq!(balances[0].final_balance, Decimal::new(10000, 2));
        assert_eq!(balances[1].previous_balance, Decimal::new(10000, 2));
        assert_eq!(balances[1].final_balance, Decimal::new(7500, 2));
        assert_eq!(balances[2].final_balance, Decimal::new(8000, 2));
    }

    #[tokio::test]
    async fn test_reprocessing_overwrites_instead_of_accumulating() {
        let today = date(2024, 1, 15);
        let mut by_date = HashMap::new();
        by_date.insert(today, vec![credit(1, today, 10000)]);

        let (service, store) = service(FixedSource::new(by_date), MapStore::new());

        let first = service.process(today).await.unwrap();
        let second = service.process(today).await.unwrap();

        assert_eq!(first.final_balance, second.final_balance);
        assert_eq!(first.id, second.id);
        assert_eq!(store.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_paginated_normalizes_page_and_size() {
        let (service, _) = service(FixedSource::empty(), MapStore::new());

        let page = service.get_paginated(0, 0).await.unwrap();
        assert_eq!(page.page_number, 1);
        assert_eq!(page.page_size, DEFAULT_PAGE_SIZE);

        let page = service.get_paginated(1, 5000).await.unwrap();
        assert_eq!(page.page_size, MAX_PAGE_SIZE);
    }

    #[tokio::test]
    async fn test_paginated_counts_pages() {
        let store = MapStore::new();
        for day in 1u32..=25 {
            store
                .save(&DailyBalance::new(
                    date(2024, 1, day),
                    Decimal::ZERO,
                    Decimal::new(day as i64 * 100, 2),
                    Decimal::ZERO,
                ))
                .await
                .unwrap();
        }

        let (service, _) = service(FixedSource::empty(), store);
        let page = service.get_paginated(3, 10).await.unwrap();

        assert_eq!(page.total_count, 25);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 5);
        // Newest date first
        assert!(page.items[0].balance_date > page.items[1].balance_date);
    }

    #[tokio::test]
    async fn test_summary_not_found() {
        let (service, _) = service(FixedSource::empty(), MapStore::new());
        let result = service.summary(date(2024, 1, 15)).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
