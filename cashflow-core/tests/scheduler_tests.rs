//! Scheduler behavior tests
//!
//! The transaction source is mocked so a cycle can be held open on purpose;
//! persistence goes through a real in-memory DuckDB store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::{watch, Semaphore};

use cashflow_core::adapters::duckdb::DuckDbBalanceStore;
use cashflow_core::domain::result::Result;
use cashflow_core::domain::Transaction;
use cashflow_core::ports::{BalanceStore, TransactionSource};
use cashflow_core::services::{BalanceService, SchedulerService};

/// Source whose fetches block until permits are released
struct GatedSource {
    gate: Semaphore,
    calls: AtomicUsize,
}

impl GatedSource {
    fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }
}

#[async_trait]
impl TransactionSource for GatedSource {
    async fn get_all(&self) -> Result<Vec<Transaction>> {
        self.get_by_date(chrono::Utc::now().date_naive()).await
    }

    async fn get_by_date(&self, _date: NaiveDate) -> Result<Vec<Transaction>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let permit = self.gate.acquire().await.expect("gate closed");
        permit.forget();
        Ok(vec![])
    }

    async fn get_by_period(&self, _start: NaiveDate, _end: NaiveDate) -> Result<Vec<Transaction>> {
        self.get_all().await
    }
}

fn create_scheduler(
    interval: Duration,
) -> (Arc<SchedulerService>, Arc<GatedSource>, Arc<DuckDbBalanceStore>) {
    let store = Arc::new(DuckDbBalanceStore::open_in_memory(None).unwrap());
    store.ensure_schema().unwrap();

    let source = Arc::new(GatedSource::new());
    let balance_service = Arc::new(BalanceService::new(
        source.clone(),
        store.clone() as Arc<dyn BalanceStore>,
    ));
    let scheduler = Arc::new(SchedulerService::new(balance_service, interval));
    (scheduler, source, store)
}

/// A tick that fires while the previous cycle is still in flight is skipped;
/// exactly one process call is observed for the window.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_overlapping_ticks_are_skipped() {
    let (scheduler, source, _store) = create_scheduler(Duration::from_millis(100));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.run(shutdown_rx).await })
    };

    // Several ticks elapse while the first cycle sits blocked on the gate
    tokio::time::sleep(Duration::from_millis(450)).await;

    // Stop the loop before releasing so no new cycle can start
    shutdown_tx.send(true).unwrap();
    source.release(10);

    tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("scheduler did not stop")
        .unwrap();

    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

/// Once a cycle finishes, the next tick runs a fresh one
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_next_tick_runs_after_cycle_completes() {
    let (scheduler, source, store) = create_scheduler(Duration::from_millis(100));

    // Both cycles may pass immediately
    source.release(10);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.run(shutdown_rx).await })
    };

    tokio::time::sleep(Duration::from_millis(450)).await;
    shutdown_tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("scheduler did not stop")
        .unwrap();

    assert!(source.calls.load(Ordering::SeqCst) >= 2);

    // Cycles persisted today's balance
    let today = chrono::Utc::now().date_naive();
    let stored = store.get_by_date(today).await.unwrap();
    assert!(stored.is_some());
}

/// An errored cycle is absorbed and the loop keeps ticking
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cycle_errors_do_not_kill_the_loop() {
    struct FailingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TransactionSource for FailingSource {
        async fn get_all(&self) -> Result<Vec<Transaction>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(cashflow_core::domain::result::Error::communication(
                "upstream down",
            ))
        }

        async fn get_by_date(&self, _date: NaiveDate) -> Result<Vec<Transaction>> {
            self.get_all().await
        }

        async fn get_by_period(
            &self,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<Transaction>> {
            self.get_all().await
        }
    }

    let store = Arc::new(DuckDbBalanceStore::open_in_memory(None).unwrap());
    store.ensure_schema().unwrap();
    let source = Arc::new(FailingSource {
        calls: AtomicUsize::new(0),
    });
    let balance_service = Arc::new(BalanceService::new(
        source.clone(),
        store.clone() as Arc<dyn BalanceStore>,
    ));
    let scheduler = Arc::new(SchedulerService::new(
        balance_service,
        Duration::from_millis(100),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.run(shutdown_rx).await })
    };

    tokio::time::sleep(Duration::from_millis(450)).await;
    shutdown_tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("scheduler did not stop")
        .unwrap();

    // Every tick ran a fresh cycle despite the failures
    assert!(source.calls.load(Ordering::SeqCst) >= 2);
}
