//! Cashflow Core - daily cash-flow balance engine
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Transaction, DailyBalance)
//! - **ports**: Trait definitions for external dependencies (BalanceStore, TransactionSource)
//! - **services**: Business logic orchestration (calculator, scheduler)
//! - **adapters**: Concrete implementations (DuckDB, REST/RPC transaction clients)

pub mod adapters;
pub mod cache;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use adapters::duckdb::DuckDbBalanceStore;
use adapters::rest::RestPageFetcher;
use adapters::rpc::RpcPageFetcher;
use adapters::transactions::PagedTransactionSource;
use cache::MemoryCache;
use config::{Config, Transport};
use ports::{BalanceStore, PageFetcher, TransactionSource};
use services::{BalanceService, SchedulerService};

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result};
pub use domain::{BalanceSummary, DailyBalance, Transaction, TransactionKind};

/// Database file inside the application directory
pub const DB_FILENAME: &str = "cashflow.duckdb";

/// Main context for cashflow operations
///
/// This is the primary entry point for all business logic. Every component
/// is constructed exactly once here and handed around by reference - the
/// scheduler's guard and the cache's lock registry live inside their
/// instances, never in ambient state.
pub struct CashflowContext {
    pub config: Config,
    pub cache: Option<Arc<MemoryCache>>,
    pub store: Arc<DuckDbBalanceStore>,
    pub balance_service: Arc<BalanceService>,
    pub scheduler_service: Arc<SchedulerService>,
}

impl CashflowContext {
    /// Create a new cashflow context rooted at `app_dir`
    pub fn new(app_dir: &Path) -> Result<Self> {
        let config = Config::load(app_dir)?;

        let cache = config
            .cache
            .enabled
            .then(|| Arc::new(MemoryCache::new(config.cache_ttl())));

        let db_path = app_dir.join(DB_FILENAME);
        let store = Arc::new(DuckDbBalanceStore::new(&db_path, cache.clone())?);
        store.ensure_schema()?;

        let fetcher: Arc<dyn PageFetcher> = match config.transaction_api.transport {
            Transport::Rest => Arc::new(RestPageFetcher::with_timeout(
                &config.transaction_api.base_url,
                config.request_timeout(),
            )?),
            Transport::Rpc => Arc::new(RpcPageFetcher::with_timeout(
                &config.transaction_api.base_url,
                config.request_timeout(),
            )?),
        };
        let source: Arc<dyn TransactionSource> = Arc::new(PagedTransactionSource::new(
            fetcher,
            config.transaction_api.page_size,
        ));

        let balance_service = Arc::new(BalanceService::new(
            source,
            Arc::clone(&store) as Arc<dyn BalanceStore>,
        ));
        let scheduler_service = Arc::new(SchedulerService::new(
            Arc::clone(&balance_service),
            config.scheduler_interval(),
        ));

        Ok(Self {
            config,
            cache,
            store,
            balance_service,
            scheduler_service,
        })
    }
}
