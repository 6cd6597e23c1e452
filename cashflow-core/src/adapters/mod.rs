//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the BalanceStore port
//! - A REST client and a JSON-RPC client for the PageFetcher port
//! - PagedTransactionSource, the pagination loop serving TransactionSource
//!   over either fetcher

pub mod duckdb;
pub mod rest;
pub mod rpc;
pub mod transactions;
