//! DuckDB balance store implementation

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use duckdb::{params, Connection};
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use crate::cache::MemoryCache;
use crate::domain::result::{Error, Result};
use crate::domain::DailyBalance;
use crate::migrations::MIGRATIONS;
use crate::ports::{BalanceStore, MAX_PAGE_SIZE};

const CACHE_KEY_PREFIX: &str = "daily_balance:";

fn date_key(date: NaiveDate) -> String {
    format!("{}date:{}", CACHE_KEY_PREFIX, date.format("%Y%m%d"))
}

fn period_key(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "{}period:{}:{}",
        CACHE_KEY_PREFIX,
        start.format("%Y%m%d"),
        end.format("%Y%m%d")
    )
}

fn page_key(page: u32, size: u32) -> String {
    format!("{}page:{}:{}", CACHE_KEY_PREFIX, page, size)
}

fn all_key() -> String {
    format!("{}all", CACHE_KEY_PREFIX)
}

/// DuckDB-backed [`BalanceStore`] with an optional read-through cache.
///
/// Without a cache every read goes straight to the database; the store stays
/// fully functional, just slower. Amounts are written and read as strings
/// against DECIMAL(18,2) columns so no floating-point rounding ever occurs.
pub struct DuckDbBalanceStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    cache: Option<Arc<MemoryCache>>,
}

impl DuckDbBalanceStore {
    /// Open (or create) the balance database at `db_path`
    pub fn new(db_path: &Path, cache: Option<Arc<MemoryCache>>) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: db_path.to_path_buf(),
            cache,
        })
    }

    /// In-memory store, used by tests
    pub fn open_in_memory(cache: Option<Arc<MemoryCache>>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
            cache,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Apply any pending migrations.
    ///
    /// Each migration runs once and is recorded in sys_migrations, so this
    /// is safe to call on every startup.
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        let table_exists: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM information_schema.tables WHERE table_name = 'sys_migrations'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !table_exists {
            if let Some((name, sql)) = MIGRATIONS.iter().find(|(n, _)| *n == "000_migrations.sql") {
                conn.execute_batch(sql)?;
                conn.execute(
                    "INSERT INTO sys_migrations (migration_name) VALUES (?)",
                    [name],
                )?;
            }
        }

        let mut stmt = conn.prepare("SELECT migration_name FROM sys_migrations")?;
        let applied: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        for (name, sql) in MIGRATIONS.iter() {
            if *name == "000_migrations.sql" {
                continue;
            }
            if !applied.contains(&name.to_string()) {
                conn.execute_batch(sql)?;
                conn.execute(
                    "INSERT INTO sys_migrations (migration_name) VALUES (?)",
                    [name],
                )?;
                debug!(migration = %name, "applied migration");
            }
        }

        Ok(())
    }

    // === Plain database reads (cache factories fall back to these) ===

    const SELECT_COLUMNS: &'static str = "id, balance_date::VARCHAR, previous_balance::VARCHAR, \
         total_credits::VARCHAR, total_debits::VARCHAR, final_balance::VARCHAR, \
         created_at::VARCHAR, updated_at::VARCHAR";

    fn query_by_date(&self, date: NaiveDate) -> Result<Option<DailyBalance>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM daily_balances WHERE balance_date = ?::DATE",
            Self::SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let balance = stmt
            .query_map(params![date.to_string()], |row| Ok(row_to_balance(row)))?
            .filter_map(|r| r.ok())
            .next();
        Ok(balance)
    }

    fn query_by_period(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyBalance>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM daily_balances \
             WHERE balance_date >= ?::DATE AND balance_date <= ?::DATE \
             ORDER BY balance_date ASC",
            Self::SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let balances = stmt
            .query_map(params![start.to_string(), end.to_string()], |row| {
                Ok(row_to_balance(row))
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(balances)
    }

    fn query_all(&self) -> Result<Vec<DailyBalance>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM daily_balances ORDER BY balance_date ASC",
            Self::SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let balances = stmt
            .query_map([], |row| Ok(row_to_balance(row)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(balances)
    }

    fn query_paginated(&self, page: u32, size: u32) -> Result<(Vec<DailyBalance>, u64)> {
        let conn = self.conn.lock().unwrap();

        let total: i64 = conn.query_row("SELECT COUNT(*) FROM daily_balances", [], |row| {
            row.get(0)
        })?;

        let offset = (page as i64 - 1) * size as i64;
        let sql = format!(
            "SELECT {} FROM daily_balances ORDER BY balance_date DESC LIMIT ? OFFSET ?",
            Self::SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![size as i64, offset], |row| Ok(row_to_balance(row)))?
            .filter_map(|r| r.ok())
            .collect();

        Ok((items, total as u64))
    }

    fn upsert_row(&self, balance: &DailyBalance) -> Result<DailyBalance> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        let mut stmt = conn.prepare(
            "SELECT id, created_at::VARCHAR FROM daily_balances WHERE balance_date = ?::DATE",
        )?;
        let existing = stmt
            .query_map(params![balance.balance_date.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0).unwrap_or_default(),
                    row.get::<_, String>(1).unwrap_or_default(),
                ))
            })?
            .filter_map(|r| r.ok())
            .next();

        match existing {
            Some((id, created_at)) => {
                conn.execute(
                    "UPDATE daily_balances SET \
                     previous_balance = ?::DECIMAL(18,2), total_credits = ?::DECIMAL(18,2), \
                     total_debits = ?::DECIMAL(18,2), final_balance = ?::DECIMAL(18,2), \
                     updated_at = ?::TIMESTAMP \
                     WHERE balance_date = ?::DATE",
                    params![
                        balance.previous_balance.to_string(),
                        balance.total_credits.to_string(),
                        balance.total_debits.to_string(),
                        balance.final_balance.to_string(),
                        format_timestamp(now),
                        balance.balance_date.to_string(),
                    ],
                )?;

                Ok(DailyBalance {
                    id: Uuid::parse_str(&id)
                        .map_err(|e| Error::persistence(format!("corrupt row id: {}", e)))?,
                    balance_date: balance.balance_date,
                    previous_balance: balance.previous_balance,
                    total_credits: balance.total_credits,
                    total_debits: balance.total_debits,
                    final_balance: balance.final_balance,
                    created_at: parse_timestamp(&created_at),
                    updated_at: now,
                })
            }
            None => {
                conn.execute(
                    "INSERT INTO daily_balances \
                     (id, balance_date, previous_balance, total_credits, total_debits, \
                      final_balance, created_at, updated_at) \
                     VALUES (?, ?::DATE, ?::DECIMAL(18,2), ?::DECIMAL(18,2), ?::DECIMAL(18,2), \
                             ?::DECIMAL(18,2), ?::TIMESTAMP, ?::TIMESTAMP)",
                    params![
                        balance.id.to_string(),
                        balance.balance_date.to_string(),
                        balance.previous_balance.to_string(),
                        balance.total_credits.to_string(),
                        balance.total_debits.to_string(),
                        balance.final_balance.to_string(),
                        format_timestamp(now),
                        format_timestamp(now),
                    ],
                )?;

                Ok(DailyBalance {
                    id: balance.id,
                    balance_date: balance.balance_date,
                    previous_balance: balance.previous_balance,
                    total_credits: balance.total_credits,
                    total_debits: balance.total_debits,
                    final_balance: balance.final_balance,
                    created_at: now,
                    updated_at: now,
                })
            }
        }
    }

    /// Drop every cache entry that could serve a stale view of `date`:
    /// the date key itself plus all aggregate listings.
    fn invalidate(&self, date: NaiveDate) {
        if let Some(cache) = &self.cache {
            cache.remove(&date_key(date));
            cache.remove(&all_key());
            cache.remove_by_prefix(&format!("{}period:", CACHE_KEY_PREFIX));
            cache.remove_by_prefix(&format!("{}page:", CACHE_KEY_PREFIX));
        }
    }
}

#[async_trait]
impl BalanceStore for DuckDbBalanceStore {
    async fn save(&self, balance: &DailyBalance) -> Result<DailyBalance> {
        let persisted = self.upsert_row(balance)?;
        self.invalidate(persisted.balance_date);
        debug!(
            date = %persisted.balance_date,
            final_balance = %persisted.final_balance,
            "saved daily balance"
        );
        Ok(persisted)
    }

    async fn get_by_date(&self, date: NaiveDate) -> Result<Option<DailyBalance>> {
        match &self.cache {
            Some(cache) => {
                cache
                    .get_or_create(&date_key(date), None, || async {
                        self.query_by_date(date)
                    })
                    .await
            }
            None => self.query_by_date(date),
        }
    }

    async fn get_by_period(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyBalance>> {
        match &self.cache {
            Some(cache) => {
                cache
                    .get_or_create(&period_key(start, end), None, || async {
                        self.query_by_period(start, end)
                    })
                    .await
            }
            None => self.query_by_period(start, end),
        }
    }

    async fn get_all(&self) -> Result<Vec<DailyBalance>> {
        match &self.cache {
            Some(cache) => {
                cache
                    .get_or_create(&all_key(), None, || async { self.query_all() })
                    .await
            }
            None => self.query_all(),
        }
    }

    async fn get_paginated(&self, page: u32, size: u32) -> Result<(Vec<DailyBalance>, u64)> {
        let page = page.max(1);
        let size = size.clamp(1, MAX_PAGE_SIZE);
        match &self.cache {
            Some(cache) => {
                cache
                    .get_or_create(&page_key(page, size), None, || async {
                        self.query_paginated(page, size)
                    })
                    .await
            }
            None => self.query_paginated(page, size),
        }
    }
}

// Helper functions

fn row_to_balance(row: &duckdb::Row) -> DailyBalance {
    let id: String = row.get(0).unwrap_or_default();
    let date: String = row.get(1).unwrap_or_default();
    let previous: String = row.get(2).unwrap_or_default();
    let credits: String = row.get(3).unwrap_or_default();
    let debits: String = row.get(4).unwrap_or_default();
    let final_balance: String = row.get(5).unwrap_or_default();
    let created: String = row.get(6).unwrap_or_default();
    let updated: String = row.get(7).unwrap_or_default();

    DailyBalance {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        balance_date: parse_date(&date),
        previous_balance: Decimal::from_str_exact(&previous).unwrap_or_default(),
        total_credits: Decimal::from_str_exact(&credits).unwrap_or_default(),
        total_debits: Decimal::from_str_exact(&debits).unwrap_or_default(),
        final_balance: Decimal::from_str_exact(&final_balance).unwrap_or_default(),
        created_at: parse_timestamp(&created),
        updated_at: parse_timestamp(&updated),
    }
}

/// Timestamps are stored as naive UTC strings so the DuckDB cast is
/// unambiguous regardless of session timezone.
fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_else(|_| Utc::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_keys_are_deterministic() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(date_key(date), "daily_balance:date:20240115");

        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(period_key(date, end), "daily_balance:period:20240115:20240131");
        assert_eq!(page_key(2, 10), "daily_balance:page:2:10");
    }

    #[test]
    fn test_timestamp_round_trip() {
        let now = Utc::now();
        let parsed = parse_timestamp(&format_timestamp(now));
        // Stored with microsecond precision
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
    }
}
