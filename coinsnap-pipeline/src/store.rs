//! SQLite-backed price store.
//!
//! One table, `crypto_prices`, keyed by `(timestamp, id)`. Append-only:
//! nothing here updates or deletes, and a batch that collides with an
//! existing `(timestamp, id)` pair — the same coin twice in one batch, or
//! two batches stamped the same second — rolls back whole.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OpenFlags};
use thiserror::Error;
use tracing::{debug, info};

use coinsnap_core::PriceRow;

/// Errors from opening or using the price store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create store directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any SQLite-level failure: I/O, corruption, or a constraint
    /// violation such as a duplicated id within a batch.
    #[error("price store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("stored timestamp `{0}` is not RFC 3339")]
    Timestamp(String),
}

/// Append-only store of normalized price rows.
///
/// The connection closes when the store drops; there is no separate
/// shutdown step to forget.
pub struct PriceStore {
    conn: Connection,
}

impl PriceStore {
    /// Open (or create) the store at `path`, creating parent directories
    /// and the schema as needed. Reopening an existing store never touches
    /// its data.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        Self::init_schema(&conn)?;

        info!(path = %path.display(), "price store ready");
        Ok(Self { conn })
    }

    /// An in-memory store for tests and dry runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            CREATE TABLE IF NOT EXISTS crypto_prices (
                timestamp            TEXT NOT NULL,
                id                   TEXT NOT NULL,
                symbol               TEXT NOT NULL,
                name                 TEXT NOT NULL,
                current_price        REAL NOT NULL,
                market_cap           REAL NOT NULL,
                total_volume         REAL NOT NULL,
                price_change_24h     REAL NOT NULL,
                price_change_pct_24h REAL NOT NULL,
                PRIMARY KEY (timestamp, id)
            );

            CREATE INDEX IF NOT EXISTS idx_crypto_prices_id
                ON crypto_prices (id, timestamp);
            "#,
        )?;
        Ok(())
    }

    /// Append one batch inside a single transaction: every row lands or
    /// none do.
    pub fn insert_batch(&mut self, rows: &[PriceRow]) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO crypto_prices (
                    timestamp, id, symbol, name, current_price,
                    market_cap, total_volume, price_change_24h, price_change_pct_24h
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for row in rows {
                stmt.execute(params![
                    format_timestamp(row.timestamp),
                    row.id,
                    row.symbol,
                    row.name,
                    row.current_price,
                    row.market_cap,
                    row.total_volume,
                    row.price_change_24h,
                    row.price_change_pct_24h,
                ])?;
            }
        }
        tx.commit()?;

        debug!(rows = rows.len(), "batch appended to crypto_prices");
        Ok(rows.len())
    }

    /// Timestamp of the most recent batch, if the store has any.
    pub fn latest_timestamp(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let text: Option<String> =
            self.conn
                .query_row("SELECT MAX(timestamp) FROM crypto_prices", [], |row| {
                    row.get(0)
                })?;
        text.map(|t| parse_timestamp(&t)).transpose()
    }

    /// Every row of the batch stamped `timestamp`, in insertion order —
    /// the order the source delivered them.
    pub fn load_batch(&self, timestamp: DateTime<Utc>) -> Result<Vec<PriceRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, symbol, name, current_price,
                    market_cap, total_volume, price_change_24h, price_change_pct_24h
             FROM crypto_prices
             WHERE timestamp = ?1
             ORDER BY rowid",
        )?;

        let mapped = stmt.query_map(params![format_timestamp(timestamp)], |row| {
            Ok(PriceRow {
                timestamp,
                id: row.get(0)?,
                symbol: row.get(1)?,
                name: row.get(2)?,
                current_price: row.get(3)?,
                market_cap: row.get(4)?,
                total_volume: row.get(5)?,
                price_change_24h: row.get(6)?,
                price_change_pct_24h: row.get(7)?,
            })
        })?;

        let mut rows = Vec::new();
        for row in mapped {
            rows.push(row?);
        }
        Ok(rows)
    }

    /// Total rows across all batches.
    pub fn row_count(&self) -> Result<u64, StoreError> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM crypto_prices", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// The one timestamp text format, shared by the store and the CSV
/// exporter: RFC 3339 UTC, whole seconds, `Z` suffix.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::Timestamp(text.to_string()))
}
