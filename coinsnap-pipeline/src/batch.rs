//! Batch orchestration.
//!
//! Two flows, wired from the same parts:
//! - fetch: source → normalize → store (one batch, one timestamp)
//! - analyze: store → rank → export (always the newest batch)
//!
//! A batch is all-or-nothing at every stage; a failure anywhere leaves the
//! store exactly as it was.

use std::path::PathBuf;

use chrono::{DateTime, SubsecRound, Utc};
use thiserror::Error;
use tracing::{info, warn};

use coinsnap_core::{normalize_batch, rank_movers, MarketSource, NormalizeError, SourceError};

use crate::config::PipelineConfig;
use crate::export::{CsvExporter, ExportError};
use crate::store::{PriceStore, StoreError};

/// Any way a batch run can fail, by stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetch failed: {0}")]
    Source(#[from] SourceError),

    #[error("normalization failed: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("storage failed: {0}")]
    Store(#[from] StoreError),

    #[error("export failed: {0}")]
    Export(#[from] ExportError),

    /// Analyze ran against a store with no batches in it.
    #[error("price store is empty: run `fetch` first")]
    EmptyStore,
}

/// What a fetch produced.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub timestamp: DateTime<Utc>,
    pub rows_stored: usize,
    pub source_name: String,
}

/// What an analyze produced.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeOutcome {
    pub timestamp: DateTime<Utc>,
    pub row_count: usize,
    /// Rows in each direction (gainers and losers are the same length).
    pub movers_each_way: usize,
    pub snapshot_path: PathBuf,
    pub movers_path: PathBuf,
}

/// The timestamp every row of a new batch shares: now, truncated to whole
/// seconds so the stored text round-trips exactly.
pub fn batch_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Fetch one batch and append it to the store.
///
/// The timestamp is stamped once, before normalization, so every row of
/// the batch carries the same instant regardless of how long the stages
/// take. A fetch that yields zero rows is a warning, not an error, and
/// leaves the store untouched.
pub fn run_fetch(
    source: &dyn MarketSource,
    store: &mut PriceStore,
    config: &PipelineConfig,
) -> Result<FetchOutcome, PipelineError> {
    let timestamp = batch_timestamp();
    info!(
        source = source.name(),
        coins = config.coins.len(),
        "fetching market snapshot"
    );

    let records = source.fetch(&config.coins)?;
    let rows = normalize_batch(&records, timestamp)?;
    if rows.is_empty() {
        warn!("fetch produced no rows; nothing stored");
        return Ok(FetchOutcome {
            timestamp,
            rows_stored: 0,
            source_name: source.name().to_string(),
        });
    }
    let rows_stored = store.insert_batch(&rows)?;

    info!(rows = rows_stored, timestamp = %timestamp, "batch stored");
    Ok(FetchOutcome {
        timestamp,
        rows_stored,
        source_name: source.name().to_string(),
    })
}

/// Rank and export the most recent batch in the store.
///
/// Reads the store rather than any in-memory state, so it works standalone
/// against a warehouse populated by an earlier run.
pub fn run_analyze(
    store: &PriceStore,
    exporter: &CsvExporter,
    top_k: usize,
) -> Result<AnalyzeOutcome, PipelineError> {
    let timestamp = store.latest_timestamp()?.ok_or(PipelineError::EmptyStore)?;
    let rows = store.load_batch(timestamp)?;

    let movers = rank_movers(&rows, top_k);
    let snapshot_path = exporter.export_snapshot(&rows)?;
    let movers_path = exporter.export_movers(&movers)?;

    info!(
        rows = rows.len(),
        timestamp = %timestamp,
        top_k,
        "snapshot analyzed"
    );
    Ok(AnalyzeOutcome {
        timestamp,
        row_count: rows.len(),
        movers_each_way: movers.gainers.len(),
        snapshot_path,
        movers_path,
    })
}

/// Fetch, then analyze what was just stored.
pub fn run_all(
    source: &dyn MarketSource,
    store: &mut PriceStore,
    exporter: &CsvExporter,
    config: &PipelineConfig,
) -> Result<(FetchOutcome, AnalyzeOutcome), PipelineError> {
    let fetch = run_fetch(source, store, config)?;
    let analyze = run_analyze(store, exporter, config.top_k)?;
    Ok((fetch, analyze))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use coinsnap_core::{PriceRow, RawRecord, SyntheticSource};

    /// A source that always fails, for error-path tests.
    struct DeadSource;

    impl MarketSource for DeadSource {
        fn name(&self) -> &str {
            "dead"
        }

        fn fetch(&self, _coin_ids: &[String]) -> Result<Vec<RawRecord>, SourceError> {
            Err(SourceError::Unreachable("wire cut".into()))
        }
    }

    /// A source that answers with no records at all.
    struct EmptySource;

    impl MarketSource for EmptySource {
        fn name(&self) -> &str {
            "empty"
        }

        fn fetch(&self, _coin_ids: &[String]) -> Result<Vec<RawRecord>, SourceError> {
            Ok(Vec::new())
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    fn row(id: &str, timestamp: DateTime<Utc>, pct: f64) -> PriceRow {
        PriceRow {
            timestamp,
            id: id.into(),
            symbol: id.to_uppercase(),
            name: id.into(),
            current_price: 10.0,
            market_cap: 1.0e6,
            total_volume: 1.0e4,
            price_change_24h: 0.1,
            price_change_pct_24h: pct,
        }
    }

    #[test]
    fn fetch_stores_one_row_per_coin_with_uniform_timestamp() {
        let mut store = PriceStore::open_in_memory().unwrap();
        let outcome = run_fetch(&SyntheticSource::new(), &mut store, &config()).unwrap();

        assert_eq!(outcome.rows_stored, config().coins.len());
        assert_eq!(outcome.source_name, "synthetic");

        let rows = store.load_batch(outcome.timestamp).unwrap();
        assert_eq!(rows.len(), outcome.rows_stored);
        assert!(rows.iter().all(|r| r.timestamp == outcome.timestamp));
    }

    #[test]
    fn analyze_on_empty_store_is_a_distinct_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = PriceStore::open_in_memory().unwrap();
        let exporter = CsvExporter::new(dir.path()).unwrap();

        let err = run_analyze(&store, &exporter, 10).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyStore), "{err:?}");
        assert!(err.to_string().contains("run `fetch` first"));
    }

    #[test]
    fn analyze_targets_the_newest_batch_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PriceStore::open_in_memory().unwrap();
        let exporter = CsvExporter::new(dir.path()).unwrap();

        let old = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let new = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        store
            .insert_batch(&[row("bitcoin", old, 1.0), row("ethereum", old, 2.0)])
            .unwrap();
        store.insert_batch(&[row("bitcoin", new, 3.0)]).unwrap();

        let outcome = run_analyze(&store, &exporter, 10).unwrap();
        assert_eq!(outcome.timestamp, new);
        assert_eq!(outcome.row_count, 1);
        assert_eq!(outcome.movers_each_way, 1);
    }

    #[test]
    fn movers_each_way_is_min_k_n() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PriceStore::open_in_memory().unwrap();
        let exporter = CsvExporter::new(dir.path()).unwrap();

        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        store
            .insert_batch(&[
                row("a", ts, 1.0),
                row("b", ts, 2.0),
                row("c", ts, 3.0),
            ])
            .unwrap();

        let outcome = run_analyze(&store, &exporter, 2).unwrap();
        assert_eq!(outcome.movers_each_way, 2);

        let outcome = run_analyze(&store, &exporter, 50).unwrap();
        assert_eq!(outcome.movers_each_way, 3);
    }

    #[test]
    fn dead_source_fails_fetch_and_leaves_store_untouched() {
        let mut store = PriceStore::open_in_memory().unwrap();
        let err = run_fetch(&DeadSource, &mut store, &config()).unwrap_err();

        assert!(matches!(err, PipelineError::Source(_)), "{err:?}");
        assert_eq!(store.row_count().unwrap(), 0);
    }

    #[test]
    fn empty_fetch_is_a_no_op_not_an_error() {
        let mut store = PriceStore::open_in_memory().unwrap();
        let outcome = run_fetch(&EmptySource, &mut store, &config()).unwrap();

        assert_eq!(outcome.rows_stored, 0);
        assert_eq!(store.row_count().unwrap(), 0);
        assert_eq!(store.latest_timestamp().unwrap(), None);
    }

    #[test]
    fn run_all_fetches_then_exports() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PriceStore::open_in_memory().unwrap();
        let exporter = CsvExporter::new(dir.path()).unwrap();

        let (fetch, analyze) =
            run_all(&SyntheticSource::new(), &mut store, &exporter, &config()).unwrap();

        assert_eq!(fetch.timestamp, analyze.timestamp);
        assert_eq!(fetch.rows_stored, analyze.row_count);
        assert!(analyze.snapshot_path.exists());
        assert!(analyze.movers_path.exists());
    }
}
