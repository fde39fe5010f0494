//! Coinsnap Pipeline — storage, export, orchestration, configuration.
//!
//! The impure half of the system:
//! - `PriceStore`: append-only SQLite table of price rows
//! - `CsvExporter`: `latest_snapshot.csv` and `top_movers.csv` artifacts
//! - `batch`: the fetch → normalize → store and store → rank → export flows
//! - `PipelineConfig`: the TOML-loadable universe and request shape
//!
//! Everything takes its collaborators explicitly; nothing reads globals or
//! the environment.

pub mod batch;
pub mod config;
pub mod export;
pub mod store;

pub use batch::{run_all, run_analyze, run_fetch, AnalyzeOutcome, FetchOutcome, PipelineError};
pub use config::{ConfigError, PipelineConfig};
pub use export::{CsvExporter, ExportError};
pub use store::{PriceStore, StoreError};
