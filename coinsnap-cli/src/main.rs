//! Coinsnap CLI — fetch, analyze, and full-run commands.
//!
//! Commands:
//! - `fetch` — pull a market snapshot from CoinGecko and append it to the
//!   SQLite warehouse
//! - `analyze` — rank the newest stored snapshot and export CSV reports
//! - `run` — fetch then analyze (default when no subcommand is given)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coinsnap_core::{CoinGeckoSource, MarketSource, SyntheticSource};
use coinsnap_pipeline::{
    run_all, run_analyze, run_fetch, AnalyzeOutcome, CsvExporter, FetchOutcome, PipelineConfig,
    PriceStore,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const DEFAULT_DB: &str = "data/warehouse/crypto_prices.db";
const DEFAULT_OUT_DIR: &str = "data/warehouse";

#[derive(Parser)]
#[command(
    name = "coinsnap",
    version,
    about = "Coinsnap CLI — crypto market snapshots into SQLite and CSV"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the latest market snapshot and append it to the warehouse.
    Fetch {
        /// Path to a TOML config file. Built-in defaults when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// SQLite warehouse path.
        #[arg(long, default_value = DEFAULT_DB)]
        db: PathBuf,

        /// CoinGecko demo API key. Falls back to COINGECKO_API_KEY.
        #[arg(long)]
        api_key: Option<String>,

        /// Generate deterministic offline data instead of calling the API.
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Rank the newest stored snapshot and export CSV reports.
    Analyze {
        /// Path to a TOML config file. Built-in defaults when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// SQLite warehouse path.
        #[arg(long, default_value = DEFAULT_DB)]
        db: PathBuf,

        /// Output directory for the CSV reports.
        #[arg(long, default_value = DEFAULT_OUT_DIR)]
        out_dir: PathBuf,

        /// How many gainers and losers to keep. Overrides the config.
        #[arg(long)]
        top: Option<usize>,
    },
    /// Fetch a snapshot, then rank and export it.
    Run {
        /// Path to a TOML config file. Built-in defaults when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// SQLite warehouse path.
        #[arg(long, default_value = DEFAULT_DB)]
        db: PathBuf,

        /// Output directory for the CSV reports.
        #[arg(long, default_value = DEFAULT_OUT_DIR)]
        out_dir: PathBuf,

        /// How many gainers and losers to keep. Overrides the config.
        #[arg(long)]
        top: Option<usize>,

        /// CoinGecko demo API key. Falls back to COINGECKO_API_KEY.
        #[arg(long)]
        api_key: Option<String>,

        /// Generate deterministic offline data instead of calling the API.
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command.unwrap_or_else(default_command) {
        Commands::Fetch {
            config,
            db,
            api_key,
            synthetic,
        } => run_fetch_cmd(config, db, api_key, synthetic),
        Commands::Analyze {
            config,
            db,
            out_dir,
            top,
        } => run_analyze_cmd(config, db, out_dir, top),
        Commands::Run {
            config,
            db,
            out_dir,
            top,
            api_key,
            synthetic,
        } => run_all_cmd(config, db, out_dir, top, api_key, synthetic),
    }
}

/// A bare `coinsnap` behaves like `coinsnap run` with all defaults.
fn default_command() -> Commands {
    Commands::Run {
        config: None,
        db: PathBuf::from(DEFAULT_DB),
        out_dir: PathBuf::from(DEFAULT_OUT_DIR),
        top: None,
        api_key: None,
        synthetic: false,
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_fetch_cmd(
    config: Option<PathBuf>,
    db: PathBuf,
    api_key: Option<String>,
    synthetic: bool,
) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let source = make_source(&config, api_key, synthetic);
    let mut store = PriceStore::open(&db)
        .with_context(|| format!("failed to open price store at {}", db.display()))?;

    let outcome = run_fetch(source.as_ref(), &mut store, &config)?;
    print_fetch_summary(&outcome);

    Ok(())
}

fn run_analyze_cmd(
    config: Option<PathBuf>,
    db: PathBuf,
    out_dir: PathBuf,
    top: Option<usize>,
) -> Result<()> {
    let config = load_config(config.as_deref())?;
    let store = PriceStore::open(&db)
        .with_context(|| format!("failed to open price store at {}", db.display()))?;
    let exporter = CsvExporter::new(&out_dir)
        .with_context(|| format!("failed to prepare output directory {}", out_dir.display()))?;

    let outcome = run_analyze(&store, &exporter, top.unwrap_or(config.top_k))?;
    print_analyze_summary(&outcome);

    Ok(())
}

fn run_all_cmd(
    config: Option<PathBuf>,
    db: PathBuf,
    out_dir: PathBuf,
    top: Option<usize>,
    api_key: Option<String>,
    synthetic: bool,
) -> Result<()> {
    let mut config = load_config(config.as_deref())?;
    if let Some(top) = top {
        config.top_k = top;
    }

    let source = make_source(&config, api_key, synthetic);
    let mut store = PriceStore::open(&db)
        .with_context(|| format!("failed to open price store at {}", db.display()))?;
    let exporter = CsvExporter::new(&out_dir)
        .with_context(|| format!("failed to prepare output directory {}", out_dir.display()))?;

    let (fetch, analyze) = run_all(source.as_ref(), &mut store, &exporter, &config)?;
    print_fetch_summary(&fetch);
    print_analyze_summary(&analyze);

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn make_source(
    config: &PipelineConfig,
    api_key: Option<String>,
    synthetic: bool,
) -> Box<dyn MarketSource> {
    if synthetic {
        Box::new(SyntheticSource::new())
    } else {
        let api_key = api_key.or_else(|| std::env::var("COINGECKO_API_KEY").ok());
        Box::new(CoinGeckoSource::new(
            config.vs_currency.clone(),
            config.per_page,
            api_key,
        ))
    }
}

fn print_fetch_summary(outcome: &FetchOutcome) {
    println!();
    println!("=== Snapshot Stored ===");
    println!("Source:         {}", outcome.source_name);
    println!("Timestamp:      {}", outcome.timestamp.to_rfc3339());
    println!("Rows stored:    {}", outcome.rows_stored);
}

fn print_analyze_summary(outcome: &AnalyzeOutcome) {
    println!();
    println!("=== Movers Report ===");
    println!("Batch:          {}", outcome.timestamp.to_rfc3339());
    println!("Rows ranked:    {}", outcome.row_count);
    println!("Movers (each):  {}", outcome.movers_each_way);
    println!("Snapshot CSV:   {}", outcome.snapshot_path.display());
    println!("Movers CSV:     {}", outcome.movers_path.display());
}
