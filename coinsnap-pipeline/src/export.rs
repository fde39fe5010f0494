//! CSV artifact export.
//!
//! Two files per analyze run, both overwritten in place so they always
//! describe the most recent batch:
//! - `latest_snapshot.csv` — the whole batch, source order
//! - `top_movers.csv` — gainers then losers, with a `category` column

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::Writer;
use thiserror::Error;
use tracing::info;

use coinsnap_core::{MoverKind, MoverSet, PriceRow};

use crate::store::format_timestamp;

/// Snapshot artifact file name.
pub const SNAPSHOT_FILE: &str = "latest_snapshot.csv";
/// Movers artifact file name.
pub const MOVERS_FILE: &str = "top_movers.csv";

/// Errors from writing export artifacts.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create export directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("could not flush {}: {source}", path.display())]
    Flush {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes snapshot artifacts under one output directory.
pub struct CsvExporter {
    out_dir: PathBuf,
}

impl CsvExporter {
    /// Root the exporter at `out_dir`, creating it if absent.
    pub fn new(out_dir: impl Into<PathBuf>) -> Result<Self, ExportError> {
        let out_dir = out_dir.into();
        std::fs::create_dir_all(&out_dir).map_err(|source| ExportError::CreateDir {
            path: out_dir.clone(),
            source,
        })?;
        Ok(Self { out_dir })
    }

    /// Where the exporter writes.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Write `latest_snapshot.csv`: header from [`PriceRow::FIELD_NAMES`],
    /// one line per row, batch order untouched.
    pub fn export_snapshot(&self, rows: &[PriceRow]) -> Result<PathBuf, ExportError> {
        let path = self.out_dir.join(SNAPSHOT_FILE);
        let mut wtr = Writer::from_path(&path)?;

        wtr.write_record(PriceRow::FIELD_NAMES)?;
        for row in rows {
            write_row(&mut wtr, row, None)?;
        }
        wtr.flush().map_err(|source| ExportError::Flush {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), rows = rows.len(), "wrote snapshot csv");
        Ok(path)
    }

    /// Write `top_movers.csv`: all gainers, then all losers, each side in
    /// rank order, with a trailing `category` column naming the side.
    pub fn export_movers(&self, movers: &MoverSet) -> Result<PathBuf, ExportError> {
        let path = self.out_dir.join(MOVERS_FILE);
        let mut wtr = Writer::from_path(&path)?;

        let mut header: Vec<&str> = PriceRow::FIELD_NAMES.to_vec();
        header.push("category");
        wtr.write_record(&header)?;

        for row in &movers.gainers {
            write_row(&mut wtr, row, Some(MoverKind::Gainer))?;
        }
        for row in &movers.losers {
            write_row(&mut wtr, row, Some(MoverKind::Loser))?;
        }
        wtr.flush().map_err(|source| ExportError::Flush {
            path: path.clone(),
            source,
        })?;

        info!(
            path = %path.display(),
            gainers = movers.gainers.len(),
            losers = movers.losers.len(),
            "wrote movers csv"
        );
        Ok(path)
    }
}

fn write_row(wtr: &mut Writer<File>, row: &PriceRow, kind: Option<MoverKind>) -> Result<(), csv::Error> {
    let mut record = vec![
        format_timestamp(row.timestamp),
        row.id.clone(),
        row.symbol.clone(),
        row.name.clone(),
        row.current_price.to_string(),
        row.market_cap.to_string(),
        row.total_volume.to_string(),
        row.price_change_24h.to_string(),
        row.price_change_pct_24h.to_string(),
    ];
    if let Some(kind) = kind {
        record.push(kind.as_str().to_string());
    }
    wtr.write_record(&record)
}
