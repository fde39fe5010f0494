//! Batch normalization: raw upstream records → storable price rows.
//!
//! The contract is deliberately asymmetric:
//! - **Identity is strict.** A record without a usable `id`, `symbol`, or
//!   `name` poisons the whole batch — an identity-less row can't be stored,
//!   ranked, or joined against anything.
//! - **Numerics are lenient.** Upstream routinely omits caps and volumes
//!   for thin markets; absent or null numbers become 0.0. A value that is
//!   *present* but not numeric is corruption, not absence, and fails the
//!   batch with the offending id and field named.

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::domain::PriceRow;
use crate::source::RawRecord;

/// Why a batch failed normalization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// A record arrived without a usable identity field (absent, null, or
    /// not a string). `index` is the record's position in the batch.
    #[error("record {index}: missing or non-string `{field}`")]
    MissingIdentity { index: usize, field: &'static str },

    /// A numeric field was present but structurally unusable: wrong JSON
    /// type, or a string that does not parse as a number.
    #[error("record `{id}`: field `{field}` is not numeric")]
    MalformedField { id: String, field: &'static str },
}

/// Normalize one fetched batch into rows.
///
/// One row per record, input order preserved, `timestamp` stamped onto
/// every row. Pure: the same records and timestamp always produce the same
/// rows. On any error the whole batch is rejected and zero rows escape.
pub fn normalize_batch(
    records: &[RawRecord],
    timestamp: DateTime<Utc>,
) -> Result<Vec<PriceRow>, NormalizeError> {
    let mut rows = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let id = identity(record.id.as_ref(), index, "id")?;
        let symbol = identity(record.symbol.as_ref(), index, "symbol")?;
        let name = identity(record.name.as_ref(), index, "name")?;

        let current_price = numeric(record.current_price.as_ref(), &id, "current_price")?;
        let market_cap = numeric(record.market_cap.as_ref(), &id, "market_cap")?;
        let total_volume = numeric(record.total_volume.as_ref(), &id, "total_volume")?;
        let price_change_24h = numeric(record.price_change_24h.as_ref(), &id, "price_change_24h")?;
        let price_change_pct_24h = numeric(
            record.price_change_percentage_24h.as_ref(),
            &id,
            "price_change_percentage_24h",
        )?;

        rows.push(PriceRow {
            timestamp,
            id,
            symbol: symbol.to_uppercase(),
            name,
            current_price,
            market_cap,
            total_volume,
            price_change_24h,
            price_change_pct_24h,
        });
    }

    Ok(rows)
}

/// Identity fields must be present, non-null strings.
fn identity(
    value: Option<&Value>,
    index: usize,
    field: &'static str,
) -> Result<String, NormalizeError> {
    match value {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(NormalizeError::MissingIdentity { index, field }),
    }
}

/// Numeric fields: absent/null → 0.0, numbers and numeric strings pass,
/// everything else is malformed.
fn numeric(value: Option<&Value>, id: &str, field: &'static str) -> Result<f64, NormalizeError> {
    let malformed = || NormalizeError::MalformedField {
        id: id.to_string(),
        field,
    };

    match value {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(malformed),
        Some(Value::String(s)) => s.trim().parse::<f64>().map_err(|_| malformed()),
        Some(_) => Err(malformed()),
    }
}
