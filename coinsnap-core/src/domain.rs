//! Price rows — the atomic unit of a market snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One normalized market observation for one coin at one batch instant.
///
/// Every row in a batch carries the same `timestamp`. `id` is unique within
/// a batch — that is the upstream contract, and violations surface at the
/// store, not here. Numeric fields are always present: absent upstream
/// values have already been defaulted to 0.0 by normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub timestamp: DateTime<Utc>,
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub market_cap: f64,
    pub total_volume: f64,
    pub price_change_24h: f64,
    pub price_change_pct_24h: f64,
}

impl PriceRow {
    /// Field names in declaration order. The store columns and CSV headers
    /// are both derived from this list, so it is the single place the
    /// row shape is spelled out as text.
    pub const FIELD_NAMES: [&'static str; 9] = [
        "timestamp",
        "id",
        "symbol",
        "name",
        "current_price",
        "market_cap",
        "total_volume",
        "price_change_24h",
        "price_change_pct_24h",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_row() -> PriceRow {
        PriceRow {
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            id: "bitcoin".into(),
            symbol: "BTC".into(),
            name: "Bitcoin".into(),
            current_price: 62_000.0,
            market_cap: 1.2e12,
            total_volume: 3.1e10,
            price_change_24h: 840.5,
            price_change_pct_24h: 1.37,
        }
    }

    /// FIELD_NAMES must stay in lockstep with the struct: same count, same
    /// names as the serde field set.
    #[test]
    fn field_names_match_struct_fields() {
        let value = serde_json::to_value(sample_row()).unwrap();
        let obj = value.as_object().unwrap();

        assert_eq!(obj.len(), PriceRow::FIELD_NAMES.len());
        for field in PriceRow::FIELD_NAMES {
            assert!(obj.contains_key(field), "struct is missing field {field}");
        }
    }

    #[test]
    fn serde_round_trip_preserves_row() {
        let row = sample_row();
        let json = serde_json::to_string(&row).unwrap();
        let back: PriceRow = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }
}
