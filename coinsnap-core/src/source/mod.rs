//! Market-data sources: the upstream trait, its raw payload shape, errors.
//!
//! Two implementations ship:
//! - [`CoinGeckoSource`] — the live HTTP source
//! - [`SyntheticSource`] — deterministic offline records for demos/tests

pub mod coingecko;
pub mod synthetic;

pub use coingecko::CoinGeckoSource;
pub use synthetic::SyntheticSource;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// One upstream market record, as loosely typed as the wire allows.
///
/// Every field is an optional raw JSON value: absent keys, explicit nulls,
/// and wrong-typed values all survive deserialization, so normalization can
/// apply its own strictness rules instead of serde rejecting the payload
/// wholesale. Unknown keys are ignored — the live endpoint sends dozens.
///
/// `market_cap_rank` is part of the wire contract but is not carried into
/// [`crate::PriceRow`]; rank is implied by the source's sort order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub symbol: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub market_cap_rank: Option<Value>,
    #[serde(default)]
    pub current_price: Option<Value>,
    #[serde(default)]
    pub market_cap: Option<Value>,
    #[serde(default)]
    pub total_volume: Option<Value>,
    #[serde(default)]
    pub price_change_24h: Option<Value>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<Value>,
}

/// Errors from an upstream market-data source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Transport never produced a response (DNS, connect, timeout).
    #[error("market data source unreachable: {0}")]
    Unreachable(String),

    /// The source answered with a non-success HTTP status.
    #[error("market data source returned HTTP {status}")]
    Status { status: u16 },

    /// HTTP 429. Reported, never retried here — backoff policy belongs to
    /// whoever schedules batches.
    #[error("rate limited by market data source (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    /// The body was not the JSON shape we expect.
    #[error("market data response could not be decoded: {0}")]
    Decode(String),
}

/// A synchronous market-data source.
///
/// One call, one batch: implementations fetch raw records for the given
/// coin ids in the source's own order, and the pipeline preserves that
/// order end to end.
pub trait MarketSource {
    /// Short source name for logs and run summaries.
    fn name(&self) -> &str;

    /// Fetch one batch of raw records for `coin_ids`.
    fn fetch(&self, coin_ids: &[String]) -> Result<Vec<RawRecord>, SourceError>;
}
