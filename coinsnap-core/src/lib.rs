//! Coinsnap Core — domain types, normalization, ranking, market-data sources.
//!
//! This crate contains the pure heart of the snapshot pipeline:
//! - `PriceRow`, the one persisted record shape
//! - Batch normalization (strict identity, lenient numerics)
//! - Top-K gainer/loser ranking
//! - The `MarketSource` trait with live (CoinGecko) and synthetic impls
//!
//! Everything here is synchronous and single-threaded; the only I/O lives
//! behind `MarketSource`.

pub mod domain;
pub mod normalize;
pub mod rank;
pub mod source;

pub use domain::PriceRow;
pub use normalize::{normalize_batch, NormalizeError};
pub use rank::{rank_movers, MoverKind, MoverSet, DEFAULT_TOP_K};
pub use source::{CoinGeckoSource, MarketSource, RawRecord, SourceError, SyntheticSource};
