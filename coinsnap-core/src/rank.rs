//! Top-K mover ranking over a normalized batch.

use crate::domain::PriceRow;

/// Default number of gainers/losers to surface when nothing overrides it.
pub const DEFAULT_TOP_K: usize = 10;

/// Which direction a row moved to earn its place in a [`MoverSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoverKind {
    Gainer,
    Loser,
}

impl MoverKind {
    /// Label used in the movers CSV category column.
    pub fn as_str(self) -> &'static str {
        match self {
            MoverKind::Gainer => "gainer",
            MoverKind::Loser => "loser",
        }
    }
}

/// Borrowed ranking of one batch: top `k` gainers and top `k` losers by
/// 24h percent change. Ephemeral — computed for the export step, never
/// persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct MoverSet<'a> {
    /// Descending percent change, ties in batch order.
    pub gainers: Vec<&'a PriceRow>,
    /// Ascending percent change, ties in batch order.
    pub losers: Vec<&'a PriceRow>,
}

/// Rank the top `k` movers of a batch in both directions.
///
/// Sorting is stable, so rows with equal percent change keep their batch
/// order, and the same row can appear in both lists (a batch of all-zero
/// changes, say). `k` of zero yields empty lists; `k` beyond the batch
/// yields the whole batch — never an error. The input is not mutated.
pub fn rank_movers(rows: &[PriceRow], k: usize) -> MoverSet<'_> {
    let take = k.min(rows.len());

    let mut desc: Vec<&PriceRow> = rows.iter().collect();
    desc.sort_by(|a, b| b.price_change_pct_24h.total_cmp(&a.price_change_pct_24h));
    desc.truncate(take);

    let mut asc: Vec<&PriceRow> = rows.iter().collect();
    asc.sort_by(|a, b| a.price_change_pct_24h.total_cmp(&b.price_change_pct_24h));
    asc.truncate(take);

    MoverSet {
        gainers: desc,
        losers: asc,
    }
}
