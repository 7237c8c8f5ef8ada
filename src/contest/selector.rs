//! Winner selection: closest bracket to the observed price.
//!
//! An entry's distance is how far the actual price falls outside its
//! bracket, or zero when the price is inside it. Every entry at the minimum
//! distance is returned. Ties are left for the administrator to break.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::ContestEntry;

/// An entry paired with its distance from the actual price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredEntry {
    pub entry: ContestEntry,
    pub distance: Decimal,
}

/// Distance between `actual_price` and the entry's bracket.
///
/// Inverted brackets are not normalised: both branches are evaluated
/// against the bounds as stored. A gap too large for `Decimal` saturates to
/// `Decimal::MAX`, so such an entry ranks last.
pub fn distance(entry: &ContestEntry, actual_price: Decimal) -> Decimal {
    let gap = if actual_price < entry.lower_rate {
        entry.lower_rate.checked_sub(actual_price)
    } else if actual_price > entry.upper_rate {
        actual_price.checked_sub(entry.upper_rate)
    } else {
        Some(Decimal::ZERO)
    };
    gap.unwrap_or(Decimal::MAX)
}

/// Entries whose distance equals the minimum over `entries`, in input order.
///
/// Returns an empty vec when `entries` is empty or `actual_price <= 0`.
pub fn closest_entries(actual_price: Decimal, entries: &[ContestEntry]) -> Vec<ContestEntry> {
    if actual_price <= Decimal::ZERO {
        return Vec::new();
    }

    let distances: Vec<Decimal> = entries.iter().map(|e| distance(e, actual_price)).collect();
    let Some(min) = distances.iter().min().copied() else {
        return Vec::new();
    };

    entries
        .iter()
        .zip(distances)
        .filter(|(_, d)| *d == min)
        .map(|(e, _)| e.clone())
        .collect()
}

/// Every entry with its distance, closest first (ties by id).
pub fn rank(actual_price: Decimal, entries: &[ContestEntry]) -> Vec<ScoredEntry> {
    if actual_price <= Decimal::ZERO {
        return Vec::new();
    }

    let mut scored: Vec<ScoredEntry> = entries
        .iter()
        .map(|e| ScoredEntry {
            distance: distance(e, actual_price),
            entry: e.clone(),
        })
        .collect();
    scored.sort_by(|a, b| a.distance.cmp(&b.distance).then(a.entry.id.cmp(&b.entry.id)));
    scored
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
