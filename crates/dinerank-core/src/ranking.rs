//! Egress shapes for ranking queries.
//!
//! Each query result has exactly one record shape so presentation layers
//! never branch on variants.

use crate::restaurant::RestaurantId;
use crate::score::Score;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One entry of a ranked view: `{id, name, address, phone, score}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantRecord {
    pub id: RestaurantId,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub score: Score,
}

/// Total ranking order: score descending, name ascending (byte order), then
/// id ascending.
pub fn rank_order(a: &RestaurantRecord, b: &RestaurantRecord) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.name.as_bytes().cmp(b.name.as_bytes()))
        .then_with(|| a.id.cmp(&b.id))
}

/// Ordered sequence of rated restaurants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankedView(Vec<RestaurantRecord>);

impl RankedView {
    pub fn new(records: Vec<RestaurantRecord>) -> Self {
        Self(records)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RestaurantRecord> {
        self.0.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn into_inner(self) -> Vec<RestaurantRecord> {
        self.0
    }

    /// Whether every consecutive pair respects [`rank_order`].
    pub fn is_rank_ordered(&self) -> bool {
        self.0
            .windows(2)
            .all(|w| rank_order(&w[0], &w[1]) == Ordering::Less)
    }
}

impl FromIterator<RestaurantRecord> for RankedView {
    fn from_iter<I: IntoIterator<Item = RestaurantRecord>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for RankedView {
    type Item = RestaurantRecord;
    type IntoIter = std::vec::IntoIter<RestaurantRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Aggregates over the store. `average`, `min` and `max` only consider rated
/// restaurants and are `None` when there are none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingStats {
    pub count: usize,
    pub rated_count: usize,
    pub average: Option<f64>,
    pub min: Option<Score>,
    pub max: Option<Score>,
    pub active_count: usize,
}

/// Position of one rated restaurant relative to all rated restaurants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentileRank {
    /// Fraction of rated restaurants scoring at or below this one, in (0, 1].
    pub percentile_rank: f64,
    pub delta_from_average: f64,
}
