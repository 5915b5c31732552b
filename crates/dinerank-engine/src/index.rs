use dinerank_core::{Restaurant, RestaurantId, Score};
use std::cmp::Reverse;
use std::collections::BTreeSet;

/// Composite index key.
///
/// Field order is the sort order: score descending, name ascending by bytes,
/// id ascending as the final tie-break.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RankKey {
    score: Reverse<Score>,
    name: String,
    id: RestaurantId,
}

impl RankKey {
    pub fn new(score: Score, name: impl Into<String>, id: RestaurantId) -> Self {
        Self {
            score: Reverse(score),
            name: name.into(),
            id,
        }
    }

    /// Key for a restaurant, or `None` when it is unrated.
    pub fn for_restaurant(restaurant: &Restaurant) -> Option<Self> {
        restaurant
            .score
            .map(|score| Self::new(score, restaurant.name.clone(), restaurant.id))
    }

    pub fn score(&self) -> Score {
        self.score.0
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> RestaurantId {
        self.id
    }
}

/// Ordered set of [`RankKey`]s. Iteration yields final ranking order.
#[derive(Debug, Default)]
pub struct RankIndex {
    keys: BTreeSet<RankKey>,
}

impl RankIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: RankKey) -> bool {
        self.keys.insert(key)
    }

    pub fn remove(&mut self, key: &RankKey) -> bool {
        self.keys.remove(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in ranking order.
    pub fn iter(&self) -> impl Iterator<Item = &RankKey> {
        self.keys.iter()
    }

    /// The first `k` keys in ranking order.
    pub fn top(&self, k: usize) -> impl Iterator<Item = &RankKey> {
        self.keys.iter().take(k)
    }

    /// Highest-ranked key.
    pub fn first(&self) -> Option<&RankKey> {
        self.keys.first()
    }

    /// Lowest-ranked key.
    pub fn last(&self) -> Option<&RankKey> {
        self.keys.last()
    }
}
