use crate::index::{RankIndex, RankKey};
use crate::query::SearchQuery;
use crate::stats::ScoreHistogram;
use dinerank_core::{
    CoreError, PercentileRank, RankedView, RankingStats, Restaurant, RestaurantId,
    RestaurantInput, Result, Timestamp, ValidatedInput, now_utc, round2,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

const ENTITY: &str = "Restaurant";

/// Everything guarded by the engine lock. A restaurant, its index keys and
/// its share of the aggregates always change together.
#[derive(Debug, Default)]
struct EngineState {
    restaurants: HashMap<RestaurantId, Restaurant>,
    rated: RankIndex,
    active_rated: RankIndex,
    histogram: ScoreHistogram,
    active_count: usize,
}

impl EngineState {
    fn index(&self, active_only: bool) -> &RankIndex {
        if active_only {
            &self.active_rated
        } else {
            &self.rated
        }
    }

    fn unlink(&mut self, restaurant: &Restaurant) {
        if let Some(key) = RankKey::for_restaurant(restaurant) {
            if restaurant.active {
                self.active_rated.remove(&key);
            }
            self.rated.remove(&key);
        }
        if let Some(score) = restaurant.score {
            self.histogram.remove(score);
        }
        if restaurant.active {
            self.active_count = self.active_count.saturating_sub(1);
        }
    }

    fn link(&mut self, restaurant: &Restaurant) {
        if let Some(key) = RankKey::for_restaurant(restaurant) {
            if restaurant.active {
                self.active_rated.insert(key.clone());
            }
            self.rated.insert(key);
        }
        if let Some(score) = restaurant.score {
            self.histogram.add(score);
        }
        if restaurant.active {
            self.active_count += 1;
        }
    }

    /// Insert or replace a restaurant, re-keying both indexes.
    fn put(&mut self, restaurant: Restaurant) {
        if let Some(previous) = self.restaurants.remove(&restaurant.id) {
            self.unlink(&previous);
        }
        self.link(&restaurant);
        self.restaurants.insert(restaurant.id, restaurant);
    }

    fn records<'a>(&'a self, keys: impl Iterator<Item = &'a RankKey>) -> RankedView {
        keys.filter_map(|key| self.restaurants.get(&key.id()))
            .filter_map(Restaurant::to_record)
            .collect()
    }
}

/// Authoritative restaurant store with composite ordered ranking indexes.
///
/// All state sits behind one `RwLock`: queries share it, mutations take it
/// exclusively and finish re-indexing before they return. A mutation that
/// returned is therefore visible to every query issued after it.
#[derive(Debug)]
pub struct RankingEngine {
    state: RwLock<EngineState>,
    next_id: AtomicU64,
}

impl Default for RankingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RankingEngine {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(EngineState::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Validate and persist a restaurant.
    ///
    /// Without `input.id` a new restaurant is created with a fresh id. With
    /// an id the stored restaurant is replaced, keeping its creation time;
    /// an unknown id is `NotFound`.
    pub fn create_or_update(&self, input: RestaurantInput) -> Result<Restaurant> {
        let valid = input.validate()?;
        let now = now_utc();

        let mut state = self.state.write();
        let (restaurant, operation) = match input.id {
            Some(id) => {
                let existing = state
                    .restaurants
                    .get(&id)
                    .ok_or_else(|| CoreError::not_found(ENTITY, id))?;
                (build(id, valid, existing.created_at, now), "update")
            }
            None => {
                let id = RestaurantId(self.next_id.fetch_add(1, Ordering::SeqCst));
                (build(id, valid, now, now), "create")
            }
        };
        state.put(restaurant.clone());
        drop(state);

        metrics::counter!("ranking_mutations_total", "operation" => operation).increment(1);
        debug!(
            id = %restaurant.id,
            operation,
            score = ?restaurant.score,
            active = restaurant.active,
            "restaurant persisted"
        );
        Ok(restaurant)
    }

    /// Mark a restaurant inactive. It keeps its id and stays retrievable.
    pub fn deactivate(&self, id: RestaurantId) -> Result<Restaurant> {
        let mut state = self.state.write();
        let mut restaurant = state
            .restaurants
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(ENTITY, id))?;
        if !restaurant.active {
            return Ok(restaurant);
        }
        restaurant.active = false;
        restaurant.updated_at = now_utc();
        state.put(restaurant.clone());
        drop(state);

        metrics::counter!("ranking_mutations_total", "operation" => "deactivate").increment(1);
        debug!(id = %id, "restaurant deactivated");
        Ok(restaurant)
    }

    pub fn get(&self, id: RestaurantId) -> Result<Restaurant> {
        self.state
            .read()
            .restaurants
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(ENTITY, id))
    }

    pub fn len(&self) -> usize {
        self.state.read().restaurants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The best `k` rated restaurants.
    ///
    /// With `active_only` the active index is scanned, so an inactive
    /// restaurant is skipped and the next active one takes its place.
    pub fn top_k(&self, k: usize, active_only: bool) -> Result<RankedView> {
        if k == 0 {
            return Err(CoreError::invalid_argument("k must be >= 1"));
        }
        let state = self.state.read();
        Ok(state.records(state.index(active_only).top(k)))
    }

    /// Filtered listing in ranking order.
    pub fn search(&self, query: SearchQuery) -> Result<RankedView> {
        if query.limit == 0 {
            return Err(CoreError::invalid_argument("limit must be >= 1"));
        }
        let query = query.normalized();
        let state = self.state.read();

        // Scores only decrease along the index, so the scan stops at the
        // first key under the minimum.
        let view = state
            .index(query.active_only)
            .iter()
            .take_while(|key| query.min_score.is_none_or(|min| key.score() >= min))
            .filter_map(|key| state.restaurants.get(&key.id()))
            .filter(|restaurant| query.matches_text(restaurant))
            .filter_map(Restaurant::to_record)
            .take(query.limit)
            .collect();
        Ok(view)
    }

    /// Every restaurant, newest first.
    pub fn list_all(&self) -> Vec<Restaurant> {
        let mut all: Vec<Restaurant> = self.state.read().restaurants.values().cloned().collect();
        all.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        all
    }

    pub fn stats(&self) -> RankingStats {
        let state = self.state.read();
        RankingStats {
            count: state.restaurants.len(),
            rated_count: state.histogram.count(),
            average: state.histogram.mean().map(round2),
            min: state.rated.last().map(RankKey::score),
            max: state.rated.first().map(RankKey::score),
            active_count: state.active_count,
        }
    }

    /// Percentile rank and distance from the mean for one rated restaurant.
    pub fn percentile_and_delta(&self, id: RestaurantId) -> Result<PercentileRank> {
        let state = self.state.read();
        let restaurant = state
            .restaurants
            .get(&id)
            .ok_or_else(|| CoreError::not_found(ENTITY, id))?;
        let score = restaurant.score.ok_or_else(|| {
            CoreError::invalid_argument(format!("restaurant {id} is unrated"))
        })?;

        let rated = state.histogram.count();
        let delta = state
            .histogram
            .delta_from_mean(score)
            .ok_or_else(|| CoreError::internal("rated restaurant missing from histogram"))?;

        Ok(PercentileRank {
            percentile_rank: state.histogram.at_or_below(score) as f64 / rated as f64,
            delta_from_average: round2(delta),
        })
    }
}

fn build(
    id: RestaurantId,
    valid: ValidatedInput,
    created_at: Timestamp,
    updated_at: Timestamp,
) -> Restaurant {
    Restaurant {
        id,
        name: valid.name,
        address: valid.address,
        phone: valid.phone,
        score: valid.score,
        cuisine: valid.cuisine,
        description: valid.description,
        active: valid.active,
        created_at,
        updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dinerank_core::Score;

    fn input(name: &str, score: Option<f64>) -> RestaurantInput {
        let base = RestaurantInput::new(name, "123 Main St", "+1-555-0100");
        match score {
            Some(s) => base.with_score(s),
            None => base,
        }
    }

    fn sample_engine() -> RankingEngine {
        let engine = RankingEngine::new();
        for (name, score) in [
            ("Sushi Sensation", Some(4.9)),
            ("The Golden Spoon", Some(4.8)),
            ("Cafe Cozy", Some(4.8)),
            ("Pizza Palace", Some(4.5)),
            ("Grill & Chill", None),
        ] {
            engine.create_or_update(input(name, score)).unwrap();
        }
        engine
    }

    #[test]
    fn top_k_uses_name_tie_break() {
        let engine = sample_engine();
        let top = engine.top_k(3, false).unwrap();
        assert_eq!(
            top.names(),
            vec!["Sushi Sensation", "Cafe Cozy", "The Golden Spoon"]
        );
        assert!(top.is_rank_ordered());
    }

    #[test]
    fn top_k_larger_than_population_returns_all_rated() {
        let engine = sample_engine();
        let top = engine.top_k(50, false).unwrap();
        assert_eq!(top.len(), 4);
        assert!(!top.names().contains(&"Grill & Chill"));
    }

    #[test]
    fn top_k_zero_is_invalid() {
        let engine = sample_engine();
        assert!(matches!(
            engine.top_k(0, false),
            Err(CoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn active_only_promotes_next_active() {
        let engine = sample_engine();
        let cafe = engine
            .list_all()
            .into_iter()
            .find(|r| r.name == "Cafe Cozy")
            .unwrap();
        engine.deactivate(cafe.id).unwrap();

        let top = engine.top_k(3, true).unwrap();
        assert_eq!(
            top.names(),
            vec!["Sushi Sensation", "The Golden Spoon", "Pizza Palace"]
        );
        // the unfiltered ranking still includes it
        assert_eq!(engine.top_k(3, false).unwrap().names()[1], "Cafe Cozy");
    }

    #[test]
    fn stats_exclude_unrated() {
        let engine = sample_engine();
        let stats = engine.stats();
        assert_eq!(stats.count, 5);
        assert_eq!(stats.rated_count, 4);
        assert_eq!(stats.average, Some(4.75));
        assert_eq!(stats.min, Score::from_hundredths(450));
        assert_eq!(stats.max, Score::from_hundredths(490));
        assert_eq!(stats.active_count, 5);
    }

    #[test]
    fn stats_on_empty_store_are_well_defined() {
        let engine = RankingEngine::new();
        engine.create_or_update(input("Grill & Chill", None)).unwrap();
        let stats = engine.stats();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.rated_count, 0);
        assert_eq!(stats.average, None);
        assert_eq!(stats.min, None);
        assert_eq!(stats.max, None);
    }

    #[test]
    fn update_rekeys_indexes() {
        let engine = sample_engine();
        let pizza = engine
            .list_all()
            .into_iter()
            .find(|r| r.name == "Pizza Palace")
            .unwrap();

        let updated = engine
            .create_or_update(input("Pizza Palace", Some(5.0)).with_id(pizza.id))
            .unwrap();
        assert_eq!(updated.created_at, pizza.created_at);
        assert!(updated.updated_at >= pizza.updated_at);

        let top = engine.top_k(1, false).unwrap();
        assert_eq!(top.names(), vec!["Pizza Palace"]);
        assert_eq!(engine.stats().rated_count, 4);

        // clearing the score removes it from ranking
        engine
            .create_or_update(input("Pizza Palace", None).with_id(pizza.id))
            .unwrap();
        assert_eq!(engine.top_k(10, false).unwrap().len(), 3);
        assert_eq!(engine.stats().rated_count, 3);
    }

    #[test]
    fn update_with_unknown_id_is_not_found() {
        let engine = sample_engine();
        let err = engine
            .create_or_update(input("Ghost", Some(3.0)).with_id(RestaurantId(999)))
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
        assert_eq!(engine.len(), 5);
    }

    #[test]
    fn invalid_input_assigns_no_id() {
        let engine = RankingEngine::new();
        assert!(engine.create_or_update(input("", Some(3.0))).is_err());
        let created = engine.create_or_update(input("First", Some(3.0))).unwrap();
        assert_eq!(created.id, RestaurantId(1));
    }

    #[test]
    fn percentile_and_delta_for_rated_restaurant() {
        let engine = sample_engine();
        let by_name = |name: &str| {
            engine
                .list_all()
                .into_iter()
                .find(|r| r.name == name)
                .unwrap()
                .id
        };

        let top = engine
            .percentile_and_delta(by_name("Sushi Sensation"))
            .unwrap();
        assert_eq!(top.percentile_rank, 1.0);
        assert_eq!(top.delta_from_average, 0.15);

        let tied = engine.percentile_and_delta(by_name("Cafe Cozy")).unwrap();
        assert_eq!(tied.percentile_rank, 0.75);
        assert_eq!(tied.delta_from_average, 0.05);

        let bottom = engine.percentile_and_delta(by_name("Pizza Palace")).unwrap();
        assert_eq!(bottom.percentile_rank, 0.25);
        assert_eq!(bottom.delta_from_average, -0.25);

        assert!(matches!(
            engine.percentile_and_delta(by_name("Grill & Chill")),
            Err(CoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.percentile_and_delta(RestaurantId(404)),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn list_all_is_newest_first() {
        let engine = sample_engine();
        let names: Vec<String> = engine.list_all().into_iter().map(|r| r.name).collect();
        assert_eq!(names.first().map(String::as_str), Some("Grill & Chill"));
        assert_eq!(names.last().map(String::as_str), Some("Sushi Sensation"));
    }

    #[test]
    fn search_filters_then_truncates() {
        let engine = RankingEngine::new();
        for (name, score, cuisine) in [
            ("Sushi Sensation", 4.9, "Japanese"),
            ("Sushi Corner", 3.9, "Japanese"),
            ("The Golden Spoon", 4.8, "Italian"),
            ("Pizza Palace", 4.5, "Italian"),
        ] {
            engine
                .create_or_update(input(name, Some(score)).with_cuisine(cuisine))
                .unwrap();
        }

        let view = engine
            .search(SearchQuery::new(5).with_cuisine("ITALIAN"))
            .unwrap();
        assert_eq!(view.names(), vec!["The Golden Spoon", "Pizza Palace"]);

        let view = engine
            .search(
                SearchQuery::new(5)
                    .with_term("sushi")
                    .with_min_score(Score::from_hundredths(400).unwrap()),
            )
            .unwrap();
        assert_eq!(view.names(), vec!["Sushi Sensation"]);

        let view = engine.search(SearchQuery::new(1).with_term("a")).unwrap();
        assert_eq!(view.len(), 1);

        assert!(engine.search(SearchQuery::new(0)).is_err());
    }
}
