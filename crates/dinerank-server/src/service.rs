//! Cache-aside facade over the ranking engine.
//!
//! ## Cache Key Classes
//!
//! | class     | operations                              |
//! |-----------|-----------------------------------------|
//! | `entity`  | get by id                               |
//! | `listing` | top-K, stats, list all, percentile      |
//! | `search`  | filtered search                         |
//!
//! ## Invalidation
//!
//! Every successful write drops the `listing` and `search` classes and the
//! written restaurant's entity key. A failed invalidation is logged and the
//! affected entries age out with their class window.

use crate::config::AppConfig;
use dinerank_cache::{CacheStats, CacheStore, CacheTier, Fingerprint, FreshnessPolicy, QueryClass};
use dinerank_core::{
    CoreError, PercentileRank, RankedView, RankingStats, Restaurant, RestaurantId,
    RestaurantInput, Result,
};
use dinerank_engine::{RankingEngine, SearchQuery};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct RestaurantService {
    engine: Arc<RankingEngine>,
    cache: CacheTier,
    policy: FreshnessPolicy,
    key_prefix: String,
    default_k: usize,
    default_active_only: bool,
    invalidate_on_write: bool,
}

impl RestaurantService {
    pub fn new(engine: Arc<RankingEngine>, store: Arc<dyn CacheStore>, cfg: &AppConfig) -> Self {
        Self {
            engine,
            cache: CacheTier::new(store, cfg.cache.compute_timeout())
                .with_store_timeout(cfg.cache.store_timeout()),
            policy: cfg.cache.freshness(),
            key_prefix: cfg.cache.key_prefix.clone(),
            default_k: cfg.ranking.default_k,
            default_active_only: cfg.ranking.active_only,
            invalidate_on_write: cfg.cache.invalidate_on_write,
        }
    }

    pub fn engine(&self) -> &Arc<RankingEngine> {
        &self.engine
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    pub async fn create(&self, input: RestaurantInput) -> Result<Restaurant> {
        let input = RestaurantInput { id: None, ..input };
        self.write(move |engine| engine.create_or_update(input)).await
    }

    pub async fn update(&self, id: RestaurantId, input: RestaurantInput) -> Result<Restaurant> {
        let input = input.with_id(id);
        self.write(move |engine| engine.create_or_update(input)).await
    }

    pub async fn deactivate(&self, id: RestaurantId) -> Result<Restaurant> {
        self.write(move |engine| engine.deactivate(id)).await
    }

    pub async fn get(&self, id: RestaurantId) -> Result<Restaurant> {
        let fingerprint = self.entity_key(id);
        self.cached(&fingerprint, move |engine| engine.get(id)).await
    }

    /// Top-K with configured defaults for omitted parameters.
    pub async fn top_k(&self, k: Option<usize>, active_only: Option<bool>) -> Result<RankedView> {
        let k = k.unwrap_or(self.default_k);
        let active_only = active_only.unwrap_or(self.default_active_only);
        let fingerprint = self
            .builder(QueryClass::Listing, "top")
            .param("k", k)
            .param("active_only", active_only)
            .build();
        self.cached(&fingerprint, move |engine| engine.top_k(k, active_only))
            .await
    }

    pub async fn stats(&self) -> Result<RankingStats> {
        let fingerprint = self.builder(QueryClass::Listing, "stats").build();
        self.cached(&fingerprint, |engine| Ok(engine.stats())).await
    }

    pub async fn list_all(&self) -> Result<Vec<Restaurant>> {
        let fingerprint = self.builder(QueryClass::Listing, "list").build();
        self.cached(&fingerprint, |engine| Ok(engine.list_all())).await
    }

    pub async fn percentile(&self, id: RestaurantId) -> Result<PercentileRank> {
        let fingerprint = self
            .builder(QueryClass::Listing, "percentile")
            .param("id", id)
            .build();
        self.cached(&fingerprint, move |engine| engine.percentile_and_delta(id))
            .await
    }

    pub async fn search(&self, query: SearchQuery) -> Result<RankedView> {
        let query = query.normalized();
        let fingerprint = self
            .builder(QueryClass::Search, "search")
            .text("q", query.term.as_deref())
            .text("cuisine", query.cuisine.as_deref())
            .param(
                "min_score",
                query.min_score.map(|s| s.hundredths()).unwrap_or(0),
            )
            .param("active_only", query.active_only)
            .param("limit", query.limit)
            .build();
        self.cached(&fingerprint, move |engine| engine.search(query))
            .await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub async fn cache_available(&self) -> bool {
        self.cache.store().is_available().await
    }

    fn builder(&self, class: QueryClass, operation: &'static str) -> dinerank_cache::FingerprintBuilder {
        Fingerprint::builder(self.key_prefix.as_str(), class, operation)
    }

    fn entity_key(&self, id: RestaurantId) -> Fingerprint {
        self.builder(QueryClass::Entity, "restaurant")
            .param("id", id)
            .build()
    }

    async fn cached<T, F>(&self, fingerprint: &Fingerprint, query: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce(&RankingEngine) -> Result<T> + Send + 'static,
    {
        let window = self.policy.window(fingerprint.class());
        self.cache
            .get_or_compute(fingerprint, window, || run_blocking(&self.engine, query))
            .await
    }

    async fn write<F>(&self, mutation: F) -> Result<Restaurant>
    where
        F: FnOnce(&RankingEngine) -> Result<Restaurant> + Send + 'static,
    {
        let restaurant = run_blocking(&self.engine, mutation).await?;
        crate::metrics::set_restaurant_count(self.engine.len());
        self.invalidate_after_write(restaurant.id).await;
        Ok(restaurant)
    }

    async fn invalidate_after_write(&self, id: RestaurantId) {
        if !self.invalidate_on_write {
            return;
        }
        let patterns = [
            QueryClass::Listing.pattern(&self.key_prefix),
            QueryClass::Search.pattern(&self.key_prefix),
            self.entity_key(id).to_string(),
        ];
        for pattern in &patterns {
            match self.cache.invalidate(pattern).await {
                Ok(removed) => debug!(pattern = %pattern, removed, "invalidated after write"),
                Err(e) => warn!(
                    pattern = %pattern,
                    error = %e,
                    "invalidation failed; entries expire with their freshness window"
                ),
            }
        }
    }
}

/// Run an engine call on the blocking pool so a compute timeout can fire
/// while it runs.
async fn run_blocking<T, F>(engine: &Arc<RankingEngine>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&RankingEngine) -> Result<T> + Send + 'static,
{
    let engine = Arc::clone(engine);
    tokio::task::spawn_blocking(move || f(&engine))
        .await
        .map_err(|e| CoreError::internal(format!("engine task failed: {e}")))?
}
