//! Cache counters. Recorded through the `metrics` facade; a no-op until the
//! binary installs a recorder.

use crate::key::QueryClass;
use metrics::counter;

pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "cache_misses_total";
    pub const CACHE_DEGRADED_TOTAL: &str = "cache_degraded_total";
    pub const CACHE_INVALIDATIONS_TOTAL: &str = "cache_invalidations_total";
}

pub fn record_cache_hit(class: QueryClass) {
    counter!(names::CACHE_HITS_TOTAL, "class" => class.as_str()).increment(1);
}

pub fn record_cache_miss(class: QueryClass) {
    counter!(names::CACHE_MISSES_TOTAL, "class" => class.as_str()).increment(1);
}

/// Record a store call that failed and was answered without the cache.
pub fn record_degraded(operation: &'static str) {
    counter!(names::CACHE_DEGRADED_TOTAL, "operation" => operation).increment(1);
}

pub fn record_invalidation() {
    counter!(names::CACHE_INVALIDATIONS_TOTAL).increment(1);
}
