//! Cache-aside tier for ranking queries.
//!
//! ## Layout
//!
//! - [`CacheStore`]: byte-level storage with TTL. [`LocalStore`] keeps
//!   entries in a `DashMap`; [`RedisStore`] shares them across instances.
//! - [`Fingerprint`]: canonical key for one query, scoped by [`QueryClass`].
//! - [`FreshnessPolicy`]: maximum age per query class.
//! - [`CacheTier`]: `get_or_compute` on top of a store, with a bounded
//!   compute and hit/miss accounting.
//!
//! ## Graceful Degradation
//!
//! Store failures never reach callers of [`CacheTier::get_or_compute`]. The
//! call is logged, counted as degraded and answered from `compute`, so a
//! broken cache changes where an answer comes from, never what it is.

pub mod error;
pub mod key;
pub mod metrics;
pub mod policy;
pub mod store;
pub mod tier;

pub use error::CacheError;
pub use key::{Fingerprint, FingerprintBuilder, QueryClass};
pub use policy::FreshnessPolicy;
pub use store::{CacheStore, CachedEntry, LocalStore, RedisConfig, RedisStore, create_cache_store};
pub use tier::{CacheStats, CacheTier};
