//! Ranking engine for DineRank.
//!
//! Owns the authoritative restaurant store and keeps two composite ordered
//! indexes, keyed by `(score desc, name asc, id asc)`, over rated
//! restaurants:
//!
//! - every rated restaurant
//! - active rated restaurants only
//!
//! A top-K query is an in-order scan of the first K keys of one index, so
//! its cost follows K rather than the collection size. Unrated restaurants
//! never enter either index.
//!
//! # Example
//!
//! ```ignore
//! use dinerank_core::RestaurantInput;
//! use dinerank_engine::RankingEngine;
//!
//! let engine = RankingEngine::new();
//! engine.create_or_update(
//!     RestaurantInput::new("Sushi Sensation", "456 Oak Ave", "+1-555-0102").with_score(4.9),
//! )?;
//! let top = engine.top_k(5, false)?;
//! ```

pub mod engine;
pub mod index;
pub mod query;
pub mod stats;

pub use engine::RankingEngine;
pub use index::{RankIndex, RankKey};
pub use query::SearchQuery;
pub use stats::ScoreHistogram;
