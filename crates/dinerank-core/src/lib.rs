//! Core types shared by the DineRank crates.
//!
//! - [`Restaurant`]: the authoritative entity owned by the ranking engine
//! - [`Score`]: a rating in `[0, 5]` held as exact hundredths
//! - [`RankedView`], [`RankingStats`], [`PercentileRank`]: egress shapes
//! - [`CoreError`]: the error taxonomy surfaced to callers

pub mod error;
pub mod ranking;
pub mod restaurant;
pub mod score;
pub mod time;

pub use error::{CoreError, ErrorCategory, Result};
pub use ranking::{PercentileRank, RankedView, RankingStats, RestaurantRecord, rank_order};
pub use restaurant::{Restaurant, RestaurantId, RestaurantInput, ValidatedInput};
pub use score::{Score, round2};
pub use time::{Timestamp, now_utc};
