//! Restaurant rating held as exact hundredths.
//!
//! Ratings arrive as decimals with two fractional digits (`4.75`). Storing
//! them as integer hundredths gives a total order and exact equality, which
//! the composite ranking index depends on.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A rating in `[0.00, 5.00]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Score(u16);

impl Score {
    /// Largest representable rating, in hundredths.
    pub const MAX_HUNDREDTHS: u16 = 500;

    pub const MIN: Score = Score(0);
    pub const MAX: Score = Score(Self::MAX_HUNDREDTHS);

    /// Fallible constructor from a decimal rating.
    ///
    /// Rejects non-finite values and values outside `[0, 5]`; rounds to the
    /// nearest hundredth.
    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(CoreError::invalid_argument(format!(
                "score must be a finite number, got {value}"
            )));
        }
        if !(0.0..=5.0).contains(&value) {
            return Err(CoreError::invalid_argument(format!(
                "score must be between 0.0 and 5.0, got {value}"
            )));
        }
        let hundredths = (value * 100.0).round() as u16;
        Ok(Self(hundredths.min(Self::MAX_HUNDREDTHS)))
    }

    #[must_use]
    pub fn from_hundredths(hundredths: u16) -> Option<Self> {
        (hundredths <= Self::MAX_HUNDREDTHS).then_some(Self(hundredths))
    }

    #[must_use]
    pub const fn hundredths(self) -> u16 {
        self.0
    }

    #[must_use]
    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl TryFrom<f64> for Score {
    type Error = CoreError;

    fn try_from(value: f64) -> Result<Self> {
        Self::from_f64(value)
    }
}

impl From<Score> for f64 {
    fn from(score: Score) -> Self {
        score.as_f64()
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Round a derived statistic to two decimals, as ratings are displayed.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
