use crate::error::{CoreError, Result};
use crate::ranking::RestaurantRecord;
use crate::score::Score;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Engine-assigned restaurant identifier. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RestaurantId(pub u64);

impl RestaurantId {
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RestaurantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RestaurantId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A persisted restaurant as owned by the ranking engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub id: RestaurantId,
    pub name: String,
    pub address: String,
    pub phone: String,
    /// `None` means unrated; unrated restaurants never rank.
    pub score: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Restaurant {
    pub fn is_rated(&self) -> bool {
        self.score.is_some()
    }

    /// Project onto the ranked egress record; `None` when unrated.
    pub fn to_record(&self) -> Option<RestaurantRecord> {
        let score = self.score?;
        Some(RestaurantRecord {
            id: self.id,
            name: self.name.clone(),
            address: self.address.clone(),
            phone: self.phone.clone(),
            score,
        })
    }
}

/// Ingress payload for `create_or_update`.
///
/// Without `id` a new restaurant is created; with `id` the existing
/// restaurant is replaced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantInput {
    #[serde(default)]
    pub id: Option<RestaurantId>,
    pub name: String,
    pub address: String,
    pub phone: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// Validated ingress fields, trimmed and with the score parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInput {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub score: Option<Score>,
    pub cuisine: Option<String>,
    pub description: Option<String>,
    pub active: bool,
}

impl RestaurantInput {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            phone: phone.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: RestaurantId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_cuisine(mut self, cuisine: impl Into<String>) -> Self {
        self.cuisine = Some(cuisine.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Check required fields and the score range.
    pub fn validate(&self) -> Result<ValidatedInput> {
        let name = required("name", &self.name)?;
        let address = required("address", &self.address)?;
        let phone = required("phone", &self.phone)?;
        let score = self.score.map(Score::from_f64).transpose()?;

        Ok(ValidatedInput {
            name,
            address,
            phone,
            score,
            cuisine: optional(self.cuisine.as_deref()),
            description: optional(self.description.as_deref()),
            active: self.active.unwrap_or(true),
        })
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::invalid_argument(format!(
            "{field} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
