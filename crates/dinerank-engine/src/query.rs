use dinerank_core::{Restaurant, Score};
use serde::{Deserialize, Serialize};

/// Filtered listing over rated restaurants.
///
/// Results keep ranking order; `limit` truncates after filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Case-insensitive substring matched against name, cuisine and description.
    pub term: Option<String>,
    /// Case-insensitive exact cuisine.
    pub cuisine: Option<String>,
    pub min_score: Option<Score>,
    pub active_only: bool,
    pub limit: usize,
}

impl SearchQuery {
    pub fn new(limit: usize) -> Self {
        Self {
            term: None,
            cuisine: None,
            min_score: None,
            active_only: false,
            limit,
        }
    }

    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = Some(term.into());
        self
    }

    pub fn with_cuisine(mut self, cuisine: impl Into<String>) -> Self {
        self.cuisine = Some(cuisine.into());
        self
    }

    pub fn with_min_score(mut self, min_score: Score) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn active_only(mut self, active_only: bool) -> Self {
        self.active_only = active_only;
        self
    }

    /// Trim and lower-case text filters; blank filters become `None`.
    ///
    /// Two queries that differ only in case or surrounding whitespace
    /// normalize to the same value.
    pub fn normalized(self) -> Self {
        Self {
            term: normalize_text(self.term),
            cuisine: normalize_text(self.cuisine),
            ..self
        }
    }

    /// Check the text filters against a restaurant. Expects a normalized query.
    ///
    /// Score and active filters are applied by the index scan.
    pub fn matches_text(&self, restaurant: &Restaurant) -> bool {
        if let Some(cuisine) = &self.cuisine {
            let matches_cuisine = restaurant
                .cuisine
                .as_deref()
                .is_some_and(|c| c.to_lowercase() == *cuisine);
            if !matches_cuisine {
                return false;
            }
        }

        match &self.term {
            None => true,
            Some(term) => [
                Some(restaurant.name.as_str()),
                restaurant.cuisine.as_deref(),
                restaurant.description.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(term.as_str())),
        }
    }
}

fn normalize_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dinerank_core::{RestaurantId, now_utc};

    fn restaurant(name: &str, cuisine: Option<&str>, description: Option<&str>) -> Restaurant {
        let now = now_utc();
        Restaurant {
            id: RestaurantId(1),
            name: name.to_string(),
            address: "123 Main St".to_string(),
            phone: "+1-555-0101".to_string(),
            score: Score::from_hundredths(480),
            cuisine: cuisine.map(str::to_string),
            description: description.map(str::to_string),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn normalized_lowercases_and_drops_blank() {
        let q = SearchQuery::new(5)
            .with_term("  SuShi ")
            .with_cuisine("   ")
            .normalized();
        assert_eq!(q.term.as_deref(), Some("sushi"));
        assert_eq!(q.cuisine, None);
    }

    #[test]
    fn term_matches_name_cuisine_or_description() {
        let r = restaurant(
            "The Golden Spoon",
            Some("Italian"),
            Some("Authentic Italian cuisine with a modern twist"),
        );
        assert!(SearchQuery::new(5).with_term("golden").normalized().matches_text(&r));
        assert!(SearchQuery::new(5).with_term("ITAL").normalized().matches_text(&r));
        assert!(SearchQuery::new(5).with_term("modern").normalized().matches_text(&r));
        assert!(!SearchQuery::new(5).with_term("sushi").normalized().matches_text(&r));
    }

    #[test]
    fn cuisine_is_exact_match() {
        let r = restaurant("Sushi Sensation", Some("Japanese"), None);
        assert!(SearchQuery::new(5).with_cuisine("japanese").normalized().matches_text(&r));
        assert!(!SearchQuery::new(5).with_cuisine("japan").normalized().matches_text(&r));

        let no_cuisine = restaurant("Cafe Cozy", None, None);
        assert!(!SearchQuery::new(5).with_cuisine("cafe").normalized().matches_text(&no_cuisine));
    }

    #[test]
    fn empty_query_matches_everything() {
        let r = restaurant("Pizza Palace", None, None);
        assert!(SearchQuery::new(5).normalized().matches_text(&r));
    }
}
