use crate::key::QueryClass;
use std::time::Duration;

/// Maximum age per query class. An entry older than its class window is
/// never served, whether or not invalidation reached it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    pub entity: Duration,
    pub listing: Duration,
    pub search: Duration,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::from_secs(3600, 1800, 900)
    }
}

impl FreshnessPolicy {
    pub fn from_secs(entity: u64, listing: u64, search: u64) -> Self {
        Self {
            entity: Duration::from_secs(entity),
            listing: Duration::from_secs(listing),
            search: Duration::from_secs(search),
        }
    }

    pub fn window(&self, class: QueryClass) -> Duration {
        match class {
            QueryClass::Entity => self.entity,
            QueryClass::Listing => self.listing,
            QueryClass::Search => self.search,
        }
    }
}
