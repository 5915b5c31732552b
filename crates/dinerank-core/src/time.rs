use crate::error::{CoreError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// UTC instant serialized as an RFC 3339 string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub OffsetDateTime);

impl Timestamp {
    pub fn new(datetime: OffsetDateTime) -> Self {
        Self(datetime)
    }

    pub fn unix_timestamp(&self) -> i64 {
        self.0.unix_timestamp()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self.0.format(&Rfc3339).map_err(|_| fmt::Error)?;
        write!(f, "{formatted}")
    }
}

impl FromStr for Timestamp {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let datetime = OffsetDateTime::parse(s, &Rfc3339).map_err(|e| {
            CoreError::invalid_argument(format!("Failed to parse timestamp '{s}': {e}"))
        })?;
        Ok(Timestamp(datetime))
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = self.0.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Timestamp::from_str(&s).map_err(serde::de::Error::custom)
    }
}

pub fn now_utc() -> Timestamp {
    Timestamp(OffsetDateTime::now_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_timestamp_display() {
        let ts = Timestamp::new(datetime!(2024-01-15 10:30:00 UTC));
        assert_eq!(ts.to_string(), "2024-01-15T10:30:00Z");
    }

    #[test]
    fn test_timestamp_from_str_with_offset() {
        let ts = Timestamp::from_str("2024-01-15T12:30:00+02:00").unwrap();
        assert_eq!(
            ts.0.to_offset(time::UtcOffset::UTC),
            datetime!(2024-01-15 10:30:00 UTC)
        );
    }

    #[test]
    fn test_timestamp_from_str_invalid() {
        assert!(Timestamp::from_str("yesterday").is_err());
        assert!(Timestamp::from_str("").is_err());
    }

    #[test]
    fn test_timestamp_serde() {
        let ts = Timestamp::new(datetime!(2024-01-20 14:45:00 UTC));
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2024-01-20T14:45:00Z\"");
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn test_now_utc_is_monotonic_enough() {
        let a = now_utc();
        let b = now_utc();
        assert!(b >= a);
    }
}
