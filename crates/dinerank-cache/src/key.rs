//! Query fingerprints.
//!
//! ## Key Format
//!
//! `{prefix}:{class}:{operation}:{params}` where `params` is `name=value`
//! pairs sorted by name and joined with `&`, e.g.
//! `dinerank:listing:top:active_only=false&k=3`. Values are percent-encoded
//! for `%`, `&`, `=` and `:` so free text cannot imitate another layout.
//!
//! Search keys replace `{operation}:{params}` with its SHA-256 hex digest so
//! user-supplied text never appears in a key.

use crate::error::CacheError;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Query classes, each with its own freshness window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryClass {
    /// Single restaurant by id.
    Entity,
    /// Top-K, stats, full listing and percentile lookups.
    Listing,
    /// Filtered listings.
    Search,
}

impl QueryClass {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryClass::Entity => "entity",
            QueryClass::Listing => "listing",
            QueryClass::Search => "search",
        }
    }

    /// Glob matching every key of this class under `prefix`.
    pub fn pattern(self, prefix: &str) -> String {
        format!("{prefix}:{}:*", self.as_str())
    }
}

impl fmt::Display for QueryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical cache key of one query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    class: QueryClass,
    key: String,
}

impl Fingerprint {
    pub fn builder(
        prefix: impl Into<String>,
        class: QueryClass,
        operation: &'static str,
    ) -> FingerprintBuilder {
        FingerprintBuilder {
            prefix: prefix.into(),
            class,
            operation,
            params: BTreeMap::new(),
        }
    }

    pub fn class(&self) -> QueryClass {
        self.class
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

#[derive(Debug, Clone)]
pub struct FingerprintBuilder {
    prefix: String,
    class: QueryClass,
    operation: &'static str,
    params: BTreeMap<&'static str, String>,
}

impl FingerprintBuilder {
    pub fn param(mut self, name: &'static str, value: impl fmt::Display) -> Self {
        self.params.insert(name, value.to_string());
        self
    }

    /// Free text, trimmed and lower-cased. Blank or absent text adds nothing,
    /// so it fingerprints the same as an unfiltered query.
    pub fn text(mut self, name: &'static str, value: Option<&str>) -> Self {
        if let Some(value) = value.map(|v| v.trim().to_lowercase()).filter(|v| !v.is_empty()) {
            self.params.insert(name, value);
        }
        self
    }

    pub fn build(self) -> Fingerprint {
        let params = self
            .params
            .iter()
            .map(|(name, value)| format!("{name}={}", escape_value(value)))
            .collect::<Vec<_>>()
            .join("&");

        let body = if params.is_empty() {
            self.operation.to_string()
        } else {
            format!("{}:{params}", self.operation)
        };

        let body = match self.class {
            QueryClass::Search => hex::encode(Sha256::digest(body.as_bytes())),
            _ => body,
        };

        Fingerprint {
            class: self.class,
            key: format!("{}:{}:{body}", self.prefix, self.class),
        }
    }
}

fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '%' => out.push_str("%25"),
            '&' => out.push_str("%26"),
            ':' => out.push_str("%3A"),
            '=' => out.push_str("%3D"),
            c => out.push(c),
        }
    }
    out
}

/// Compile a `*`-wildcard glob into an anchored regex.
pub fn glob_to_regex(pattern: &str) -> Result<Regex, CacheError> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$")).map_err(|_| CacheError::InvalidPattern(pattern.to_string()))
}
