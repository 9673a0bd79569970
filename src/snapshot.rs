//! Availability snapshot and cache key types
//!
//! A [`Snapshot`] is whatever JSON document the client submitted. Nothing
//! inside it is inspected; it is only serialized and stored.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// Suffix of the always-current cache entry
pub const LATEST_SUFFIX: &str = "latest";

/// Default key prefix for both key families
pub const DEFAULT_KEY_PREFIX: &str = "availability";

/// An opaque availability document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Value);

impl Snapshot {
    /// Wrap a JSON value
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Borrow the underlying document
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Take the underlying document
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Compact JSON, as stored in the cache
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Indented JSON (two spaces), as stored in the history file
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.0)?)
    }

    /// Parse a stored document
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(Self(serde_json::from_str(raw)?))
    }
}

impl From<Value> for Snapshot {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Builds the two key families under one prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}

impl KeySpace {
    /// Create a key space with the given prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// `<prefix>:latest`
    #[must_use]
    pub fn latest(&self) -> String {
        format!("{}:{LATEST_SUFFIX}", self.prefix)
    }

    /// `<prefix>:<unix millis>` for a write at `at`
    #[must_use]
    pub fn snapshot_key(&self, at: DateTime<Utc>) -> SnapshotKey {
        SnapshotKey(format!("{}:{}", self.prefix, at.timestamp_millis()))
    }
}

/// Key of one expiring, timestamped snapshot entry
///
/// Two writes within the same millisecond produce the same key; the later
/// one overwrites the earlier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotKey(String);

impl SnapshotKey {
    /// Key as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn default_keys_match_wire_format() {
        let keys = KeySpace::default();
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(keys.latest(), "availability:latest");
        assert_eq!(keys.snapshot_key(at).as_str(), "availability:1700000000123");
    }

    #[test]
    fn custom_prefix_applies_to_both_families() {
        let keys = KeySpace::new("staging");
        let at = Utc.timestamp_millis_opt(5).unwrap();
        assert_eq!(keys.latest(), "staging:latest");
        assert_eq!(keys.snapshot_key(at).to_string(), "staging:5");
    }

    #[test]
    fn pretty_json_uses_two_space_indent() {
        let snapshot = Snapshot::new(json!({"team": "A"}));
        assert_eq!(snapshot.to_pretty_json().unwrap(), "{\n  \"team\": \"A\"\n}");
    }

    #[test]
    fn compact_and_pretty_parse_to_same_document() {
        let snapshot = Snapshot::new(json!({"members": [{"name": "x", "days": [1, 2]}]}));
        let compact = Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        let pretty = Snapshot::from_json(&snapshot.to_pretty_json().unwrap()).unwrap();
        assert_eq!(compact, pretty);
        assert_eq!(compact, snapshot);
    }

    #[test]
    fn from_json_rejects_garbage() {
        assert!(Snapshot::from_json("{not json").is_err());
    }
}
