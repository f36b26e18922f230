use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend-assigned identity of a directory record.
///
/// The value is opaque to callers. Backends in this workspace mint UUID v7
/// strings so ids sort by creation time, but any non-empty string is a valid
/// id for an engine that prefers its own scheme.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Mint a new time-ordered record id (UUID v7).
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Wrap an id produced elsewhere (e.g. by an external database).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short representation (first 8 characters).
    pub fn short_id(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_non_empty() {
        let a = RecordId::generate();
        let b = RecordId::generate();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn generated_ids_are_time_ordered() {
        let a = RecordId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = RecordId::generate();
        assert!(a < b);
    }

    #[test]
    fn short_id_handles_short_values() {
        assert_eq!(RecordId::new("abc").short_id(), "abc");
        assert_eq!(RecordId::new("0123456789").short_id(), "01234567");
    }

    #[test]
    fn serde_is_transparent() {
        let id = RecordId::new("rec-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"rec-1\"");
        let parsed: RecordId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
