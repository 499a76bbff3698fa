//! Environment state snapshots.
//!
//! A snapshot is an arbitrary-but-structured JSON document reported by the
//! environment collaborator (open files, working directory, resource usage
//! and so on). The newtype keeps the rest of the engine typed while leaving
//! the payload schema to the environment.

use serde::{Deserialize, Serialize};

/// A point-in-time snapshot of environment state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSnapshot(serde_json::Map<String, serde_json::Value>);

impl StateSnapshot {
    /// The empty snapshot, used when snapshotting fails.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.0.insert(key.into(), value);
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for StateSnapshot {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_has_no_keys() {
        let snap = StateSnapshot::empty();
        assert!(snap.is_empty());
        assert!(snap.get("cwd").is_none());
    }

    #[test]
    fn transparent_serialization() {
        let mut snap = StateSnapshot::empty();
        snap.insert("cwd", serde_json::json!("/workspace"));
        let json = serde_json::to_string(&snap).unwrap();
        assert_eq!(json, r#"{"cwd":"/workspace"}"#);
        let back: StateSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }
}
