//! Engine configuration — an explicit object passed at construction.
//!
//! There is no process-wide registry: every engine instance carries its
//! own configuration, filter, and compiled command patterns.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Behavior knobs for one engine instance.
///
/// Timeouts and the circuit-breaker limit come from the environment
/// collaborator's [`strider_core::EnvConfig`]; this struct covers the
/// engine-side choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// The command prefix that marks a completion action.
    pub submit_command: String,

    /// End-marker compiled for the submit command's multi-line form when
    /// the registration carries none of its own.
    pub submit_end_marker: String,

    /// Deadline passed to each model query.
    pub model_deadline: Duration,

    /// Priority of the root task seeded into the backlog.
    pub root_task_priority: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            submit_command: "submit".into(),
            submit_end_marker: "end_submit".into(),
            model_deadline: Duration::from_secs(120),
            root_task_priority: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = EngineConfig::default();
        assert_eq!(config.submit_command, "submit");
        assert!(config.model_deadline > Duration::ZERO);
    }

    #[test]
    fn serialization_roundtrip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
