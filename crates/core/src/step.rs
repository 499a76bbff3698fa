//! Step output — the ephemeral product of one engine iteration.
//!
//! A `StepOutput` is produced once per step, inspected by the run loop, and
//! folded into a trajectory step for the journal. It is not retained by the
//! engine afterwards.

use serde::{Deserialize, Serialize};

use crate::state::StateSnapshot;

/// Record of a single validated tool invocation within a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// The command name (first word of the action)
    pub command: String,

    /// The full action string as executed
    pub action: String,

    /// Whether execution returned without error
    pub success: bool,

    /// Wall-clock execution time in seconds
    pub duration_secs: f64,
}

/// The result of one query→parse→validate→execute→record iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepOutput {
    /// The model's reasoning for this step
    pub thought: String,

    /// The action proposed (and, unless blocked, executed)
    pub action: String,

    /// What came back from execution, or the synthetic explanation when
    /// the action was blocked or failed
    pub observation: String,

    /// The unparsed model output this step was derived from
    pub raw_output: String,

    /// Environment state captured after execution (empty on snapshot failure)
    pub state: StateSnapshot,

    /// The final payload, set only when the submit prefix matched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission: Option<String>,

    /// Exit status, set only on completion (e.g. "submitted")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_status: Option<String>,

    /// Whether this step completed the run
    #[serde(default)]
    pub done: bool,

    /// Wall-clock execution time of the action in seconds
    #[serde(default)]
    pub execution_time: f64,

    /// Extra metadata attached by the engine or host
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,

    /// Tool invocations performed during this step (empty when blocked)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRecord>,
}

impl StepOutput {
    /// Whether the action actually reached the environment.
    pub fn executed(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_step_is_not_done() {
        let out = StepOutput::default();
        assert!(!out.done);
        assert!(out.submission.is_none());
        assert!(!out.executed());
    }

    #[test]
    fn optional_fields_skipped_in_json() {
        let out = StepOutput {
            thought: "t".into(),
            action: "a".into(),
            observation: "o".into(),
            raw_output: "r".into(),
            ..StepOutput::default()
        };
        let json = serde_json::to_string(&out).unwrap();
        assert!(!json.contains("submission"));
        assert!(!json.contains("exit_status"));
        assert!(!json.contains("tool_calls"));
    }

    #[test]
    fn serialization_roundtrip() {
        let out = StepOutput {
            thought: "look around".into(),
            action: "ls".into(),
            observation: "README.md".into(),
            raw_output: "look around\nls".into(),
            done: true,
            exit_status: Some("submitted".into()),
            submission: Some("answer".into()),
            execution_time: 0.25,
            tool_calls: vec![ToolCallRecord {
                command: "ls".into(),
                action: "ls".into(),
                success: true,
                duration_secs: 0.25,
            }],
            ..StepOutput::default()
        };
        let json = serde_json::to_string(&out).unwrap();
        let back: StepOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back, out);
    }
}
