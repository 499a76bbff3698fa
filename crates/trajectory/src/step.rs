//! The immutable per-step record appended to the journal.

use serde::{Deserialize, Serialize};
use strider_core::{Message, StateSnapshot, StepOutput};

/// One recorded step of a run.
///
/// The history snapshot is deep-copied at build time, so a trajectory step
/// never references a history log that is mutated after the fact. The copy
/// is O(n) in the number of messages at that point, which makes a full run
/// O(n²); acceptable for short runs, a known scalability bound for long
/// ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryStep {
    /// The action that was proposed (and, unless blocked, executed)
    pub action: String,

    /// The observation fed back into the history
    pub observation: String,

    /// The unparsed model response this step was derived from
    pub response: String,

    /// The model's reasoning for this step
    pub thought: String,

    /// Wall-clock execution time of the action in seconds
    #[serde(default)]
    pub execution_time: f64,

    /// Environment state captured after execution
    #[serde(default, skip_serializing_if = "StateSnapshot::is_empty")]
    pub state: StateSnapshot,

    /// Deep copy of the history log at the instant this step completed
    pub history: Vec<Message>,

    /// Extra metadata carried over from the step output
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TrajectoryStep {
    /// Fold a step output and a history snapshot into a journal record.
    pub fn from_step(output: &StepOutput, history: Vec<Message>) -> Self {
        Self {
            action: output.action.clone(),
            observation: output.observation.clone(),
            response: output.raw_output.clone(),
            thought: output.thought.clone(),
            execution_time: output.execution_time,
            state: output.state.clone(),
            history,
            extra: output.extra.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_step_copies_all_fields() {
        let output = StepOutput {
            thought: "check the tree".into(),
            action: "ls".into(),
            observation: "src tests".into(),
            raw_output: "check the tree\nls".into(),
            execution_time: 0.4,
            ..StepOutput::default()
        };
        let history = vec![Message::system("task"), Message::observation("src tests")];

        let step = TrajectoryStep::from_step(&output, history.clone());
        assert_eq!(step.action, "ls");
        assert_eq!(step.thought, "check the tree");
        assert_eq!(step.response, "check the tree\nls");
        assert_eq!(step.history, history);
    }

    #[test]
    fn serialization_roundtrip() {
        let output = StepOutput {
            thought: "t".into(),
            action: "a".into(),
            observation: "o".into(),
            raw_output: "r".into(),
            ..StepOutput::default()
        };
        let step = TrajectoryStep::from_step(&output, vec![Message::system("s")]);
        let json = serde_json::to_string(&step).unwrap();
        let back: TrajectoryStep = serde_json::from_str(&json).unwrap();
        assert_eq!(back, step);
    }
}
