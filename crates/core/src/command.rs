//! Command registration — the tool surface the model is allowed to invoke.
//!
//! Commands are registered once at setup and immutable thereafter. A command
//! with an end-marker takes a multi-line body (`name … marker`); all others
//! are single-line.

use serde::{Deserialize, Serialize};

/// A registered command the model may emit in its actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// The command name (first word of the action, e.g. "edit", "submit")
    pub name: String,

    /// Description of what this command does (shown to the model)
    #[serde(default)]
    pub description: String,

    /// End-marker for multi-line forms (e.g. "end_of_edit")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_marker: Option<String>,

    /// JSON Schema describing this command's parameters
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub parameters: serde_json::Value,
}

impl Command {
    /// Create a single-line command.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            end_marker: None,
            parameters: serde_json::Value::Null,
        }
    }

    /// Mark this command as multi-line, terminated by the given marker.
    pub fn with_end_marker(mut self, marker: impl Into<String>) -> Self {
        self.end_marker = Some(marker.into());
        self
    }

    /// Attach a parameter schema.
    pub fn with_parameters(mut self, schema: serde_json::Value) -> Self {
        self.parameters = schema;
        self
    }

    /// Whether this command takes a multi-line body.
    pub fn is_multi_line(&self) -> bool {
        self.end_marker.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_by_default() {
        let cmd = Command::new("ls", "list files");
        assert!(!cmd.is_multi_line());
    }

    #[test]
    fn end_marker_makes_multi_line() {
        let cmd = Command::new("edit", "edit a range").with_end_marker("end_of_edit");
        assert!(cmd.is_multi_line());
        assert_eq!(cmd.end_marker.as_deref(), Some("end_of_edit"));
    }

    #[test]
    fn null_parameters_skipped_in_json() {
        let cmd = Command::new("ls", "list files");
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(!json.contains("parameters"));
    }
}
