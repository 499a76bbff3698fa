//! Message and HistoryLog domain types.
//!
//! The history log is the ordered message record that forms the model's
//! context window: the engine appends a thought+action message and an
//! observation message per step, and hands the whole log back to the model
//! on the next query.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in the history log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (problem statement, rules)
    System,
    /// The environment talking back to the agent (observations)
    User,
    /// The agent's own output (thought + action)
    Assistant,
}

/// A single message in the history log.
///
/// Messages are immutable once appended: the log hands out references and
/// deep copies, never mutable access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Which agent instance originated this message
    #[serde(default = "default_agent")]
    pub agent: String,

    /// Presentation-agnostic kind tag (e.g. "thought_action", "observation")
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message_type: String,

    /// The reasoning half of a thought+action message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,

    /// The tool-invocation half of a thought+action message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// The unparsed model output this message was derived from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,

    /// Extra metadata (host annotations, collaborator info, etc.)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_agent() -> String {
    "main".into()
}

impl Message {
    fn base(role: Role, content: impl Into<String>, message_type: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            agent: default_agent(),
            message_type: message_type.into(),
            thought: None,
            action: None,
            raw_output: None,
            timestamp: Utc::now(),
            extra: serde_json::Map::new(),
        }
    }

    /// Create a system message (problem statement, instructions).
    pub fn system(content: impl Into<String>) -> Self {
        Self::base(Role::System, content, "system")
    }

    /// Create a user-role observation message.
    pub fn observation(content: impl Into<String>) -> Self {
        Self::base(Role::User, content, "observation")
    }

    /// Create an assistant message combining thought and action.
    ///
    /// The content is the rendered pair; the structured halves and the raw
    /// model output are kept alongside for replay.
    pub fn thought_action(
        thought: impl Into<String>,
        action: impl Into<String>,
        raw_output: impl Into<String>,
    ) -> Self {
        let thought = thought.into();
        let action = action.into();
        let content = if thought.is_empty() {
            action.clone()
        } else {
            format!("{thought}\n\n{action}")
        };
        let mut msg = Self::base(Role::Assistant, content, "thought_action");
        msg.thought = Some(thought);
        msg.action = Some(action);
        msg.raw_output = Some(raw_output.into());
        msg
    }

    /// Attach the originating agent name.
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = agent.into();
        self
    }
}

/// The append-only ordered message record for one run.
///
/// The log only grows during a run: there is no removal or in-place
/// mutation API, and snapshots are deep copies taken at call time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryLog {
    messages: Vec<Message>,
}

impl HistoryLog {
    /// Create a new empty history log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. The message is owned by the log from here on.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// The ordered messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The view handed to the model collaborator as context.
    pub fn model_view(&self) -> &[Message] {
        &self.messages
    }

    /// Deep copy of the log at this instant.
    ///
    /// Used when building a trajectory step so the recorded history can
    /// never observe later appends.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thought_action_renders_both_halves() {
        let msg = Message::thought_action("I should list files", "ls -la", "raw text");
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.content.contains("I should list files"));
        assert!(msg.content.contains("ls -la"));
        assert_eq!(msg.thought.as_deref(), Some("I should list files"));
        assert_eq!(msg.action.as_deref(), Some("ls -la"));
        assert_eq!(msg.raw_output.as_deref(), Some("raw text"));
    }

    #[test]
    fn empty_thought_renders_action_only() {
        let msg = Message::thought_action("", "submit", "submit");
        assert_eq!(msg.content, "submit");
    }

    #[test]
    fn observation_is_user_role() {
        let msg = Message::observation("file not found");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.message_type, "observation");
    }

    #[test]
    fn history_only_grows() {
        let mut log = HistoryLog::new();
        log.push(Message::system("solve the task"));
        log.push(Message::observation("ok"));
        assert_eq!(log.len(), 2);
        assert_eq!(log.messages()[0].role, Role::System);
    }

    #[test]
    fn snapshot_is_isolated_from_later_appends() {
        let mut log = HistoryLog::new();
        log.push(Message::system("start"));
        let snap = log.snapshot();
        log.push(Message::observation("later"));
        assert_eq!(snap.len(), 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn message_serialization_roundtrip() {
        let msg = Message::thought_action("think", "act", "raw");
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
