//! ActionParser trait — splits raw model output into thought and action.
//!
//! Parsing is pure and synchronous. A parse failure never loses a step: the
//! engine falls back to treating the whole raw output as the action and
//! records a synthetic thought noting the fallback.

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::ParseError;

/// A successfully split model output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedAction {
    /// The reasoning text preceding the action
    pub thought: String,

    /// The tool-invocation string to validate and execute
    pub action: String,
}

/// The parser collaborator contract.
pub trait ActionParser: Send + Sync {
    /// Split raw model output into (thought, action) given the registered
    /// commands.
    fn parse(&self, raw_output: &str, commands: &[Command]) -> Result<ParsedAction, ParseError>;
}
