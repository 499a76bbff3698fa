//! ModelClient trait — the abstraction over the language-model backend.
//!
//! The engine never calls the model without an explicit deadline; the
//! deadline is forwarded so implementations can propagate it to their
//! transport (HTTP timeout, local inference budget) and cancel promptly.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::message::Message;

/// Raw output from one model query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    /// The generated text
    pub text: String,

    /// Optional structured fields the backend returned alongside the text
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ModelOutput {
    /// A plain-text output with no structured fields.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// The model collaborator contract.
///
/// Implementations may be slow or unreliable; the engine treats every call
/// as a suspension point and enforces the deadline on its side as well.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// A human-readable name for this backend (e.g. "anthropic", "local").
    fn name(&self) -> &str;

    /// Query the model with the full history log as context.
    async fn query(
        &self,
        history: &[Message],
        deadline: Duration,
    ) -> Result<ModelOutput, ModelError>;
}
