//! Tool safety layer — validates candidate actions before execution.
//!
//! Two pieces, both built from explicit configuration passed at
//! construction time (never a process-wide registry):
//!
//! - [`ToolFilter`]: an ordered rule chain over the action string
//!   (prefix blocklist, standalone blocklist, allow-unless-regex).
//!   First match wins; the default is allow.
//! - [`CommandPatterns`]: compiled per-command matchers used to recognize
//!   single-line and multi-line command forms in an action.

pub mod filter;
pub mod patterns;

pub use filter::{FilterRule, FilterVerdict, ToolFilter, ToolFilterConfig};
pub use patterns::{ActionMatch, CommandPatterns, MultilineGuard};

use thiserror::Error;

/// Errors raised while building the safety layer from configuration.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("invalid filter config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid allow-unless pattern for '{command}': {detail}")]
    InvalidPattern { command: String, detail: String },

    #[error("invalid command form for '{command}': {detail}")]
    InvalidCommandForm { command: String, detail: String },
}
