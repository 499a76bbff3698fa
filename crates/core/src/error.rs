//! Error types for the Strider domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Each collaborator
//! contract has its own error enum; `RunError` is the distinguished fatal
//! outcome of a run.

use thiserror::Error;

use crate::step::StepOutput;

/// Errors from the model collaborator.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("model query failed: {0}")]
    QueryFailed(String),

    #[error("model query timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("rate limited by model backend, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("context window exhausted: {0}")]
    ContextExhausted(String),
}

/// Errors from the environment collaborator.
#[derive(Debug, Clone, Error)]
pub enum EnvError {
    #[error("action execution failed: {0}")]
    ExecutionFailed(String),

    #[error("environment unavailable: {0}")]
    Unavailable(String),

    #[error("state snapshot failed: {0}")]
    SnapshotFailed(String),
}

/// Errors from the parser collaborator.
///
/// These never surface from the engine: a parse failure triggers the
/// whole-output fallback instead of dropping the step.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("output did not match any command form")]
    Unmatched,

    #[error("multiple commands in one output")]
    MultipleCommands,

    #[error("malformed output: {0}")]
    Malformed(String),
}

/// The distinguished fatal outcome of a run.
///
/// Everything here aborts the run; recoverable conditions (parse fallback,
/// blocked actions, snapshot and journal-write failures) are handled inside
/// the step engine and never reach this type. The trajectory journal up to
/// the failure point remains on disk for post-mortem analysis.
#[derive(Debug, Error)]
pub enum RunError {
    /// The model collaborator failed; the run cannot continue without it.
    #[error("model collaborator failed: {0}")]
    Model(#[from] ModelError),

    /// The consecutive-failure circuit breaker tripped.
    #[error(
        "{consecutive} consecutive execution failures (limit {limit}) after {steps} steps"
    )]
    ConsecutiveFailures {
        consecutive: u32,
        limit: u32,
        steps: usize,
        elapsed_secs: f64,
        /// The step that tripped the breaker, already recorded in the journal.
        last_step: Box<StepOutput>,
    },

    /// The total-execution deadline expired mid-run.
    #[error("total execution deadline of {limit_secs}s exceeded after {steps} steps")]
    TotalDeadlineExceeded { limit_secs: u64, steps: usize },

    /// A required setup input was absent at initialization.
    #[error("missing required setup input: {0}")]
    MissingSetup(String),

    /// A setup input was present but unusable at initialization.
    #[error("invalid setup input: {0}")]
    InvalidSetup(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_error_displays_counts() {
        let err = RunError::ConsecutiveFailures {
            consecutive: 3,
            limit: 3,
            steps: 7,
            elapsed_secs: 12.5,
            last_step: Box::new(StepOutput::default()),
        };
        let text = err.to_string();
        assert!(text.contains("3 consecutive"));
        assert!(text.contains("7 steps"));
    }

    #[test]
    fn model_error_converts_into_run_error() {
        let err: RunError = ModelError::QueryFailed("boom".into()).into();
        assert!(matches!(err, RunError::Model(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn deadline_error_displays_limit() {
        let err = RunError::TotalDeadlineExceeded {
            limit_secs: 1800,
            steps: 40,
        };
        assert!(err.to_string().contains("1800"));
    }
}
