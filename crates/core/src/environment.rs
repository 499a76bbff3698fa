//! Environment trait — the abstraction over the sandbox that executes actions.
//!
//! The environment owns process lifecycles and cancellation of external
//! work; the engine only bounds calls with deadlines and records outcomes.
//! Execution semantics are at-least-once: a cancelled call may have started
//! side effects that are not rolled back.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EnvError;
use crate::state::StateSnapshot;

/// Timeout and circuit-breaker configuration reported by the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Per-step bound on one action execution
    pub execution_timeout: Duration,

    /// Bound on the whole run
    pub total_execution_timeout: Duration,

    /// Consecutive execution failures tolerated before the run aborts
    pub max_consecutive_timeouts: u32,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            execution_timeout: Duration::from_secs(25),
            total_execution_timeout: Duration::from_secs(1800),
            max_consecutive_timeouts: 3,
        }
    }
}

/// The environment/tool-execution collaborator contract.
#[async_trait]
pub trait Environment: Send + Sync {
    /// A human-readable name for this environment (e.g. "docker", "local").
    fn name(&self) -> &str;

    /// Execute a validated action and return its observation.
    async fn execute_action(&self, action: &str) -> Result<String, EnvError>;

    /// Snapshot the current environment state.
    async fn state(&self) -> Result<StateSnapshot, EnvError>;

    /// The ordered names of the commands this environment accepts.
    fn command_names(&self) -> Vec<String>;

    /// Timeout and circuit-breaker configuration for runs in this environment.
    fn config(&self) -> EnvConfig {
        EnvConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullEnv;

    #[async_trait]
    impl Environment for NullEnv {
        fn name(&self) -> &str {
            "null"
        }

        async fn execute_action(&self, action: &str) -> Result<String, EnvError> {
            Ok(format!("ran: {action}"))
        }

        async fn state(&self) -> Result<StateSnapshot, EnvError> {
            Ok(StateSnapshot::empty())
        }

        fn command_names(&self) -> Vec<String> {
            vec!["ls".into(), "submit".into()]
        }
    }

    #[tokio::test]
    async fn default_config_is_sane() {
        let env = NullEnv;
        let cfg = env.config();
        assert!(cfg.execution_timeout < cfg.total_execution_timeout);
        assert!(cfg.max_consecutive_timeouts > 0);
    }

    #[tokio::test]
    async fn execute_returns_observation() {
        let env = NullEnv;
        let obs = env.execute_action("ls").await.unwrap();
        assert_eq!(obs, "ran: ls");
    }
}
