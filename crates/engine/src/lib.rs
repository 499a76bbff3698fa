//! # Strider Engine
//!
//! The step state machine that drives an agent-style worker through
//! repeated observe→decide→act→record cycles until it submits a result or
//! fails.
//!
//! One step ties together a model query, a parse, a validated execution,
//! and the history/journal updates. Steps execute strictly sequentially
//! within a run; the model query and the tool execution are the only
//! suspension points, and both run under explicit deadlines. Multiple
//! independent engines may run concurrently, each with its own history,
//! backlog, and journal.

pub mod config;
pub mod engine;

pub use config::EngineConfig;
pub use engine::{RunResult, StepEngine, StepEngineBuilder, StepPhase};
