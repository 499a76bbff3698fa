//! The step engine — one state machine per run.
//!
//! `step()` performs one query→parse→validate→execute→record iteration;
//! `run()` loops it under the total-execution deadline until a submission
//! or a fatal error. Recoverable conditions (parse fallback, blocked
//! actions, snapshot and journal-write failures) are handled inside the
//! step and never surface; execution errors feed the consecutive-failure
//! circuit breaker.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use strider_backlog::{Task, TaskBacklog};
use strider_core::{
    ActionParser, Command, EnvConfig, Environment, HistoryLog, Message, ModelClient, ModelError,
    ParsedAction, RunError, StateSnapshot, StepOutput, ToolCallRecord,
};
use strider_guard::{CommandPatterns, ToolFilter};
use strider_trajectory::{RunInfo, TrajectoryJournal, TrajectoryStep};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;

/// The engine's position in the step state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPhase {
    /// Between steps
    Idle,
    /// Model query in flight
    AwaitingModel,
    /// Splitting raw output into thought and action
    Parsing,
    /// Action execution in flight
    Executing,
    /// Appending history and journal records
    Recording,
    /// Run completed with a submission
    Done,
    /// Run aborted fatally
    Failed,
}

/// The completed outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Exit status (e.g. "submitted")
    pub exit_status: String,

    /// The submitted payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission: Option<String>,

    /// Steps taken over the whole run
    pub steps: usize,

    /// Wall-clock run duration in seconds
    pub elapsed_secs: f64,

    /// The step that produced the submission
    pub final_step: StepOutput,

    /// The root task, marked completed with the submission as its result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
}

/// Builder for [`StepEngine`].
///
/// Collaborators and the problem statement are required; everything else
/// has defaults. Missing required inputs fail `build` with
/// [`RunError::MissingSetup`].
#[derive(Default)]
pub struct StepEngineBuilder {
    model: Option<Arc<dyn ModelClient>>,
    env: Option<Arc<dyn Environment>>,
    parser: Option<Arc<dyn ActionParser>>,
    problem_statement: Option<String>,
    commands: Vec<Command>,
    filter: Option<ToolFilter>,
    config: EngineConfig,
    journal: Option<TrajectoryJournal>,
}

impl StepEngineBuilder {
    pub fn model(mut self, model: Arc<dyn ModelClient>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn environment(mut self, env: Arc<dyn Environment>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn parser(mut self, parser: Arc<dyn ActionParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// The root goal driving the run. Required and non-empty.
    pub fn problem_statement(mut self, statement: impl Into<String>) -> Self {
        self.problem_statement = Some(statement.into());
        self
    }

    /// The registered command surface. Compiled into matchers at build.
    pub fn commands(mut self, commands: Vec<Command>) -> Self {
        self.commands = commands;
        self
    }

    /// Override the default action filter.
    pub fn filter(mut self, filter: ToolFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the default in-memory journal (e.g. with a persisted one).
    pub fn journal(mut self, journal: TrajectoryJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Validate setup inputs and assemble the engine.
    pub fn build(self) -> Result<StepEngine, RunError> {
        let model = self
            .model
            .ok_or_else(|| RunError::MissingSetup("model collaborator".into()))?;
        let env = self
            .env
            .ok_or_else(|| RunError::MissingSetup("environment collaborator".into()))?;
        let parser = self
            .parser
            .ok_or_else(|| RunError::MissingSetup("parser collaborator".into()))?;
        let problem_statement = self
            .problem_statement
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| RunError::MissingSetup("problem statement".into()))?;

        let patterns = CommandPatterns::compile(
            &self.commands,
            &self.config.submit_command,
            &self.config.submit_end_marker,
        )
        .map_err(|e| RunError::InvalidSetup(format!("command forms: {e}")))?;

        let env_config = env.config();
        debug!(
            environment = env.name(),
            tools = ?env.command_names(),
            "Engine assembled"
        );

        let mut history = HistoryLog::new();
        history.push(Message::system(&problem_statement));

        let journal = self
            .journal
            .unwrap_or_else(|| TrajectoryJournal::new(RunInfo::new(&problem_statement)));

        let backlog = TaskBacklog::new();
        backlog.add_task(
            &problem_statement,
            self.config.root_task_priority,
            StateSnapshot::empty(),
            None,
        );

        Ok(StepEngine {
            model,
            env,
            parser,
            filter: self.filter.unwrap_or_default(),
            patterns,
            commands: self.commands,
            config: self.config,
            env_config,
            problem_statement,
            history,
            journal,
            backlog,
            active_task: None,
            phase: StepPhase::Idle,
            consecutive_failures: 0,
            steps_taken: 0,
            run_started: None,
        })
    }
}

/// The state machine tying a model query, a parse, a validated execution,
/// and history/journal updates into one iteration.
///
/// All mutable state is per-engine; independent engines may run
/// concurrently without sharing anything.
pub struct StepEngine {
    model: Arc<dyn ModelClient>,
    env: Arc<dyn Environment>,
    parser: Arc<dyn ActionParser>,
    filter: ToolFilter,
    patterns: CommandPatterns,
    commands: Vec<Command>,
    config: EngineConfig,
    env_config: EnvConfig,
    problem_statement: String,
    history: HistoryLog,
    journal: TrajectoryJournal,
    backlog: TaskBacklog,
    active_task: Option<Task>,
    phase: StepPhase,
    consecutive_failures: u32,
    steps_taken: usize,
    run_started: Option<Instant>,
}

impl StepEngine {
    pub fn builder() -> StepEngineBuilder {
        StepEngineBuilder::default()
    }

    /// Perform one step: query the model, parse, validate, execute, and
    /// record. Returns the step output, or a fatal error that aborts the
    /// run.
    pub async fn step(&mut self) -> Result<StepOutput, RunError> {
        self.run_started.get_or_insert_with(Instant::now);

        if self.active_task.is_none() {
            self.active_task = self.backlog.get_next_task();
        }

        // 1. Model query, always under an explicit deadline.
        self.phase = StepPhase::AwaitingModel;
        let deadline = self.config.model_deadline;
        let raw = match timeout(deadline, self.model.query(self.history.model_view(), deadline))
            .await
        {
            Ok(result) => result.map_err(|e| {
                self.phase = StepPhase::Failed;
                RunError::Model(e)
            })?,
            Err(_) => {
                self.phase = StepPhase::Failed;
                return Err(RunError::Model(ModelError::Timeout {
                    timeout_secs: deadline.as_secs(),
                }));
            }
        };

        // 2. Parse, with the whole-output fallback: a step is never
        //    silently dropped.
        self.phase = StepPhase::Parsing;
        let parsed = match self.parser.parse(&raw.text, &self.commands) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(error = %e, "Parse failed, treating entire output as the action");
                ParsedAction {
                    thought: format!("(no thought parsed: {e}; treating entire output as the action)"),
                    action: raw.text.trim().to_string(),
                }
            }
        };

        let mut output = StepOutput {
            thought: parsed.thought,
            action: parsed.action,
            raw_output: raw.text,
            ..StepOutput::default()
        };

        // Multi-line detection hook; currently a pass-through.
        let guard = self.patterns.guard_multiline_input(&output.action);
        if guard.multi_line {
            debug!(command = ?guard.command, "Action opens a multi-line form");
        }

        // 3. Validate. A blocked action short-circuits: no execution.
        let verdict = self.filter.check(&output.action);
        let mut submittable = true;
        if verdict.blocked {
            output.observation = verdict.message;
            submittable = false;
        } else {
            // 4. Execute under the per-step timeout. Errors are counted,
            //    not fatal, until the circuit breaker trips.
            self.phase = StepPhase::Executing;
            let exec_timeout = self.env_config.execution_timeout;
            let started = Instant::now();
            let exec = timeout(exec_timeout, self.env.execute_action(&output.action)).await;
            output.execution_time = started.elapsed().as_secs_f64();

            let mut record = ToolCallRecord {
                command: output
                    .action
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_string(),
                action: output.action.clone(),
                success: false,
                duration_secs: output.execution_time,
            };

            match exec {
                Ok(Ok(observation)) => {
                    record.success = true;
                    output.observation = observation;
                    self.consecutive_failures = 0;
                }
                Ok(Err(e)) => {
                    output.observation = format!("Execution failed: {e}");
                    self.consecutive_failures += 1;
                    submittable = false;
                }
                Err(_) => {
                    output.observation = format!(
                        "Execution timed out after {}s",
                        exec_timeout.as_secs()
                    );
                    self.consecutive_failures += 1;
                    submittable = false;
                }
            }
            output.tool_calls.push(record);
        }

        // 5. Completion detection on the submit prefix.
        if submittable && let Some(payload) = self.extract_submission(&output.action) {
            output.done = true;
            output.exit_status = Some("submitted".into());
            output.submission = Some(payload);
        }

        // 6. Best-effort state snapshot; failure never aborts the step.
        output.state = match self.env.state().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "State snapshot failed, recording empty snapshot");
                StateSnapshot::empty()
            }
        };

        // 7. Exactly two messages per step: thought+action, observation.
        self.phase = StepPhase::Recording;
        self.history.push(Message::thought_action(
            &output.thought,
            &output.action,
            &output.raw_output,
        ));
        self.history.push(Message::observation(&output.observation));

        // 8. Journal the step from a deep history copy; a persist failure
        //    is a warning, never fatal.
        self.journal
            .append(TrajectoryStep::from_step(&output, self.history.snapshot()));
        if let Err(e) = self.journal.save() {
            warn!(error = %e, "Journal persist failed");
        }

        self.steps_taken += 1;
        debug!(
            step = self.steps_taken,
            done = output.done,
            failures = self.consecutive_failures,
            "Step recorded"
        );

        // The breaker trips exactly when the counter reaches the limit.
        // The tripping step is already recorded above, so the journal is
        // complete for post-mortem analysis.
        if self.consecutive_failures >= self.env_config.max_consecutive_timeouts {
            self.phase = StepPhase::Failed;
            return Err(RunError::ConsecutiveFailures {
                consecutive: self.consecutive_failures,
                limit: self.env_config.max_consecutive_timeouts,
                steps: self.steps_taken,
                elapsed_secs: self.elapsed_secs(),
                last_step: Box::new(output),
            });
        }

        self.phase = if output.done {
            StepPhase::Done
        } else {
            StepPhase::Idle
        };
        Ok(output)
    }

    /// Drive steps until a submission or a fatal error, bounded by the
    /// total-execution deadline.
    ///
    /// Deadline expiry cancels the in-flight step by dropping its future.
    /// Side effects already started on the environment are not rolled
    /// back: execution is at-least-once.
    pub async fn run(&mut self) -> Result<RunResult, RunError> {
        let total = self.env_config.total_execution_timeout;
        let start = Instant::now();
        self.run_started = Some(start);

        info!(
            task = %self.problem_statement,
            total_secs = total.as_secs(),
            "Run starting"
        );

        loop {
            let Some(remaining) = total.checked_sub(start.elapsed()) else {
                self.phase = StepPhase::Failed;
                return Err(RunError::TotalDeadlineExceeded {
                    limit_secs: total.as_secs(),
                    steps: self.steps_taken,
                });
            };

            let output = match timeout(remaining, self.step()).await {
                Ok(step_result) => step_result?,
                Err(_) => {
                    self.phase = StepPhase::Failed;
                    return Err(RunError::TotalDeadlineExceeded {
                        limit_secs: total.as_secs(),
                        steps: self.steps_taken,
                    });
                }
            };

            if output.done {
                let task = self.active_task.take().map(|mut task| {
                    task.completed = true;
                    task.result = output.submission.clone();
                    task
                });
                let elapsed_secs = start.elapsed().as_secs_f64();
                info!(
                    steps = self.steps_taken,
                    elapsed_secs,
                    "Run completed with submission"
                );
                return Ok(RunResult {
                    exit_status: output
                        .exit_status
                        .clone()
                        .unwrap_or_else(|| "submitted".into()),
                    submission: output.submission.clone(),
                    steps: self.steps_taken,
                    elapsed_secs,
                    final_step: output,
                    task,
                });
            }
        }
    }

    /// Extract the submission payload when the action starts with the
    /// submit prefix at a word boundary.
    fn extract_submission(&self, action: &str) -> Option<String> {
        let trimmed = action.trim();
        let rest = trimmed.strip_prefix(&self.config.submit_command)?;
        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let mut payload = rest.trim();
        if let Some(stripped) = payload.strip_suffix(self.patterns.submit_end_marker()) {
            payload = stripped.trim_end();
        }
        Some(payload.to_string())
    }

    fn elapsed_secs(&self) -> f64 {
        self.run_started
            .map(|s| s.elapsed().as_secs_f64())
            .unwrap_or_default()
    }

    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn journal(&self) -> &TrajectoryJournal {
        &self.journal
    }

    pub fn backlog(&self) -> &TaskBacklog {
        &self.backlog
    }

    pub fn steps_taken(&self) -> usize {
        self.steps_taken
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
