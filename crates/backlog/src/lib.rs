//! Task backlog — the priority-ordered queue of sub-goals feeding the engine.
//!
//! Tasks are created by the caller or by the engine decomposing work, and
//! are mutated only through the backlog. All mutation is serialized by a
//! single mutex scoped to one backlog instance; as a leaf component this is
//! the only lock in the core, so no lock-ordering hazards can arise.
//!
//! Ordering is keyed by `(priority descending, insertion sequence
//! ascending)`: higher priority first, first-in-first-out among equal
//! priorities.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strider_core::StateSnapshot;
use tracing::debug;
use uuid::Uuid;

/// A unit of work tracked by the backlog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task ID (unique within one backlog)
    pub id: String,

    /// What needs to be done
    pub description: String,

    /// Scheduling priority (higher is served first)
    pub priority: i32,

    /// When this task was enqueued
    pub created_at: DateTime<Utc>,

    /// Environment state captured when the task was created
    #[serde(default, skip_serializing_if = "StateSnapshot::is_empty")]
    pub state: StateSnapshot,

    /// The task this one was decomposed from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Whether the task has been completed
    #[serde(default)]
    pub completed: bool,

    /// The result recorded at completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// A queued task plus its insertion sequence number.
#[derive(Debug)]
struct QueueEntry {
    seq: u64,
    task: Task,
}

#[derive(Debug, Default)]
struct BacklogInner {
    /// Sorted by (priority desc, seq asc); the head is `entries[0]`.
    entries: Vec<QueueEntry>,
    next_seq: u64,
}

/// The priority-ordered task backlog.
///
/// All operations lock the single internal mutex; none of them block on
/// anything else, so every call returns promptly.
#[derive(Debug, Default)]
pub struct TaskBacklog {
    inner: Mutex<BacklogInner>,
}

impl TaskBacklog {
    /// Create a new empty backlog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a task and return its ID.
    pub fn add_task(
        &self,
        description: impl Into<String>,
        priority: i32,
        state: StateSnapshot,
        parent_id: Option<String>,
    ) -> String {
        let task = Task {
            id: Uuid::new_v4().to_string(),
            description: description.into(),
            priority,
            created_at: Utc::now(),
            state,
            parent_id,
            completed: false,
            result: None,
        };
        let id = task.id.clone();

        let mut inner = self.inner.lock().unwrap();
        let seq = inner.next_seq;
        inner.next_seq += 1;

        // First index with strictly lower priority; inserting there lands
        // after every equal-priority entry, preserving FIFO within a tier.
        let pos = inner
            .entries
            .iter()
            .position(|e| e.task.priority < priority)
            .unwrap_or(inner.entries.len());
        inner.entries.insert(pos, QueueEntry { seq, task });

        debug!(task_id = %id, priority, seq, "Task enqueued");
        id
    }

    /// Remove and return the highest-priority task. Never blocks.
    pub fn get_next_task(&self) -> Option<Task> {
        let mut inner = self.inner.lock().unwrap();
        if inner.entries.is_empty() {
            return None;
        }
        let entry = inner.entries.remove(0);
        debug!(task_id = %entry.task.id, "Task dequeued");
        Some(entry.task)
    }

    /// Mark a task complete and remove it. A no-op if the ID is absent
    /// (e.g. the task was already dequeued and finished).
    pub fn complete_task(&self, id: &str, result: impl Into<String>) -> Option<Task> {
        let mut inner = self.inner.lock().unwrap();
        let pos = inner.entries.iter().position(|e| e.task.id == id)?;
        let mut task = inner.entries.remove(pos).task;
        task.completed = true;
        task.result = Some(result.into());
        debug!(task_id = %task.id, "Task completed");
        Some(task)
    }

    /// Clone of the current head without removing it.
    pub fn peek(&self) -> Option<Task> {
        let inner = self.inner.lock().unwrap();
        inner.entries.first().map(|e| e.task.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
