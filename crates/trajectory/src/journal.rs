//! Journal persistence — one complete document per run, rewritten in full.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{TrajectoryError, TrajectoryStep};

/// Run metadata stored in the journal head.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    /// Unique run ID
    pub run_id: String,

    /// The problem statement or root task description
    #[serde(default)]
    pub task: String,

    /// Free-form host annotations (model name, environment, tags)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RunInfo {
    /// Create run metadata with a fresh run ID.
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            task: task.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// The on-disk shape: always a complete, self-contained document.
#[derive(Debug, Serialize, Deserialize)]
struct TrajectoryDocument {
    info: RunInfo,
    trajectory: Vec<TrajectoryStep>,
    timestamp: chrono::DateTime<Utc>,
}

/// The append-only journal for one run.
///
/// `save` rewrites the whole document; nothing is ever appended in place,
/// so a crash mid-write can at worst lose the latest rewrite, never
/// produce a partial diff.
#[derive(Debug)]
pub struct TrajectoryJournal {
    info: RunInfo,
    steps: Vec<TrajectoryStep>,
    path: Option<PathBuf>,
}

impl TrajectoryJournal {
    /// Create an in-memory journal (persisting is a no-op).
    pub fn new(info: RunInfo) -> Self {
        Self {
            info,
            steps: Vec::new(),
            path: None,
        }
    }

    /// Create a journal persisted to the given path on every save.
    pub fn with_path(info: RunInfo, path: impl Into<PathBuf>) -> Self {
        Self {
            info,
            steps: Vec::new(),
            path: Some(path.into()),
        }
    }

    /// Append a completed step. Called once per step; steps are never
    /// reordered or rewritten afterwards.
    pub fn append(&mut self, step: TrajectoryStep) {
        self.steps.push(step);
    }

    /// The recorded steps, in step order.
    pub fn steps(&self) -> &[TrajectoryStep] {
        &self.steps
    }

    pub fn info(&self) -> &RunInfo {
        &self.info
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Persist the journal as one complete document, fully overwriting any
    /// prior contents. A no-op for in-memory journals.
    pub fn save(&self) -> Result<(), TrajectoryError> {
        let Some(path) = &self.path else {
            debug!("Journal has no path configured, skipping persist");
            return Ok(());
        };

        let document = TrajectoryDocument {
            info: self.info.clone(),
            trajectory: self.steps.clone(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&document)?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| TrajectoryError::Io {
                path: path.clone(),
                source: e,
            })?;
        }

        std::fs::write(path, json).map_err(|e| TrajectoryError::Io {
            path: path.clone(),
            source: e,
        })?;

        debug!(path = %path.display(), steps = self.steps.len(), "Journal persisted");
        Ok(())
    }

    /// Load a journal document for offline replay or analysis.
    ///
    /// A malformed or truncated file fails with a descriptive error and
    /// never partially populates state.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TrajectoryError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| TrajectoryError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let document: TrajectoryDocument =
            serde_json::from_str(&content).map_err(|e| TrajectoryError::Malformed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;

        Ok(Self {
            info: document.info,
            steps: document.trajectory,
            path: Some(path.to_path_buf()),
        })
    }
}
