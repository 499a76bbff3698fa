//! Trajectory journal — the durable, replayable record of every step taken.
//!
//! Each completed step is folded into a [`TrajectoryStep`] and appended to
//! the [`TrajectoryJournal`]. Persisting rewrites the whole document, so
//! every flush on disk is independently valid and loadable (crash
//! consistency bought at O(n²) bytes written across an n-step run).

pub mod journal;
pub mod step;

pub use journal::{RunInfo, TrajectoryJournal};
pub use step::TrajectoryStep;

use std::path::PathBuf;

use thiserror::Error;

/// Errors from journal persistence and replay.
#[derive(Debug, Error)]
pub enum TrajectoryError {
    #[error("failed to access journal {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed journal {path}: {detail}")]
    Malformed { path: PathBuf, detail: String },

    #[error("failed to serialize journal: {0}")]
    Serialization(#[from] serde_json::Error),
}
