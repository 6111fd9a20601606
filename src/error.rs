//! Error taxonomy for the reorganization core.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the reorganization core.
///
/// Only `NotFound` is fatal: it aborts a run before any filesystem mutation.
/// The per-item variants are converted to `Error` events, collected into the
/// run report, and never stop sibling processing.
#[derive(Debug, Error)]
pub enum ReorganizeError {
    /// Source root is missing or not a directory
    #[error("source root does not exist or is not a directory: {path}")]
    NotFound { path: PathBuf },

    /// Disambiguation could not produce a free name within the probe budget
    #[error("no free name for {path} after {attempts} attempts")]
    ConflictResolutionExhausted { path: PathBuf, attempts: usize },

    /// A move failed even after the copy/merge fallback
    #[error("failed to move {source_path} -> {destination}: {reason}")]
    MoveFailed {
        source_path: PathBuf,
        destination: PathBuf,
        reason: String,
    },

    /// Underlying filesystem error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
