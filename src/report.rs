//! Filesystem events and report sinks.
//!
//! Every planned or executed filesystem action produces one event which is
//! forwarded to a sink exactly once. Concrete destinations (console, GUI log
//! pane, log file) live outside the core; the sinks here cover structured
//! logging, in-memory collection, and no-op degradation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kind of filesystem action an event describes.
///
/// `Planned*` kinds are emitted by dry runs, `Executed*` kinds by real runs;
/// the two series describe the same decisions over an identical tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PlannedMove,
    ExecutedMove,
    PlannedDelete,
    ExecutedDelete,
    PlannedCreate,
    ExecutedCreate,
    Warning,
    Error,
}

impl EventKind {
    /// Whether this kind describes a move, planned or executed.
    pub fn is_move(self) -> bool {
        matches!(self, EventKind::PlannedMove | EventKind::ExecutedMove)
    }
}

/// One planned or executed filesystem action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSystemEvent {
    pub kind: EventKind,
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub reason: String,
}

impl FileSystemEvent {
    /// Move event, planned or executed depending on `dry_run`.
    pub fn moved(
        dry_run: bool,
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind: if dry_run {
                EventKind::PlannedMove
            } else {
                EventKind::ExecutedMove
            },
            source: source.into(),
            destination: Some(destination.into()),
            reason: reason.into(),
        }
    }

    /// Delete event, planned or executed depending on `dry_run`.
    pub fn deleted(dry_run: bool, source: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            kind: if dry_run {
                EventKind::PlannedDelete
            } else {
                EventKind::ExecutedDelete
            },
            source: source.into(),
            destination: None,
            reason: reason.into(),
        }
    }

    /// Directory creation event, planned or executed depending on `dry_run`.
    pub fn created(dry_run: bool, path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            kind: if dry_run {
                EventKind::PlannedCreate
            } else {
                EventKind::ExecutedCreate
            },
            source: path.into(),
            destination: None,
            reason: reason.into(),
        }
    }

    pub fn warning(source: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Warning,
            source: source.into(),
            destination: None,
            reason: reason.into(),
        }
    }

    pub fn error(source: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Error,
            source: source.into(),
            destination: None,
            reason: reason.into(),
        }
    }

    /// Get a human-readable description of this event.
    pub fn description(&self) -> String {
        match (&self.kind, &self.destination) {
            (EventKind::PlannedMove, Some(dest)) => {
                format!("[DRY RUN] Move {} -> {}", self.source.display(), dest.display())
            }
            (EventKind::ExecutedMove, Some(dest)) => {
                format!("Move {} -> {}", self.source.display(), dest.display())
            }
            (EventKind::PlannedDelete, _) => {
                format!("[DRY RUN] Delete {}", self.source.display())
            }
            (EventKind::ExecutedDelete, _) => format!("Delete {}", self.source.display()),
            (EventKind::PlannedCreate, _) => {
                format!("[DRY RUN] Create {}", self.source.display())
            }
            (EventKind::ExecutedCreate, _) => format!("Create {}", self.source.display()),
            (EventKind::Warning, _) => format!("Warning: {} ({})", self.reason, self.source.display()),
            (EventKind::Error, _) => format!("Error: {} ({})", self.reason, self.source.display()),
            (kind, None) => format!("{:?}: {}", kind, self.source.display()),
        }
    }
}

/// One per-item failure, as surfaced in the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub path: String,
    pub reason: String,
}

/// Receives one event per planned or executed filesystem action.
///
/// `emit` is infallible by signature: a broken sink must degrade to a no-op
/// rather than abort the pass, and implementations must not panic.
pub trait ReportSink {
    fn emit(&mut self, event: FileSystemEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn emit(&mut self, _event: FileSystemEvent) {}
}

/// Forwards events to `tracing` at a level matching their kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn emit(&mut self, event: FileSystemEvent) {
        match event.kind {
            EventKind::Error => {
                tracing::error!(source = %event.source.display(), "{}", event.description())
            }
            EventKind::Warning => {
                tracing::warn!(source = %event.source.display(), "{}", event.description())
            }
            _ => tracing::info!("{}", event.description()),
        }
    }
}

/// Collects events in memory, for previews and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub events: Vec<FileSystemEvent>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The (source, destination) pairs of all move events, in emission order.
    pub fn move_pairs(&self) -> Vec<(PathBuf, PathBuf)> {
        self.events
            .iter()
            .filter(|e| e.kind.is_move())
            .filter_map(|e| e.destination.as_ref().map(|d| (e.source.clone(), d.clone())))
            .collect()
    }

    /// Events of a single kind, in emission order.
    pub fn of_kind(&self, kind: EventKind) -> Vec<&FileSystemEvent> {
        self.events.iter().filter(|e| e.kind == kind).collect()
    }
}

impl ReportSink for MemorySink {
    fn emit(&mut self, event: FileSystemEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_event_kind_follows_dry_run() {
        let planned = FileSystemEvent::moved(true, "/a", "/b", "test");
        let executed = FileSystemEvent::moved(false, "/a", "/b", "test");

        assert_eq!(planned.kind, EventKind::PlannedMove);
        assert_eq!(executed.kind, EventKind::ExecutedMove);
        assert!(planned.kind.is_move());
        assert!(executed.kind.is_move());
    }

    #[test]
    fn test_memory_sink_collects_move_pairs() {
        let mut sink = MemorySink::new();
        sink.emit(FileSystemEvent::moved(false, "/a", "/b", "test"));
        sink.emit(FileSystemEvent::warning("/a", "something odd"));
        sink.emit(FileSystemEvent::moved(false, "/c", "/d", "test"));

        let pairs = sink.move_pairs();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], (PathBuf::from("/a"), PathBuf::from("/b")));
        assert_eq!(pairs[1], (PathBuf::from("/c"), PathBuf::from("/d")));
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let event = FileSystemEvent::moved(false, "/a", "/b", "test");
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains("\"kind\":\"executed_move\""));
        assert!(json.contains("\"destination\""));
    }

    #[test]
    fn test_description_marks_dry_run() {
        let planned = FileSystemEvent::deleted(true, "/a", "cleanup");
        assert!(planned.description().starts_with("[DRY RUN]"));

        let executed = FileSystemEvent::deleted(false, "/a", "cleanup");
        assert!(!executed.description().starts_with("[DRY RUN]"));
    }
}
