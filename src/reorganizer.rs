//! Run orchestration.
//!
//! Drives scan -> skeleton -> merge -> cleanup as an explicit phase machine,
//! emitting one event per filesystem action and returning an aggregate
//! report. A dry run walks the identical sequence with `Planned*` events,
//! sharing the scanner and conflict-naming logic so the preview matches
//! what a real run would do.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ReorganizeError;
use crate::merge::TreeMerger;
use crate::policy::MergePolicy;
use crate::report::{ErrorRecord, FileSystemEvent, ReportSink};
use crate::scanner::{PathScanner, ScanResult, SlotSet};

/// Phase of a reorganization pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Scanned,
    SkeletonCreated,
    Merging,
    CleaningUp,
    Done,
    Aborted,
}

/// Aggregate outcome of one reorganization run.
///
/// The `errors` list is the authoritative failure record: a run that passed
/// its precondition check returns `Ok` even when `errors` is non-empty
/// (success with warnings).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorganizeReport {
    pub run_id: Uuid,
    pub dry_run: bool,
    pub parents_processed: usize,
    pub items_moved: usize,
    pub conflicts_resolved: usize,
    pub errors: Vec<ErrorRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ReorganizeReport {
    fn new(dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            dry_run,
            parents_processed: 0,
            items_moved: 0,
            conflicts_resolved: 0,
            errors: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    /// Whether the run finished without any per-item errors.
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Serialize the report for log panes and other collaborators.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Orchestrates one consolidation pass over a source root.
pub struct Reorganizer {
    source_root: PathBuf,
    output_root: PathBuf,
    slots: SlotSet,
    policy: MergePolicy,
    phase: Phase,
}

impl Reorganizer {
    /// Create a reorganizer with the output root defaulting to
    /// `source_root/reorganized`.
    pub fn new(source_root: impl Into<PathBuf>, policy: MergePolicy) -> Self {
        let source_root = source_root.into();
        let output_root = source_root.join("reorganized");
        Self {
            source_root,
            output_root,
            slots: SlotSet::default(),
            policy,
            phase: Phase::Idle,
        }
    }

    pub fn with_output_root(mut self, output_root: impl Into<PathBuf>) -> Self {
        self.output_root = output_root.into();
        self
    }

    pub fn with_slots(mut self, slots: SlotSet) -> Self {
        self.slots = slots;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Execute the pass, emitting one event per action to `sink`.
    ///
    /// Fatal precondition failures return `Err` before any mutation; every
    /// per-item failure is converted to an `Error` event and collected into
    /// the report instead.
    pub fn run(&mut self, sink: &mut dyn ReportSink) -> Result<ReorganizeReport, ReorganizeError> {
        let mut report = ReorganizeReport::new(self.policy.dry_run);
        tracing::info!(
            run_id = %report.run_id,
            source = %self.source_root.display(),
            output = %self.output_root.display(),
            dry_run = self.policy.dry_run,
            direct_merge = self.policy.direct_merge,
            "Starting reorganization"
        );

        let scanner =
            PathScanner::new(self.slots.clone()).with_exclude(self.output_root.clone());
        let scan = match scanner.scan(&self.source_root) {
            Ok(scan) => scan,
            Err(e) => {
                self.set_phase(Phase::Aborted);
                return Err(e);
            }
        };
        self.set_phase(Phase::Scanned);
        report.parents_processed = scan.len();

        if scan.is_empty() {
            tracing::warn!("No parent directories with slot folders found, nothing to do");
            self.set_phase(Phase::Done);
            report.finished_at = Utc::now();
            return Ok(report);
        }

        // Directories only planned so far; dry runs consult this where real
        // runs consult the filesystem
        let mut planned_dirs: HashSet<PathBuf> = HashSet::new();

        if let Err(e) = self.create_skeleton(sink, &mut planned_dirs) {
            self.set_phase(Phase::Aborted);
            return Err(e);
        }
        self.set_phase(Phase::SkeletonCreated);

        self.set_phase(Phase::Merging);
        let mut merger = TreeMerger::new(self.policy.dry_run);
        let mut failed_parents: HashSet<String> = HashSet::new();

        for (parent, slot_paths) in &scan {
            tracing::info!(parent = %parent, slots = slot_paths.len(), "Merging slot directories");

            for slot_path in slot_paths {
                let slot_name = match slot_path.file_name() {
                    Some(n) => n.to_string_lossy().to_string(),
                    None => continue,
                };
                let dest = if self.policy.direct_merge {
                    self.output_root.join(&slot_name)
                } else {
                    self.output_root.join(&slot_name).join(parent)
                };

                if let Err(e) = self.ensure_dir(&dest, sink, &mut planned_dirs) {
                    report.errors.push(ErrorRecord {
                        path: dest.to_string_lossy().to_string(),
                        reason: e.to_string(),
                    });
                    sink.emit(FileSystemEvent::error(&dest, e.to_string()));
                    failed_parents.insert(parent.clone());
                    continue;
                }

                match merger.merge_consuming(slot_path, &dest, parent, sink) {
                    Ok(outcome) => {
                        report.items_moved += outcome.items_moved;
                        report.conflicts_resolved += outcome.conflicts_resolved;
                        if !outcome.fully_consumed {
                            failed_parents.insert(parent.clone());
                        }
                    }
                    Err(e) => {
                        sink.emit(FileSystemEvent::error(slot_path, e.to_string()));
                        report.errors.push(ErrorRecord {
                            path: slot_path.to_string_lossy().to_string(),
                            reason: e.to_string(),
                        });
                        failed_parents.insert(parent.clone());
                    }
                }
            }

            let parent_errors = merger.drain_errors();
            if !parent_errors.is_empty() {
                failed_parents.insert(parent.clone());
                report.errors.extend(parent_errors);
            }
        }

        if self.policy.clean_original {
            self.set_phase(Phase::CleaningUp);
            self.clean_original(&scan, &failed_parents, sink, &mut report);
        }

        self.set_phase(Phase::Done);
        report.finished_at = Utc::now();
        tracing::info!(
            parents = report.parents_processed,
            moved = report.items_moved,
            conflicts = report.conflicts_resolved,
            errors = report.errors.len(),
            "Reorganization complete"
        );
        Ok(report)
    }

    /// Ensure `output_root/slot` exists for every slot, in enumeration order.
    fn create_skeleton(
        &self,
        sink: &mut dyn ReportSink,
        planned_dirs: &mut HashSet<PathBuf>,
    ) -> Result<(), ReorganizeError> {
        for slot in self.slots.names() {
            let dir = self.output_root.join(slot);
            if self.policy.dry_run {
                planned_dirs.insert(dir.clone());
            } else {
                fs::create_dir_all(&dir)?;
            }
            sink.emit(FileSystemEvent::created(
                self.policy.dry_run,
                dir,
                "create output slot directory",
            ));
        }
        Ok(())
    }

    /// Ensure a merge destination directory exists (the per-parent nest in
    /// non-direct mode). Slot directories themselves come from the skeleton.
    fn ensure_dir(
        &self,
        dir: &Path,
        sink: &mut dyn ReportSink,
        planned_dirs: &mut HashSet<PathBuf>,
    ) -> Result<(), ReorganizeError> {
        if dir.exists() || planned_dirs.contains(dir) {
            return Ok(());
        }
        if self.policy.dry_run {
            planned_dirs.insert(dir.to_path_buf());
        } else {
            fs::create_dir_all(dir)?;
        }
        sink.emit(FileSystemEvent::created(
            self.policy.dry_run,
            dir,
            "create merge destination",
        ));
        Ok(())
    }

    /// Delete original parent directories whose slots merged without errors.
    /// A parent with any recorded error is kept and reported as a warning.
    fn clean_original(
        &self,
        scan: &ScanResult,
        failed_parents: &HashSet<String>,
        sink: &mut dyn ReportSink,
        report: &mut ReorganizeReport,
    ) {
        for parent in scan.keys() {
            let parent_path = self.source_root.join(parent);

            if failed_parents.contains(parent) {
                tracing::warn!(
                    parent = %parent,
                    "Parent had merge errors, keeping original directory"
                );
                sink.emit(FileSystemEvent::warning(
                    &parent_path,
                    "merge errors recorded, original directory kept",
                ));
                continue;
            }

            if self.policy.dry_run {
                sink.emit(FileSystemEvent::deleted(
                    true,
                    &parent_path,
                    "remove original parent directory",
                ));
                continue;
            }

            match fs::remove_dir_all(&parent_path) {
                Ok(()) => sink.emit(FileSystemEvent::deleted(
                    false,
                    &parent_path,
                    "remove original parent directory",
                )),
                Err(e) => {
                    let reason = format!("failed to remove original directory: {e}");
                    sink.emit(FileSystemEvent::error(&parent_path, reason.clone()));
                    report.errors.push(ErrorRecord {
                        path: parent_path.to_string_lossy().to_string(),
                        reason,
                    });
                }
            }
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "Phase transition");
        self.phase = phase;
    }
}
