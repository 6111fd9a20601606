//! Recursive tree merging with move semantics.
//!
//! Moves every entry of a source subtree into a destination subtree,
//! recursing into directories that already exist on the destination side
//! and renaming colliding files through the conflict resolver. A failed
//! whole-subtree move falls back to the same merge-then-delete path,
//! converting a failed atomic rename into a sequence of smaller safe moves.
//! Per-item failures are recorded and never disturb already-moved siblings.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::conflict::ConflictResolver;
use crate::error::ReorganizeError;
use crate::report::{ErrorRecord, FileSystemEvent, ReportSink};

/// Terminal record of one merge invocation.
#[derive(Debug, Clone, Copy)]
pub struct MergeOutcome {
    /// Number of move operations performed. A whole-subtree move counts as
    /// one item.
    pub items_moved: usize,
    /// Number of colliding entries placed under a disambiguated name.
    pub conflicts_resolved: usize,
    /// True only if every entry of the source was relocated or merged. The
    /// caller must not delete the source directory unless this holds.
    pub fully_consumed: bool,
}

impl MergeOutcome {
    pub fn new() -> Self {
        Self {
            items_moved: 0,
            conflicts_resolved: 0,
            fully_consumed: true,
        }
    }
}

impl Default for MergeOutcome {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursive merger; the only component that mutates the filesystem.
///
/// One merger lives for a whole pass so its resolver's claimed names carry
/// across every (parent, slot) merge. In dry-run mode the same traversal
/// runs, but each mutation becomes a `Planned*` event and planned
/// destinations are claimed so later decisions see them as occupied.
pub struct TreeMerger {
    resolver: ConflictResolver,
    dry_run: bool,
    errors: Vec<ErrorRecord>,
}

impl TreeMerger {
    pub fn new(dry_run: bool) -> Self {
        Self {
            resolver: ConflictResolver::new(),
            dry_run,
            errors: Vec::new(),
        }
    }

    /// Use a preconfigured resolver (e.g. a different fallback strategy).
    pub fn with_resolver(dry_run: bool, resolver: ConflictResolver) -> Self {
        Self {
            resolver,
            dry_run,
            errors: Vec::new(),
        }
    }

    /// Take the per-item failures recorded since the last drain.
    pub fn drain_errors(&mut self) -> Vec<ErrorRecord> {
        std::mem::take(&mut self.errors)
    }

    /// Merge the contents of `src` into `dest`.
    ///
    /// Entries are processed in sorted name order so traversal is
    /// deterministic. `disambiguator` names the originating parent and is
    /// threaded unchanged through every recursive call; it never gets
    /// re-derived from path structure.
    pub fn merge(
        &mut self,
        src: &Path,
        dest: &Path,
        disambiguator: &str,
        sink: &mut dyn ReportSink,
    ) -> Result<MergeOutcome, ReorganizeError> {
        if !src.is_dir() {
            return Err(ReorganizeError::NotFound {
                path: src.to_path_buf(),
            });
        }

        let mut entries: Vec<PathBuf> = fs::read_dir(src)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|e| e.path())
            .collect();
        entries.sort();

        let mut outcome = MergeOutcome::new();

        for entry in entries {
            let name = match entry.file_name() {
                Some(n) => n.to_string_lossy().to_string(),
                None => continue,
            };

            if entry.is_dir() {
                self.merge_dir_entry(&entry, &dest.join(&name), disambiguator, sink, &mut outcome);
            } else {
                self.merge_file_entry(&entry, dest, &name, disambiguator, sink, &mut outcome);
            }
        }

        Ok(outcome)
    }

    /// Merge `src` into `dest`, then delete the emptied source directory if
    /// the merge fully consumed it.
    pub fn merge_consuming(
        &mut self,
        src: &Path,
        dest: &Path,
        disambiguator: &str,
        sink: &mut dyn ReportSink,
    ) -> Result<MergeOutcome, ReorganizeError> {
        let mut outcome = self.merge(src, dest, disambiguator, sink)?;
        if outcome.fully_consumed {
            self.remove_emptied_dir(src, sink, &mut outcome);
        }
        Ok(outcome)
    }

    fn merge_dir_entry(
        &mut self,
        entry: &Path,
        target: &Path,
        disambiguator: &str,
        sink: &mut dyn ReportSink,
        outcome: &mut MergeOutcome,
    ) {
        if self.resolver.is_occupied(target) {
            self.merge_and_consume(entry, target, disambiguator, sink, outcome);
            return;
        }

        // Destination is free: relocate the whole subtree in one rename
        match self.move_subtree(entry, target, sink) {
            Ok(()) => outcome.items_moved += 1,
            Err(move_err) => {
                // Retry once through the merge path, which breaks the move
                // into per-entry operations and survives cross-device links
                tracing::warn!(
                    source = %entry.display(),
                    destination = %target.display(),
                    error = %move_err,
                    "Move failed, falling back to merge"
                );
                sink.emit(FileSystemEvent::warning(
                    entry,
                    format!("move failed, merging instead: {move_err}"),
                ));
                self.merge_and_consume(entry, target, disambiguator, sink, outcome);
            }
        }
    }

    fn merge_file_entry(
        &mut self,
        entry: &Path,
        dest_dir: &Path,
        name: &str,
        disambiguator: &str,
        sink: &mut dyn ReportSink,
        outcome: &mut MergeOutcome,
    ) {
        let resolved = match self.resolver.resolve(dest_dir, name, Some(disambiguator)) {
            Ok(r) => r,
            Err(e) => {
                self.record_error(entry, e.to_string(), sink, outcome);
                return;
            }
        };
        let conflicted = resolved != name;
        let target = dest_dir.join(&resolved);

        let reason = if conflicted {
            "move file under conflict-resolved name"
        } else {
            "move file"
        };

        match self.move_file(entry, &target, sink, reason) {
            Ok(()) => {
                outcome.items_moved += 1;
                if conflicted {
                    outcome.conflicts_resolved += 1;
                }
            }
            Err(e) => self.record_error(entry, e.to_string(), sink, outcome),
        }
    }

    /// Merge `src` into an occupied (or just-planned) `target` directory,
    /// deleting the emptied source on full consumption.
    fn merge_and_consume(
        &mut self,
        src: &Path,
        target: &Path,
        disambiguator: &str,
        sink: &mut dyn ReportSink,
        outcome: &mut MergeOutcome,
    ) {
        if !self.dry_run && !target.exists() {
            if let Err(e) = fs::create_dir_all(target) {
                self.record_error(src, format!("failed to create {}: {e}", target.display()), sink, outcome);
                return;
            }
        }
        self.resolver.claim(target.to_path_buf());

        match self.merge(src, target, disambiguator, sink) {
            Ok(sub) => {
                outcome.items_moved += sub.items_moved;
                outcome.conflicts_resolved += sub.conflicts_resolved;
                if sub.fully_consumed {
                    self.remove_emptied_dir(src, sink, outcome);
                } else {
                    outcome.fully_consumed = false;
                }
            }
            Err(e) => self.record_error(src, e.to_string(), sink, outcome),
        }
    }

    fn move_subtree(
        &mut self,
        src: &Path,
        dest: &Path,
        sink: &mut dyn ReportSink,
    ) -> Result<(), std::io::Error> {
        if self.dry_run {
            self.claim_moved_tree(src, dest);
            sink.emit(FileSystemEvent::moved(true, src, dest, "move subtree"));
            return Ok(());
        }

        fs::rename(src, dest)?;
        self.resolver.claim(dest.to_path_buf());
        sink.emit(FileSystemEvent::moved(false, src, dest, "move subtree"));
        Ok(())
    }

    fn move_file(
        &mut self,
        src: &Path,
        dest: &Path,
        sink: &mut dyn ReportSink,
        reason: &str,
    ) -> Result<(), ReorganizeError> {
        if self.dry_run {
            self.resolver.claim(dest.to_path_buf());
            sink.emit(FileSystemEvent::moved(true, src, dest, reason));
            return Ok(());
        }

        // Try rename first (same filesystem), fall back to copy+delete
        if let Err(rename_err) = fs::rename(src, dest) {
            let fallback = fs::copy(src, dest).and_then(|_| fs::remove_file(src));
            if let Err(copy_err) = fallback {
                return Err(ReorganizeError::MoveFailed {
                    source_path: src.to_path_buf(),
                    destination: dest.to_path_buf(),
                    reason: format!("rename: {rename_err}; copy fallback: {copy_err}"),
                });
            }
        }

        self.resolver.claim(dest.to_path_buf());
        sink.emit(FileSystemEvent::moved(false, src, dest, reason));
        Ok(())
    }

    fn remove_emptied_dir(
        &mut self,
        dir: &Path,
        sink: &mut dyn ReportSink,
        outcome: &mut MergeOutcome,
    ) {
        if self.dry_run {
            sink.emit(FileSystemEvent::deleted(true, dir, "remove emptied source directory"));
            return;
        }

        match fs::remove_dir(dir) {
            Ok(()) => {
                sink.emit(FileSystemEvent::deleted(false, dir, "remove emptied source directory"))
            }
            Err(e) => self.record_error(
                dir,
                format!("failed to remove emptied directory: {e}"),
                sink,
                outcome,
            ),
        }
    }

    /// Claim the destination paths a real subtree move would create, so
    /// later dry-run decisions see them as occupied.
    fn claim_moved_tree(&mut self, src: &Path, dest: &Path) {
        self.resolver.claim(dest.to_path_buf());
        for entry in WalkDir::new(src).min_depth(1).into_iter().filter_map(Result::ok) {
            if let Ok(rel) = entry.path().strip_prefix(src) {
                self.resolver.claim(dest.join(rel));
            }
        }
    }

    fn record_error(
        &mut self,
        path: &Path,
        reason: String,
        sink: &mut dyn ReportSink,
        outcome: &mut MergeOutcome,
    ) {
        tracing::error!(path = %path.display(), error = %reason, "Merge item failed");
        sink.emit(FileSystemEvent::error(path, reason.clone()));
        self.errors.push(ErrorRecord {
            path: path.to_string_lossy().to_string(),
            reason,
        });
        outcome.fully_consumed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{EventKind, MemorySink, NullSink};
    use tempfile::TempDir;

    fn write_file(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_merge_moves_files_and_subtrees() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        write_file(&src.join("a.txt"), "a");
        write_file(&src.join("sub/b.txt"), "b");
        fs::create_dir(&dest).unwrap();

        let mut merger = TreeMerger::new(false);
        let outcome = merger.merge(&src, &dest, "p1", &mut NullSink).unwrap();

        assert_eq!(outcome.items_moved, 2); // one file, one subtree
        assert_eq!(outcome.conflicts_resolved, 0);
        assert!(outcome.fully_consumed);
        assert_eq!(fs::read_to_string(dest.join("a.txt")).unwrap(), "a");
        assert_eq!(fs::read_to_string(dest.join("sub/b.txt")).unwrap(), "b");
        assert!(!src.join("a.txt").exists());
        assert!(!src.join("sub").exists());
    }

    #[test]
    fn test_merge_recurses_into_existing_dir_and_deletes_emptied_source() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        write_file(&src.join("sub/new.txt"), "new");
        write_file(&dest.join("sub/old.txt"), "old");

        let mut merger = TreeMerger::new(false);
        let outcome = merger.merge(&src, &dest, "p1", &mut NullSink).unwrap();

        assert!(outcome.fully_consumed);
        assert_eq!(fs::read_to_string(dest.join("sub/new.txt")).unwrap(), "new");
        assert_eq!(fs::read_to_string(dest.join("sub/old.txt")).unwrap(), "old");
        assert!(!src.join("sub").exists());
    }

    #[test]
    fn test_merge_resolves_file_conflict_without_overwriting() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        write_file(&src.join("a.txt"), "incoming");
        write_file(&dest.join("a.txt"), "original");

        let mut merger = TreeMerger::new(false);
        let outcome = merger.merge(&src, &dest, "p1", &mut NullSink).unwrap();

        assert_eq!(outcome.conflicts_resolved, 1);
        assert_eq!(fs::read_to_string(dest.join("a.txt")).unwrap(), "original");
        assert_eq!(fs::read_to_string(dest.join("p1_a.txt")).unwrap(), "incoming");
    }

    #[test]
    fn test_partial_failure_keeps_siblings_moving() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        for name in ["a.txt", "b.txt", "c.txt", "d.txt"] {
            write_file(&src.join(name), name);
        }
        // "bad" is a directory on the source side but a file on the
        // destination side; its children cannot be placed
        write_file(&src.join("bad/child.txt"), "child");
        write_file(&dest.join("bad"), "blocking file");

        let mut merger = TreeMerger::new(false);
        let outcome = merger.merge(&src, &dest, "p1", &mut NullSink).unwrap();

        assert_eq!(outcome.items_moved, 4);
        assert!(!outcome.fully_consumed);
        for name in ["a.txt", "b.txt", "c.txt", "d.txt"] {
            assert!(dest.join(name).exists());
        }
        // Failed item left in place, nothing lost
        assert!(src.join("bad/child.txt").exists());
        assert!(!merger.drain_errors().is_empty());
    }

    #[test]
    fn test_dry_run_plans_without_mutating() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        write_file(&src.join("a.txt"), "a");
        write_file(&src.join("sub/b.txt"), "b");
        fs::create_dir(&dest).unwrap();

        let mut sink = MemorySink::new();
        let mut merger = TreeMerger::new(true);
        let outcome = merger.merge(&src, &dest, "p1", &mut sink).unwrap();

        assert_eq!(outcome.items_moved, 2);
        assert!(src.join("a.txt").exists());
        assert!(src.join("sub/b.txt").exists());
        assert!(!dest.join("a.txt").exists());
        assert_eq!(sink.of_kind(EventKind::PlannedMove).len(), 2);
        assert!(sink.of_kind(EventKind::ExecutedMove).is_empty());
    }

    #[test]
    fn test_dry_run_takes_real_conflict_decisions() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        write_file(&src.join("a.txt"), "incoming");
        write_file(&dest.join("a.txt"), "original");

        let mut sink = MemorySink::new();
        let mut merger = TreeMerger::new(true);
        let outcome = merger.merge(&src, &dest, "p1", &mut sink).unwrap();

        assert_eq!(outcome.conflicts_resolved, 1);
        let pairs = sink.move_pairs();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].1, dest.join("p1_a.txt"));
        // Nothing touched
        assert_eq!(fs::read_to_string(dest.join("a.txt")).unwrap(), "original");
        assert!(src.join("a.txt").exists());
    }

    #[test]
    fn test_merge_consuming_removes_source_dir() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        write_file(&src.join("a.txt"), "a");
        fs::create_dir(&dest).unwrap();

        let mut merger = TreeMerger::new(false);
        let outcome = merger
            .merge_consuming(&src, &dest, "p1", &mut NullSink)
            .unwrap();

        assert!(outcome.fully_consumed);
        assert!(!src.exists());
        assert!(dest.join("a.txt").exists());
    }

    #[test]
    fn test_merge_missing_source_errors() {
        let dir = TempDir::new().unwrap();
        let mut merger = TreeMerger::new(false);

        let err = merger
            .merge(&dir.path().join("nope"), dir.path(), "p1", &mut NullSink)
            .unwrap_err();

        assert!(matches!(err, ReorganizeError::NotFound { .. }));
    }
}
