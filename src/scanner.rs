//! Slot discovery.
//!
//! Walks the immediate children of a source root and records which of them
//! contain any of the recognized slot directories. Read-only; the scan is
//! the precondition check for everything that follows.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ReorganizeError;

/// Ordered, fixed set of directory names recognized as slots.
///
/// Enumeration order is the declaration order; it drives output skeleton
/// creation and the per-parent ordering of scan results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSet {
    names: Vec<String>,
}

impl Default for SlotSet {
    /// The stock generation layout: `run0`..`run4`.
    fn default() -> Self {
        Self::runs(5)
    }
}

impl SlotSet {
    /// Slots named `run0`..`run{count-1}`.
    pub fn runs(count: usize) -> Self {
        Self {
            names: (0..count).map(|i| format!("run{i}")).collect(),
        }
    }

    /// Slots with explicit names, in the given order.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Slot names in enumeration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Mapping from parent directory name to the slot paths found under it.
///
/// Sorted by parent name so real and dry runs visit parents in the same
/// order. Slot paths per parent preserve slot enumeration order.
pub type ScanResult = BTreeMap<String, Vec<PathBuf>>;

/// Read-only scanner for the source root's immediate children.
#[derive(Debug, Clone)]
pub struct PathScanner {
    slots: SlotSet,
    /// Excluded from scanning: the output root, when it lives inside the
    /// source root from a previous run.
    exclude: Option<PathBuf>,
}

impl PathScanner {
    pub fn new(slots: SlotSet) -> Self {
        Self {
            slots,
            exclude: None,
        }
    }

    /// Exclude a child path (typically the output root) from the scan.
    pub fn with_exclude(mut self, path: impl Into<PathBuf>) -> Self {
        self.exclude = Some(path.into());
        self
    }

    /// Scan `source_root` for parent directories containing slot directories.
    ///
    /// Children with no matching slots are omitted from the result, as are
    /// plain files. Fails with `NotFound` if the root is missing or not a
    /// directory; the scan itself never mutates anything.
    pub fn scan(&self, source_root: &Path) -> Result<ScanResult, ReorganizeError> {
        if !source_root.is_dir() {
            return Err(ReorganizeError::NotFound {
                path: source_root.to_path_buf(),
            });
        }

        let mut found = ScanResult::new();

        for entry in fs::read_dir(source_root)? {
            let entry = entry?;
            let path = entry.path();

            if !path.is_dir() {
                continue;
            }
            if self.exclude.as_deref() == Some(path.as_path()) {
                continue;
            }

            let slot_paths: Vec<PathBuf> = self
                .slots
                .names()
                .iter()
                .map(|slot| path.join(slot))
                .filter(|p| p.is_dir())
                .collect();

            if !slot_paths.is_empty() {
                let name = entry.file_name().to_string_lossy().to_string();
                tracing::debug!(
                    parent = %name,
                    slots = slot_paths.len(),
                    "Found slot directories"
                );
                found.insert(name, slot_paths);
            }
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn create_source_tree() -> TempDir {
        let dir = TempDir::new().unwrap();

        // projA has run0 and run2, projB has run1, plain has no slots
        fs::create_dir_all(dir.path().join("projA/run0")).unwrap();
        fs::create_dir_all(dir.path().join("projA/run2")).unwrap();
        fs::create_dir_all(dir.path().join("projB/run1")).unwrap();
        fs::create_dir_all(dir.path().join("plain/data")).unwrap();

        File::create(dir.path().join("loose.txt")).unwrap();

        dir
    }

    #[test]
    fn test_scan_finds_slot_parents() {
        let dir = create_source_tree();
        let scanner = PathScanner::new(SlotSet::default());

        let result = scanner.scan(dir.path()).unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.contains_key("projA"));
        assert!(result.contains_key("projB"));
        assert!(!result.contains_key("plain"));
    }

    #[test]
    fn test_scan_preserves_slot_order() {
        let dir = create_source_tree();
        let scanner = PathScanner::new(SlotSet::default());

        let result = scanner.scan(dir.path()).unwrap();
        let slots = &result["projA"];

        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0], dir.path().join("projA/run0"));
        assert_eq!(slots[1], dir.path().join("projA/run2"));
    }

    #[test]
    fn test_scan_ignores_slot_named_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("projC")).unwrap();
        // run0 exists but is a file, not a directory
        File::create(dir.path().join("projC/run0")).unwrap();

        let scanner = PathScanner::new(SlotSet::default());
        let result = scanner.scan(dir.path()).unwrap();

        assert!(result.is_empty());
    }

    #[test]
    fn test_scan_excludes_output_root() {
        let dir = create_source_tree();
        // A previous run left an output tree that itself looks like a parent
        fs::create_dir_all(dir.path().join("reorganized/run0")).unwrap();

        let scanner = PathScanner::new(SlotSet::default())
            .with_exclude(dir.path().join("reorganized"));
        let result = scanner.scan(dir.path()).unwrap();

        assert!(!result.contains_key("reorganized"));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_scan_missing_root_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");

        let scanner = PathScanner::new(SlotSet::default());
        let err = scanner.scan(&missing).unwrap_err();

        assert!(matches!(err, ReorganizeError::NotFound { .. }));
    }

    #[test]
    fn test_slot_set_runs_naming() {
        let slots = SlotSet::runs(3);
        assert_eq!(slots.names(), &["run0", "run1", "run2"]);
        assert!(slots.contains("run1"));
        assert!(!slots.contains("run3"));
    }
}
