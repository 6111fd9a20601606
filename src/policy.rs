//! Merge policy flags, resolved once per run.

/// Configuration for a reorganization pass.
///
/// Immutable once a run starts; every flag defaults to off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergePolicy {
    /// Plan every action without touching the filesystem.
    pub dry_run: bool,
    /// Flatten slot contents directly into the output slot instead of
    /// nesting them under a per-parent subdirectory.
    pub direct_merge: bool,
    /// Delete original parent directories whose slots merged without errors.
    pub clean_original: bool,
}

impl MergePolicy {
    /// Create a policy with all flags off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable or disable direct merging.
    pub fn with_direct_merge(mut self, direct_merge: bool) -> Self {
        self.direct_merge = direct_merge;
        self
    }

    /// Enable or disable cleanup of original parent directories.
    pub fn with_clean_original(mut self, clean_original: bool) -> Self {
        self.clean_original = clean_original;
        self
    }
}
