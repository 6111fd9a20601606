//! Conflict-free destination naming.
//!
//! When a merge wants to place an entry whose name is already taken, the
//! resolver produces a deterministic alternative: the candidate prefixed
//! with the originating parent name, with a numbered series behind it when
//! the prefixed name is taken too. Names handed out during a pass are
//! remembered, so a preview takes the same decisions a real run would.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::ReorganizeError;

/// Maximum numbered probes before a name is declared unresolvable.
const MAX_PROBES: usize = 100;

/// Strategy used when the caller cannot supply a stable disambiguator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fallback {
    /// Process-local monotonically increasing counter. Deterministic.
    #[default]
    Counter,
    /// Coarse unix-seconds timestamp. Best effort only: two resolutions
    /// within the same second fall through to the numbered probe series.
    Timestamp,
}

/// Decides final destination names and never overwrites an existing path.
///
/// A name counts as occupied if it exists on the filesystem or was already
/// handed out by this resolver during the current pass. The claim set covers
/// the re-query requirement when several items land in one destination
/// within a single merge, and stands in for the filesystem during dry runs.
#[derive(Debug, Default)]
pub struct ConflictResolver {
    claimed: HashSet<PathBuf>,
    fallback: Fallback,
    counter: u64,
}

impl ConflictResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different fallback strategy for disambiguator-less resolutions.
    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }

    /// Whether `path` is taken, on disk or by an earlier decision this pass.
    pub fn is_occupied(&self, path: &Path) -> bool {
        self.claimed.contains(path) || path.exists()
    }

    /// Record a destination as taken without resolving it, for moves decided
    /// outside the conflict path.
    pub fn claim(&mut self, path: impl Into<PathBuf>) {
        self.claimed.insert(path.into());
    }

    /// Decide the final name for `candidate` inside `dest_dir`.
    ///
    /// Returns the candidate unchanged when it is free. On collision the
    /// name becomes `{disambiguator}_{candidate}`, then
    /// `{disambiguator}_{n}_{candidate}` for n = 2, 3, ... until a free name
    /// is found or the probe budget is exhausted. The returned name is
    /// recorded as claimed.
    pub fn resolve(
        &mut self,
        dest_dir: &Path,
        candidate: &str,
        disambiguator: Option<&str>,
    ) -> Result<String, ReorganizeError> {
        let direct = dest_dir.join(candidate);
        if !self.is_occupied(&direct) {
            self.claimed.insert(direct);
            return Ok(candidate.to_string());
        }

        let prefix = match disambiguator {
            Some(d) => d.to_string(),
            None => self.fallback_prefix(),
        };

        let first = format!("{prefix}_{candidate}");
        let first_path = dest_dir.join(&first);
        if !self.is_occupied(&first_path) {
            self.claimed.insert(first_path);
            return Ok(first);
        }

        for n in 2..=MAX_PROBES {
            let name = format!("{prefix}_{n}_{candidate}");
            let path = dest_dir.join(&name);
            if !self.is_occupied(&path) {
                self.claimed.insert(path);
                return Ok(name);
            }
        }

        Err(ReorganizeError::ConflictResolutionExhausted {
            path: dest_dir.join(candidate),
            attempts: MAX_PROBES,
        })
    }

    /// Forget all claimed names. Call between independent passes.
    pub fn reset(&mut self) {
        self.claimed.clear();
    }

    fn fallback_prefix(&mut self) -> String {
        match self.fallback {
            Fallback::Counter => {
                self.counter += 1;
                format!("dup{}", self.counter)
            }
            Fallback::Timestamp => chrono::Utc::now().timestamp().to_string(),
        }
    }
}
