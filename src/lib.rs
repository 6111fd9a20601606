//! Consolidates numbered "run" directories scattered across sibling project
//! folders into a single output tree.
//!
//! A pass scans the immediate children of a source root for recognized slot
//! directories (`run0`..`run4` by default), builds an output skeleton, and
//! merges every slot across all discovered parents using move semantics.
//! Colliding names are resolved deterministically by prefixing the
//! originating parent name, a dry run previews the exact decisions a real
//! run would take, and cleanup of the original parents is gated on
//! error-free merges.
//!
//! ```no_run
//! use runmerge::{MergePolicy, Reorganizer, TracingSink};
//!
//! # fn main() -> Result<(), runmerge::ReorganizeError> {
//! let policy = MergePolicy::new()
//!     .with_direct_merge(true)
//!     .with_clean_original(true);
//! let mut sink = TracingSink;
//! let report = Reorganizer::new("/data/projects", policy).run(&mut sink)?;
//! if let Ok(json) = report.to_json() {
//!     println!("{json}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod checksum;
pub mod conflict;
pub mod error;
pub mod logging;
pub mod merge;
pub mod policy;
pub mod preview;
pub mod report;
pub mod reorganizer;
pub mod scanner;

pub use conflict::{ConflictResolver, Fallback};
pub use error::ReorganizeError;
pub use merge::{MergeOutcome, TreeMerger};
pub use policy::MergePolicy;
pub use report::{
    ErrorRecord, EventKind, FileSystemEvent, MemorySink, NullSink, ReportSink, TracingSink,
};
pub use reorganizer::{Phase, Reorganizer, ReorganizeReport};
pub use scanner::{PathScanner, ScanResult, SlotSet};
