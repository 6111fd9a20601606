//! Textual preview of a prospective reorganization.
//!
//! Renders the discovered structure and the output layout a run would
//! produce, for display by whatever shell hosts the core. Read-only.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::policy::MergePolicy;
use crate::scanner::{ScanResult, SlotSet};

/// Render the discovered parents and the prospective output skeleton.
///
/// Slot contents are listed one level deep; unreadable entries are skipped.
pub fn render_preview(
    scan: &ScanResult,
    output_root: &Path,
    slots: &SlotSet,
    policy: &MergePolicy,
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Discovered structure:");
    for (parent, slot_paths) in scan {
        let _ = writeln!(out, "  {parent}/");
        for slot_path in slot_paths {
            if let Some(name) = slot_path.file_name() {
                let _ = writeln!(out, "    └── {}/", name.to_string_lossy());
            }
            for entry in list_entries(slot_path) {
                let _ = writeln!(out, "        └── {entry}");
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Planned output structure:");
    let _ = writeln!(out, "  {}/", output_root.display());
    for slot in slots.names() {
        let _ = writeln!(out, "    └── {slot}/");
        if !policy.direct_merge {
            for parent in scan.keys() {
                let _ = writeln!(out, "        └── {parent}/");
            }
        }
    }

    out
}

/// Immediate entries of a directory, sorted by name.
fn list_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|rd| {
            rd.filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
