//! SHA-256 utilities for integrity verification.
//!
//! Lets callers assert the no-data-loss property: every file present under
//! a scanned slot before a run must exist somewhere under the output root
//! afterwards, by content hash.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use walkdir::WalkDir;

use crate::error::ReorganizeError;

/// Buffer size for reading files (8KB)
const BUFFER_SIZE: usize = 8192;

/// Content checksum of a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChecksum {
    pub sha256: String,
    pub size: u64,
}

/// Compute the SHA-256 checksum of a file, reading in chunks.
pub fn compute_file_checksum(path: &Path) -> Result<FileChecksum, ReorganizeError> {
    let metadata = std::fs::metadata(path)?;
    let file = File::open(path)?;

    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(FileChecksum {
        sha256: hex::encode(hasher.finalize()),
        size: metadata.len(),
    })
}

/// Census of file contents under a root: content hash mapped to the number
/// of files carrying that content. Directories contribute nothing.
pub fn snapshot_tree(root: &Path) -> Result<HashMap<String, usize>, ReorganizeError> {
    let mut census: HashMap<String, usize> = HashMap::new();

    for entry in WalkDir::new(root) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let checksum = compute_file_checksum(entry.path())?;
        *census.entry(checksum.sha256).or_insert(0) += 1;
    }

    Ok(census)
}

/// Hashes present in `before` whose occurrence count dropped in `after`.
/// An empty result means no content was lost.
pub fn missing_contents(
    before: &HashMap<String, usize>,
    after: &HashMap<String, usize>,
) -> Vec<String> {
    before
        .iter()
        .filter(|(hash, count)| after.get(*hash).copied().unwrap_or(0) < **count)
        .map(|(hash, _)| hash.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_compute_file_checksum() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");

        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"Hello, World!").unwrap();

        let checksum = compute_file_checksum(&file_path).unwrap();

        assert!(!checksum.sha256.is_empty());
        assert_eq!(checksum.size, 13); // "Hello, World!" is 13 bytes
    }

    #[test]
    fn test_same_content_same_hash() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "content").unwrap();
        fs::write(temp_dir.path().join("b.txt"), "content").unwrap();

        let a = compute_file_checksum(&temp_dir.path().join("a.txt")).unwrap();
        let b = compute_file_checksum(&temp_dir.path().join("b.txt")).unwrap();

        assert_eq!(a.sha256, b.sha256);
    }

    #[test]
    fn test_snapshot_counts_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("sub")).unwrap();
        fs::write(temp_dir.path().join("a.txt"), "same").unwrap();
        fs::write(temp_dir.path().join("sub/b.txt"), "same").unwrap();
        fs::write(temp_dir.path().join("c.txt"), "other").unwrap();

        let census = snapshot_tree(temp_dir.path()).unwrap();

        assert_eq!(census.len(), 2);
        assert!(census.values().any(|&count| count == 2));
    }

    #[test]
    fn test_missing_contents_detects_loss() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "precious").unwrap();

        let before = snapshot_tree(temp_dir.path()).unwrap();
        fs::remove_file(temp_dir.path().join("a.txt")).unwrap();
        let after = snapshot_tree(temp_dir.path()).unwrap();

        assert_eq!(missing_contents(&before, &after).len(), 1);
        assert!(missing_contents(&before, &before).is_empty());
    }
}
