//! Source scanner - builds the immutable file inventory at startup.
//!
//! One recursive walk of the working directory, keeping files whose
//! extension is on the allow-list. Each entry records the absolute path,
//! byte length, line count, and a SHA-256 content hash; the inventory's
//! aggregate hash is deterministic in the set of entries. Unreadable
//! entries are logged and skipped; symlink loops are detected by the
//! walker and skipped the same way.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use sha2::{Digest, Sha256};
use thiserror::Error;
use walkdir::WalkDir;

/// Scanner failure (the walk itself; per-file problems only warn).
#[derive(Debug, Error)]
pub enum ScanError {
    /// The working directory does not exist or is unreadable.
    #[error("cannot scan working directory {path}: {source}")]
    Root {
        /// The configured working directory.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One discovered source file. Read-only after the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path.
    pub path: PathBuf,
    /// Byte length.
    pub size: u64,
    /// Number of lines (used to validate requested breakpoint lines).
    pub lines: u32,
    /// Lowercase-hex SHA-256 of the contents.
    pub hash: String,
}

/// The set of candidate source files discovered at startup.
#[derive(Debug, Default)]
pub struct Inventory {
    entries: Vec<FileEntry>,
    /// Final path component → entry indices, the resolver's first cut.
    by_name: HashMap<String, Vec<usize>>,
    /// Deterministic hash over all entries.
    pub aggregate_hash: String,
}

impl Inventory {
    /// All entries, in walk order.
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the scan found nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose final path component is `name`.
    pub fn with_basename(&self, name: &str) -> impl Iterator<Item = &FileEntry> {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .map(move |&i| &self.entries[i])
    }

    /// Look up an entry by its absolute path.
    pub fn get(&self, path: &Path) -> Option<&FileEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    fn insert(&mut self, entry: FileEntry) {
        if let Some(name) = entry.path.file_name().and_then(|n| n.to_str()) {
            self.by_name
                .entry(name.to_string())
                .or_default()
                .push(self.entries.len());
        }
        self.entries.push(entry);
    }
}

/// Walk `root` and build the inventory of files whose extension is in
/// `extensions` (without dots).
pub fn scan(root: &Path, extensions: &[String]) -> Result<Inventory, ScanError> {
    let root = root.canonicalize().map_err(|source| ScanError::Root {
        path: root.to_path_buf(),
        source,
    })?;

    let mut inventory = Inventory::default();
    for entry in WalkDir::new(&root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                // Includes symlink loops, which walkdir detects for us
                warn!("skipping unreadable entry during scan: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if !extensions.iter().any(|allowed| allowed == extension) {
            continue;
        }
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("skipping unreadable file {}: {err}", path.display());
                continue;
            }
        };
        inventory.insert(FileEntry {
            path: path.to_path_buf(),
            size: bytes.len() as u64,
            lines: count_lines(&bytes),
            hash: hex::encode(Sha256::digest(&bytes)),
        });
    }

    inventory.aggregate_hash = aggregate_hash(&inventory.entries);
    debug!(
        "scanned {} source files under {} (aggregate {})",
        inventory.len(),
        root.display(),
        inventory.aggregate_hash
    );
    Ok(inventory)
}

fn count_lines(bytes: &[u8]) -> u32 {
    if bytes.is_empty() {
        return 0;
    }
    let newlines = bytes.iter().filter(|&&b| b == b'\n').count();
    let trailing = if bytes.ends_with(b"\n") { 0 } else { 1 };
    (newlines + trailing) as u32
}

/// SHA-256 over the sorted `path\thash` lines: stable in entry order.
fn aggregate_hash(entries: &[FileEntry]) -> String {
    let mut lines: Vec<String> = entries
        .iter()
        .map(|e| format!("{}\t{}", e.path.display(), e.hash))
        .collect();
    lines.sort();
    let mut hasher = Sha256::new();
    for line in &lines {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
