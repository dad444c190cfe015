//! Path resolver - maps user-supplied path hints onto inventory entries.
//!
//! The hint may be partial (`x.js`), relative (`./a/x.js`), unnormalized
//! (`a/../a/x.js`), or absolute. Resolution grows the matched suffix one
//! segment at a time until exactly one inventory entry remains; matches
//! align on whole segments, so `hello.js` never matches `othello.js`.

use std::path::PathBuf;

use thiserror::Error;

use crate::scanner::{FileEntry, Inventory};

/// Resolution failure.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No inventory entry matches the hint.
    #[error("no source file matches `{path}`")]
    NotFound {
        /// The user-supplied hint.
        path: String,
    },
    /// More than one entry still matches after the full hint is consumed.
    #[error("`{path}` is ambiguous: {} files match", matches.len())]
    Ambiguous {
        /// The user-supplied hint.
        path: String,
        /// Every remaining candidate.
        matches: Vec<PathBuf>,
    },
    /// The hint's extension is not a supported source kind.
    #[error("`{path}` does not have a supported source extension")]
    UnsupportedExtension {
        /// The user-supplied hint.
        path: String,
    },
}

/// Resolve `hint` against the inventory, with `extensions` as the
/// supported-source allow-list (without dots).
pub fn resolve<'a>(
    inventory: &'a Inventory,
    hint: &str,
    extensions: &[String],
) -> Result<&'a FileEntry, ResolveError> {
    let segments = normalize(hint);
    let Some(basename) = segments.last() else {
        return Err(ResolveError::NotFound {
            path: hint.to_string(),
        });
    };

    let extension = basename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    if !extensions.iter().any(|allowed| allowed == extension) {
        return Err(ResolveError::UnsupportedExtension {
            path: hint.to_string(),
        });
    }

    // k = 1: the basename index narrows the field
    let mut candidates: Vec<&FileEntry> = inventory.with_basename(basename).collect();
    for k in 2..=segments.len() {
        if candidates.len() <= 1 {
            break;
        }
        let wanted = &segments[segments.len() - k..];
        candidates.retain(|entry| suffix_matches(entry, wanted));
    }

    match candidates.len() {
        1 => Ok(candidates[0]),
        0 => Err(ResolveError::NotFound {
            path: hint.to_string(),
        }),
        _ => Err(ResolveError::Ambiguous {
            path: hint.to_string(),
            matches: candidates.into_iter().map(|e| e.path.clone()).collect(),
        }),
    }
}

/// Split a hint into segments, collapsing `.` and `..` and dropping the
/// absolute-root prefix.
fn normalize(hint: &str) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    for segment in hint.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other.to_string()),
        }
    }
    segments
}

/// Whether the entry path's last `wanted.len()` components equal `wanted`.
fn suffix_matches(entry: &FileEntry, wanted: &[String]) -> bool {
    let components: Vec<&str> = entry
        .path
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();
    if wanted.len() > components.len() {
        return false;
    }
    components[components.len() - wanted.len()..]
        .iter()
        .zip(wanted)
        .all(|(have, want)| *have == want)
}
