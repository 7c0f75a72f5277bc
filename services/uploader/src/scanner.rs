//! Recursive scan of the local segment directory.
//!
//! The capture component drops finished video files somewhere under the
//! configured directory, possibly nested by date or camera. The scanner
//! walks the whole tree and picks out files whose name carries the video
//! marker, pairing each bare file name with its full path.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// Bare file name, used as the object key
    pub name: String,
    /// Full path on local disk
    pub path: PathBuf,
}

/// Errors from scanning the segment directory.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Segment directory {path} is unavailable: {source}")]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Segment path {path} is not a directory")]
    NotADirectory { path: PathBuf },
}

/// Recursively collect files under `root` whose name contains `marker`.
///
/// The match is a plain substring check on the file name, so a partial
/// write like `clip.mp4.tmp` also qualifies; the capture component owns
/// the naming convention and is expected to write atomically. Unreadable
/// subtrees are skipped rather than failing the whole scan.
pub fn scan_for_segments(root: &Path, marker: &str) -> Result<Vec<CandidateFile>, ScanError> {
    let metadata = std::fs::metadata(root).map_err(|source| ScanError::RootUnavailable {
        path: root.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let mut candidates = Vec::new();
    for entry in WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        // Names that are not valid UTF-8 cannot contain the marker.
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if name.contains(marker) {
            candidates.push(CandidateFile {
                name: name.to_string(),
                path: entry.into_path(),
            });
        }
    }

    Ok(candidates)
}
