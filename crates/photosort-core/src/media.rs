use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Lowercase extensions of the files picked up from the input directory.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "mp4", "mov"];

/// Check if a path has one of the supported media extensions (case-insensitive).
pub fn is_media_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(ext))
        })
}

#[derive(Debug, Clone)]
pub struct MediaCandidate {
    /// Full path inside the input directory
    pub path: PathBuf,
    /// Just the filename, lossily decoded for display
    pub filename: String,
}

impl MediaCandidate {
    pub fn new(path: PathBuf) -> Self {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, filename }
    }
}

/// A single relocation decided during planning and applied during execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedMove {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// True when the destination was derived from a resolved creation date,
    /// false for the unsorted holding area.
    pub has_valid_date: bool,
}

impl PlannedMove {
    pub fn dated(source: PathBuf, destination: PathBuf) -> Self {
        Self {
            source,
            destination,
            has_valid_date: true,
        }
    }

    pub fn unsorted(source: PathBuf, destination: PathBuf) -> Self {
        Self {
            source,
            destination,
            has_valid_date: false,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.source == self.destination
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_extensions() {
        assert!(is_media_file(Path::new("/in/IMG_0001.JPG")));
        assert!(is_media_file(Path::new("/in/holiday.jpeg")));
        assert!(is_media_file(Path::new("/in/screen.Png")));
        assert!(is_media_file(Path::new("/in/clip.mp4")));
        assert!(is_media_file(Path::new("/in/clip.MOV")));
        assert!(!is_media_file(Path::new("/in/notes.txt")));
        assert!(!is_media_file(Path::new("/in/archive.jpg.zip")));
        assert!(!is_media_file(Path::new("/in/jpg")));
    }

    #[test]
    fn test_noop_move() {
        let same = PlannedMove::unsorted(PathBuf::from("/a/b.jpg"), PathBuf::from("/a/b.jpg"));
        assert!(same.is_noop());
        let moved = PlannedMove::dated(PathBuf::from("/a/b.jpg"), PathBuf::from("/o/b.jpg"));
        assert!(!moved.is_noop());
        assert!(moved.has_valid_date);
    }
}
