use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Both hash algorithms failed for one file.
///
/// `source` is the SHA-1 fallback failure; the XXH32 failure that triggered
/// the fallback is kept in `primary`.
#[derive(Debug, Error)]
#[error("could not hash {}: {source} (xxh32 failed before: {primary})", path.display())]
pub struct HashError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
    pub primary: io::Error,
}

/// Why no metadata record could be produced for a file.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no usable EXIF data in {}: {source}", path.display())]
    Exif {
        path: PathBuf,
        #[source]
        source: exif::Error,
    },

    #[error("malformed media container {}: {source}", path.display())]
    Container {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
