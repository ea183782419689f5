//! Error types for measurement parsing, image probing and label output.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning measurements into training labels or upload regions.
#[derive(Error, Debug)]
pub enum Error {
    /// Measurement file does not exist
    #[error("Measurement file not found: {path:?}")]
    FileNotFound {
        /// Path that was requested
        path: PathBuf,
    },

    /// Malformed data line in a measurement file
    #[error("Invalid measurement in {path:?} at line {line}: {message}")]
    InputFormat {
        /// File containing the bad line
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// What was wrong with the line
        message: String,
    },

    /// Image missing, unreadable or in an unknown format
    #[error("Failed to read image dimensions from {path:?}: {message}")]
    ImageDecode {
        /// Image path
        path: PathBuf,
        /// Underlying decoder message
        message: String,
    },

    /// Read or write failure on a specific file
    #[error("IO error on {path:?}: {source}")]
    Io {
        /// File being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A tag has no entry in a pre-assigned tag list
    #[error("Tag '{tag}' of image '{image}' is missing from the tag list")]
    UnknownTag {
        /// Offending tag
        tag: String,
        /// Image carrying the tag
        image: String,
    },

    /// Two outputs map to the same label file
    #[error("Label file {path:?} for image '{image}' collides with '{other}'")]
    LabelPathConflict {
        /// Shared output path
        path: PathBuf,
        /// Image that would overwrite it
        image: String,
        /// Image or file already owning the path
        other: String,
    },

    /// Upload collaborator failed as a whole (not a per-image rejection)
    #[error("Upload failed: {0}")]
    Upload(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for this crate
pub type Result<T> = std::result::Result<T, Error>;
