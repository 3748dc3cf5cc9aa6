use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while sweeping metadata from images.
///
/// `Parse` is produced by the EXIF decoder but never escapes
/// [`Sweeper::strip_metadata`](crate::sweeper::Sweeper::strip_metadata):
/// an unparseable blob is treated as absent metadata.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Metadata is not a valid EXIF directory: {0}")]
    Parse(String),

    #[error("Failed to encode metadata: {0}")]
    Encode(String),

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Input or output folder not set.")]
    NotConfigured,

    #[error("Failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T, E = SweepError> = std::result::Result<T, E>;
