use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to the user. Image processing itself never fails; only
/// file and settings I/O can.
#[derive(Debug, Error)]
pub enum Error {
    /// The image file is missing or could not be decoded.
    #[error("unable to open {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// No platform config directory could be determined.
    #[error("cannot determine config dir")]
    ConfigDir,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings format error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
