// THEORY:
// Every failure the harness core can report falls into one of three buckets:
// the filesystem refused us (`Io`), an image file is structurally wrong
// (`Format`), or the caller asked for something meaningless (`Configuration`).
// `InvalidImage` guards `Image` construction. `Worker` only exists in the
// in-process driver, for tasks that never reported.
// All operations fail fast with one of these and never hand back partially valid
// data. Retrying is a driver decision, not ours.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid image {}: {reason}", path.display())]
    Format { path: PathBuf, reason: FormatError },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Pixel buffer and declared geometry disagree.
    #[error("invalid raster: {0}")]
    InvalidImage(String),

    /// A worker task died before reporting (panic or runtime shutdown).
    #[error("worker task did not finish: {reason}")]
    Worker {
        partition: Option<usize>,
        reason: String,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, reason: FormatError) -> Self {
        Error::Format {
            path: path.into(),
            reason,
        }
    }
}

/// Structural problems found while decoding a raw truecolor image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("bad magic")]
    BadMagic,

    #[error("truncated header")]
    TruncatedHeader,

    #[error("malformed header field `{field}`")]
    MalformedHeader { field: &'static str },

    #[error("truncated pixel data: expected {expected} bytes, read {read}")]
    TruncatedPixelData { expected: usize, read: usize },
}
