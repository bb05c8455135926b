use std::fmt;
use std::path::PathBuf;

use crate::hunk::error::HunkError;

/// Unified error type for the hunklink library.
#[derive(Debug)]
pub enum Error {
    /// A hunk stream failed to decode.
    Hunk(HunkError),
    /// Reading or writing a file failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Hunk(e) => write!(f, "hunk error: {e}"),
            Error::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Hunk(e) => Some(e),
            Error::Io { source, .. } => Some(source),
        }
    }
}

impl From<HunkError> for Error {
    fn from(e: HunkError) -> Self {
        Error::Hunk(e)
    }
}
