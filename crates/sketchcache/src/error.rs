//! Error types for sketchcache

use std::fmt;

/// Result type alias for sketchcache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cache operations
#[derive(Debug)]
pub enum Error {
    /// The store could not be opened on first use (platform denied
    /// access to the cache directory)
    Unavailable(sketchstore::Error),

    /// An underlying store operation failed
    Store(sketchstore::Error),

    /// Payload encoding or decoding failed
    Codec(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Unavailable(e) => write!(f, "Cache storage unavailable: {}", e),
            Error::Store(e) => write!(f, "Cache operation failed: {}", e),
            Error::Codec(e) => write!(f, "Payload codec error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Unavailable(e) | Error::Store(e) => Some(e),
            Error::Codec(e) => Some(e),
        }
    }
}

impl From<sketchstore::Error> for Error {
    fn from(err: sketchstore::Error) -> Self {
        Error::Store(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Codec(err)
    }
}
