//! Error types for sketchstore

use std::fmt;
use std::io;

/// Result type alias for sketchstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for store operations
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(io::Error),

    /// Parse error
    Parse(String),

    /// Payload too large (max 8 MB)
    ValueTooLarge(usize),

    /// Key too large (max 64 KB)
    KeyTooLarge(usize),

    /// Database full (max 1 GB)
    DatabaseFull(u64),

    /// Store is closed
    Closed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Parse(msg) => write!(f, "Parse error: {}", msg),
            Error::ValueTooLarge(size) => {
                write!(f, "Payload too large: {} bytes (max 8 MB)", size)
            }
            Error::KeyTooLarge(size) => write!(f, "Key too large: {} bytes (max 64 KB)", size),
            Error::DatabaseFull(size) => write!(f, "Database full: {} bytes (max 1 GB)", size),
            Error::Closed => write!(f, "Store is closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
