//! Error types for sketchanim

use std::fmt;

use crate::sink::SinkError;

/// Result type alias for sketchanim operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for animation runs
#[derive(Debug)]
pub enum Error {
    /// Payload fails the engine's defensive checks (shape/colour count
    /// mismatch, empty shape)
    MalformedPayload(String),

    /// `start` called on an animation that already ran
    AlreadyStarted,

    /// `tick` called before `start`
    NotStarted,

    /// `tick` called after the run already failed
    Failed,

    /// The sink rejected a command; the run is aborted
    Sink(SinkError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedPayload(msg) => write!(f, "Malformed payload: {}", msg),
            Error::AlreadyStarted => write!(f, "Animation was already started"),
            Error::NotStarted => write!(f, "Animation has not been started"),
            Error::Failed => write!(f, "Animation run has failed"),
            Error::Sink(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Sink(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SinkError> for Error {
    fn from(err: SinkError) -> Self {
        Error::Sink(err)
    }
}
