//! Render sink boundary
//!
//! A sink is a thin per-surface adapter. Colours arrive as
//! display-channel integer triples (0-255); coordinates are in the
//! drawing space reported by `configure_viewport`.

use std::fmt;

/// Rejection from a render sink; fails the run that issued the command
#[derive(Debug, Clone, PartialEq)]
pub struct SinkError(String);

impl SinkError {
    /// Create a sink error with the given cause
    pub fn new(msg: impl Into<String>) -> Self {
        SinkError(msg.into())
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sink rejected command: {}", self.0)
    }
}

impl std::error::Error for SinkError {}

/// Primitive drawing commands a surface adapter must accept
pub trait RenderSink {
    /// Report the drawing extent before any draw command
    fn configure_viewport(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<(), SinkError>;

    /// Open a new shape at its first point
    fn begin_shape(&mut self, x: f64, y: f64, colour: [u8; 3]) -> Result<(), SinkError>;

    /// Extend the open shape's stroke to the next point
    fn extend_to(&mut self, x: f64, y: f64, colour: [u8; 3]) -> Result<(), SinkError>;

    /// Close the open shape (back to its first point) and fill it
    fn close_and_fill(&mut self, colour: [u8; 3]) -> Result<(), SinkError>;

    /// The drawing is done; no further commands will arrive
    fn complete(&mut self) -> Result<(), SinkError>;
}
