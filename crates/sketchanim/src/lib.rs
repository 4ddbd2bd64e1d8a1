//! # sketchanim
//!
//! Progressive stroke-then-fill reveal of stored line-art drawings.
//!
//! A drawing payload is an ordered set of closed polygon shapes with
//! index-aligned fill colours. The engine walks the payload a few
//! points per animation tick and emits primitive draw commands to a
//! surface-agnostic [`RenderSink`]. Scheduling stays with the caller:
//! ticks are driven externally, cancellation is cooperative, and every
//! tick does a bounded amount of work.

#![warn(missing_docs)]

mod engine;
mod error;
mod model;
mod sink;

pub use engine::{Animation, CancelHandle, Config, Immediate, Outcome, Status, Step, TickSource};
pub use error::{Error, Result};
pub use model::{Bounds, PathData, Point, Rgb, Shape, Viewport};
pub use sink::{RenderSink, SinkError};
