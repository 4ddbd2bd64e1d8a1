//! Frame-driven incremental reveal
//!
//! An [`Animation`] walks a payload shape by shape, point by point,
//! emitting primitive draw commands to a [`RenderSink`]. Scheduling is
//! external: a driver calls [`Animation::tick`] once per frame and the
//! engine does a bounded amount of work per call. Progress state is
//! just `(shape_index, point_index)`.
//!
//! State machine: `Idle -> Running -> {Completed | Cancelled | Failed}`.
//! There is no pause/resume; one run per `Animation` value.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::{Bounds, PathData};
use crate::sink::{RenderSink, SinkError};

/// Engine tunables
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Path points consumed per tick; controls perceived speed.
    /// A zero is treated as 1.
    pub points_per_tick: usize,

    /// Margin added on every side of the drawing's bounding box
    pub padding: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            points_per_tick: 5,
            padding: 80.0,
        }
    }
}

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Created but not started
    Idle,
    /// Mid-run; progress advances once per tick
    Running,
    /// All shapes drawn and `complete` reported; the sole success state
    Completed,
    /// A cancel request was observed at a tick boundary
    Cancelled,
    /// The sink rejected a command; the run was aborted
    Failed,
}

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// More work remains
    Running,
    /// The run just completed (or already had)
    Completed,
    /// The run was cancelled (or already had been)
    Cancelled,
}

/// Terminal outcome of a driven run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Ran to completion
    Completed,
    /// Stopped on a cancel request
    Cancelled,
}

/// Cancellation flag shared with a running animation. Cloneable; safe
/// to fire at any point, including after completion (a no-op then).
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Request cancellation; observed at the next tick boundary
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Has cancellation been requested?
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Injectable per-frame driver, so tests can run the engine without a
/// real display loop
pub trait TickSource {
    /// Block until the next frame; `false` once the source is exhausted
    fn wait(&mut self) -> bool;
}

/// Tick source that is always ready; useful for headless runs and tests
pub struct Immediate;

impl TickSource for Immediate {
    fn wait(&mut self) -> bool {
        true
    }
}

/// One progressive reveal of a drawing payload
pub struct Animation {
    data: PathData,
    config: Config,
    shape_index: usize,
    point_index: usize,
    status: Status,
    cancel_flag: Arc<AtomicBool>,
}

impl Animation {
    /// Validate a payload and prepare a run.
    ///
    /// Rejects a shape/colour count mismatch and empty shapes up front
    /// rather than faulting mid-draw.
    pub fn new(data: PathData, config: Config) -> Result<Self> {
        if data.coordinates.len() != data.colours.len() {
            return Err(Error::MalformedPayload(format!(
                "{} shapes but {} colours",
                data.coordinates.len(),
                data.colours.len()
            )));
        }

        if let Some(i) = data.coordinates.iter().position(|shape| shape.is_empty()) {
            return Err(Error::MalformedPayload(format!("shape {} has no points", i)));
        }

        Ok(Animation {
            data,
            config: Config {
                points_per_tick: config.points_per_tick.max(1),
                ..config
            },
            shape_index: 0,
            point_index: 1,
            status: Status::Idle,
            cancel_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Handle for cancelling this run from elsewhere
    pub fn handle(&self) -> CancelHandle {
        CancelHandle(self.cancel_flag.clone())
    }

    /// Current run state
    pub fn status(&self) -> Status {
        self.status
    }

    /// Request cancellation; observed at the next tick boundary
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    /// Report the viewport and open the first shape.
    ///
    /// An empty payload skips both; the first `tick` then reports
    /// completion without any draw command.
    pub fn start<S: RenderSink>(&mut self, sink: &mut S) -> Result<()> {
        if self.status != Status::Idle {
            return Err(Error::AlreadyStarted);
        }
        self.status = Status::Running;

        let bounds = match Bounds::of(&self.data.coordinates) {
            Some(bounds) => bounds,
            None => return Ok(()),
        };

        let viewport = bounds.viewport(self.config.padding);
        self.sink_call(sink.configure_viewport(
            viewport.x,
            viewport.y,
            viewport.width,
            viewport.height,
        ))?;

        let first = self.data.coordinates[0][0];
        let colour = self.data.colours[0].to_display();
        self.sink_call(sink.begin_shape(first.x, first.y, colour))?;

        Ok(())
    }

    /// Advance one tick: up to `points_per_tick` stroke extensions, or
    /// a shape close (which ends the tick early), or the final
    /// completion report. Terminal states are absorbing and emit
    /// nothing.
    pub fn tick<S: RenderSink>(&mut self, sink: &mut S) -> Result<Step> {
        match self.status {
            Status::Idle => return Err(Error::NotStarted),
            Status::Running => {}
            Status::Completed => return Ok(Step::Completed),
            Status::Cancelled => return Ok(Step::Cancelled),
            Status::Failed => return Err(Error::Failed),
        }

        if self.cancel_flag.load(Ordering::Relaxed) {
            self.status = Status::Cancelled;
            return Ok(Step::Cancelled);
        }

        if self.shape_index >= self.data.coordinates.len() {
            self.sink_call(sink.complete())?;
            self.status = Status::Completed;
            return Ok(Step::Completed);
        }

        for _ in 0..self.config.points_per_tick {
            let shape = &self.data.coordinates[self.shape_index];
            if self.point_index < shape.len() {
                let point = shape[self.point_index];
                let colour = self.data.colours[self.shape_index].to_display();
                self.sink_call(sink.extend_to(point.x, point.y, colour))?;
                self.point_index += 1;
            } else {
                let fill = self.data.colours[self.shape_index].to_display();
                self.sink_call(sink.close_and_fill(fill))?;

                self.shape_index += 1;
                if self.shape_index < self.data.coordinates.len() {
                    self.point_index = 1;
                    let first = self.data.coordinates[self.shape_index][0];
                    let colour = self.data.colours[self.shape_index].to_display();
                    self.sink_call(sink.begin_shape(first.x, first.y, colour))?;
                }
                // A shape boundary ends the tick
                break;
            }
        }

        Ok(Step::Running)
    }

    /// Drive the run to a terminal state with the given tick source.
    /// An exhausted tick source counts as a cancel request.
    pub fn run<S: RenderSink, T: TickSource>(
        &mut self,
        sink: &mut S,
        ticks: &mut T,
    ) -> Result<Outcome> {
        self.start(sink)?;
        loop {
            if !ticks.wait() {
                self.cancel();
            }
            match self.tick(sink)? {
                Step::Running => {}
                Step::Completed => return Ok(Outcome::Completed),
                Step::Cancelled => return Ok(Outcome::Cancelled),
            }
        }
    }

    fn sink_call(&mut self, result: std::result::Result<(), SinkError>) -> Result<()> {
        result.map_err(|e| {
            self.status = Status::Failed;
            Error::Sink(e)
        })
    }
}
