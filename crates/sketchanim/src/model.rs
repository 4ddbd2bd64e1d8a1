//! Drawing payload model
//!
//! The JSON shape matches the path-data service response:
//! `{"coordinates": [[[x, y], ...], ...], "colours": [[r, g, b], ...]}`
//! with points as 2-element arrays and colours as normalized
//! 3-element arrays in `[0, 1]`.

use serde::{Deserialize, Serialize};

/// One vertex of a shape, in the shared drawing coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Point { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(point: Point) -> Self {
        [point.x, point.y]
    }
}

/// One closed polygon path, drawn stroke-then-fill
pub type Shape = Vec<Point>;

/// Normalized colour with channels in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Rgb {
    /// Red channel
    pub r: f64,
    /// Green channel
    pub g: f64,
    /// Blue channel
    pub b: f64,
}

impl From<[f64; 3]> for Rgb {
    fn from([r, g, b]: [f64; 3]) -> Self {
        Rgb { r, g, b }
    }
}

impl From<Rgb> for [f64; 3] {
    fn from(colour: Rgb) -> Self {
        [colour.r, colour.g, colour.b]
    }
}

impl Rgb {
    /// Display-channel triple. Each channel is `floor(c * 255)`; the
    /// floor is load-bearing for parity with existing cached drawings
    /// (0.999 maps to 254, not 255).
    pub fn to_display(self) -> [u8; 3] {
        [channel(self.r), channel(self.g), channel(self.b)]
    }
}

fn channel(c: f64) -> u8 {
    (c * 255.0).floor() as u8
}

/// A drawing payload: shapes plus index-aligned fill colours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathData {
    /// Shapes in draw order
    pub coordinates: Vec<Shape>,
    /// Colours, index-aligned 1:1 with `coordinates`
    pub colours: Vec<Rgb>,
}

/// Axis-aligned bounding box over a flattened point set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Smallest x over all points
    pub min_x: f64,
    /// Smallest y over all points
    pub min_y: f64,
    /// Largest x over all points
    pub max_x: f64,
    /// Largest y over all points
    pub max_y: f64,
}

impl Bounds {
    /// Bounding box over every point of every shape; `None` when there
    /// are no points at all
    pub fn of(shapes: &[Shape]) -> Option<Bounds> {
        let mut points = shapes.iter().flatten();
        let first = points.next()?;
        let mut bounds = Bounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for point in points {
            bounds.min_x = bounds.min_x.min(point.x);
            bounds.min_y = bounds.min_y.min(point.y);
            bounds.max_x = bounds.max_x.max(point.x);
            bounds.max_y = bounds.max_y.max(point.y);
        }
        Some(bounds)
    }

    /// Viewport extent with a uniform padding margin
    pub fn viewport(&self, padding: f64) -> Viewport {
        Viewport {
            x: self.min_x - padding,
            y: self.min_y - padding,
            width: self.max_x - self.min_x + 2.0 * padding,
            height: self.max_y - self.min_y + 2.0 * padding,
        }
    }
}

/// Drawing extent reported to the sink before drawing starts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Total width including padding on both sides
    pub width: f64,
    /// Total height including padding on both sides
    pub height: f64,
}
