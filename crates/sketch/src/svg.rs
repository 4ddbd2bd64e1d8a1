//! SVG surface adapter
//!
//! Builds the drawing as an SVG document out of path `d` strings:
//! `M` on begin, `L` per stroke extension, `Z` plus a fill on close.
//! The document can be serialized at any point; a cancelled run yields
//! the partial drawing.

use sketchanim::{RenderSink, SinkError};

const STROKE_WIDTH: f64 = 1.2;

struct SvgPath {
    d: String,
    stroke: String,
    fill: Option<String>,
}

/// Render sink that accumulates an SVG document
#[derive(Default)]
pub struct SvgSink {
    viewport: Option<(f64, f64, f64, f64)>,
    paths: Vec<SvgPath>,
    completed: bool,
}

impl SvgSink {
    /// Empty sink, ready for a run
    pub fn new() -> Self {
        Self::default()
    }

    /// Did the run report completion?
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Serialize the drawing in its current state
    pub fn to_document(&self) -> String {
        let (x, y, width, height) = self.viewport.unwrap_or((0.0, 0.0, 0.0, 0.0));

        let mut doc = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" viewBox=\"{} {} {} {}\">\n",
            width, height, x, y, width, height
        );
        for path in &self.paths {
            let fill = path.fill.as_deref().unwrap_or("none");
            doc.push_str(&format!(
                "  <path d=\"{}\" stroke=\"{}\" stroke-width=\"{}\" fill=\"{}\"/>\n",
                path.d, path.stroke, STROKE_WIDTH, fill
            ));
        }
        doc.push_str("</svg>\n");
        doc
    }
}

fn rgb(colour: [u8; 3]) -> String {
    format!("rgb({}, {}, {})", colour[0], colour[1], colour[2])
}

impl RenderSink for SvgSink {
    fn configure_viewport(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<(), SinkError> {
        self.viewport = Some((x, y, width, height));
        Ok(())
    }

    fn begin_shape(&mut self, x: f64, y: f64, colour: [u8; 3]) -> Result<(), SinkError> {
        self.paths.push(SvgPath {
            d: format!("M{},{}", x, y),
            stroke: rgb(colour),
            fill: None,
        });
        Ok(())
    }

    fn extend_to(&mut self, x: f64, y: f64, _colour: [u8; 3]) -> Result<(), SinkError> {
        match self.paths.last_mut() {
            Some(path) => {
                path.d.push_str(&format!("L{},{}", x, y));
                Ok(())
            }
            None => Err(SinkError::new("extend_to before begin_shape")),
        }
    }

    fn close_and_fill(&mut self, colour: [u8; 3]) -> Result<(), SinkError> {
        match self.paths.last_mut() {
            Some(path) => {
                path.d.push('Z');
                path.fill = Some(rgb(colour));
                Ok(())
            }
            None => Err(SinkError::new("close_and_fill before begin_shape")),
        }
    }

    fn complete(&mut self) -> Result<(), SinkError> {
        self.completed = true;
        Ok(())
    }
}
