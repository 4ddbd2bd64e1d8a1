//! Path-data sources
//!
//! On a cache miss the payload comes from a source implementing
//! [`PathSource`]. The drawing service serves one
//! `{"coordinates": ..., "colours": ...}` document per image; a
//! directory of such JSON documents stands in for it here.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use sketchanim::PathData;

/// Where drawing payloads come from on a cache miss
pub trait PathSource {
    /// Fetch the payload for an image
    fn fetch(&self, image: &str) -> Result<PathData>;
}

/// Payload documents stored as `<root>/<image>.json`
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    /// Source over the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirSource { root: root.into() }
    }
}

impl PathSource for DirSource {
    fn fetch(&self, image: &str) -> Result<PathData> {
        let path = self.root.join(format!("{}.json", image));
        let bytes =
            fs::read(&path).with_context(|| format!("reading path data from {}", path.display()))?;
        let data = serde_json::from_slice(&bytes)
            .with_context(|| format!("decoding path data from {}", path.display()))?;
        Ok(data)
    }
}
