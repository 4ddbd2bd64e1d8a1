//! Resolve-then-animate flow
//!
//! Mirrors the drawing app's lifecycle: try the cache, fall back to the
//! source and populate the cache on a miss, then drive the animation
//! one frame at a time until it completes or the user cancels.

use std::time::Duration;

use anyhow::{Context, Result};
use sketchanim::{Animation, Config, Outcome, PathData, RenderSink, Step};
use sketchcache::DrawingCache;
use tracing::{info, warn};

use crate::source::PathSource;

/// Resolve the payload for an image from cache or source.
///
/// Cache failures degrade to a source fetch; only a source failure is
/// fatal. A fetched payload is written back to the cache best-effort.
pub fn resolve_payload(
    cache: &DrawingCache,
    source: &dyn PathSource,
    image: &str,
) -> Result<PathData> {
    match cache.get(image) {
        Ok(Some(entry)) => {
            info!(image, "loading from cache");
            return Ok(entry.data);
        }
        Ok(None) => {}
        Err(e) => warn!(image, error = %e, "cache read failed; falling back to source"),
    }

    info!(image, "fetching from source");
    let data = source.fetch(image).context("fetching path data")?;

    if let Err(e) = cache.set(image, &data) {
        warn!(image, error = %e, "caching fetched payload failed");
    }

    Ok(data)
}

/// Drive an animation to a terminal state at `fps` frames per second.
///
/// Ctrl-C requests cooperative cancellation, observed at the next tick
/// boundary; the sink receives nothing after that.
pub async fn animate<S: RenderSink>(
    data: PathData,
    config: Config,
    fps: u32,
    sink: &mut S,
) -> Result<Outcome> {
    let mut animation = Animation::new(data, config)?;
    let handle = animation.handle();

    let frame = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));
    let mut ticker = tokio::time::interval(frame);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut cancel_requested = false;

    info!("drawing in progress");
    animation.start(sink)?;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut ctrl_c, if !cancel_requested => {
                cancel_requested = true;
                handle.cancel();
                warn!("cancel requested");
                continue;
            }
        }

        match animation.tick(sink)? {
            Step::Running => {}
            Step::Completed => {
                info!("drawing complete");
                return Ok(Outcome::Completed);
            }
            Step::Cancelled => {
                warn!("drawing cancelled");
                return Ok(Outcome::Cancelled);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svg::SvgSink;
    use sketchanim::{Point, Rgb};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn payload() -> PathData {
        PathData {
            coordinates: vec![vec![Point { x: 0.0, y: 0.0 }, Point { x: 4.0, y: 4.0 }]],
            colours: vec![Rgb {
                r: 0.5,
                g: 0.5,
                b: 0.5,
            }],
        }
    }

    /// Source that counts fetches
    struct CountingSource(AtomicUsize);

    impl PathSource for CountingSource {
        fn fetch(&self, _image: &str) -> Result<PathData> {
            self.0.fetch_add(1, Ordering::Relaxed);
            Ok(payload())
        }
    }

    #[test]
    fn test_miss_fetches_and_populates_cache() {
        let dir = TempDir::new().unwrap();
        let cache = DrawingCache::with_default_expiry(dir.path());
        let source = CountingSource(AtomicUsize::new(0));

        let data = resolve_payload(&cache, &source, "cat.png").unwrap();
        assert_eq!(data, payload());
        assert_eq!(source.0.load(Ordering::Relaxed), 1);

        // Second resolve is served from the cache
        resolve_payload(&cache, &source, "cat.png").unwrap();
        assert_eq!(source.0.load(Ordering::Relaxed), 1);
        assert_eq!(cache.counters().hits(), 1);
    }

    #[test]
    fn test_cache_failure_falls_back_to_source() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-directory");
        std::fs::write(&blocker, b"plain file").unwrap();

        let cache = DrawingCache::with_default_expiry(&blocker);
        let source = CountingSource(AtomicUsize::new(0));

        let data = resolve_payload(&cache, &source, "cat.png").unwrap();
        assert_eq!(data, payload());
        assert_eq!(source.0.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_animate_runs_to_completion() {
        let mut sink = SvgSink::new();
        let outcome = animate(payload(), Config::default(), 1000, &mut sink)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Completed);
        assert!(sink.is_complete());
    }

    #[tokio::test]
    async fn test_animate_rejects_malformed_payload() {
        let bad = PathData {
            coordinates: vec![vec![Point { x: 0.0, y: 0.0 }], vec![]],
            colours: vec![Rgb {
                r: 0.0,
                g: 0.0,
                b: 0.0,
            }],
        };

        let mut sink = SvgSink::new();
        let result = animate(bad, Config::default(), 1000, &mut sink).await;
        assert!(result.is_err());
    }
}
