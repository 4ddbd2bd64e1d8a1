//! Progressive drawing CLI
//!
//! Resolves a stored line-art drawing from the local cache (or a path
//! data source on miss), animates it stroke-then-fill, and writes the
//! result as an SVG document. Also exposes the cache maintenance
//! surface: stats, expiry sweep, clear, delete.

mod orchestrator;
mod source;
mod svg;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sketchanim::Config;
use sketchcache::DrawingCache;
use tracing::info;

use crate::orchestrator::{animate, resolve_payload};
use crate::source::{DirSource, PathSource};
use crate::svg::SvgSink;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Cache directory
    #[arg(short, long, default_value = "./image-cache")]
    data: PathBuf,

    /// Cache expiry window in hours
    #[arg(long, default_value_t = 24)]
    expiry_hours: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Draw an image progressively and write the result as SVG
    Draw {
        /// Image id, e.g. `cat.png`
        image: String,

        /// Directory holding `<image>.json` path-data documents
        #[arg(short, long, default_value = "./drawings")]
        source: PathBuf,

        /// Output SVG file; defaults to `<image stem>.svg`
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Animation frame rate
        #[arg(long, default_value_t = 60)]
        fps: u32,

        /// Path points consumed per frame
        #[arg(long, default_value_t = 10)]
        points_per_tick: usize,

        /// Margin around the drawing's bounding box
        #[arg(long, default_value_t = 80.0)]
        padding: f64,

        /// Bypass the cache entirely
        #[arg(long)]
        no_cache: bool,
    },

    /// Print cache entry counts
    Stats,

    /// Evict entries past the expiry window
    ClearExpired,

    /// Empty the cache
    Clear,

    /// Delete one cached image
    Delete {
        /// Image id to delete
        image: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let expiry = Duration::from_secs(args.expiry_hours * 60 * 60);
    let cache = DrawingCache::new(&args.data, expiry);

    match args.command {
        Command::Draw {
            image,
            source,
            out,
            fps,
            points_per_tick,
            padding,
            no_cache,
        } => {
            let source = DirSource::new(source);
            let data = if no_cache {
                source.fetch(&image)?
            } else {
                resolve_payload(&cache, &source, &image)?
            };

            let config = Config {
                points_per_tick,
                padding,
            };
            let mut sink = SvgSink::new();
            let outcome = animate(data, config, fps, &mut sink).await?;

            let out = out.unwrap_or_else(|| PathBuf::from(format!("{}.svg", stem(&image))));
            std::fs::write(&out, sink.to_document())
                .with_context(|| format!("writing {}", out.display()))?;
            let label = if sink.is_complete() {
                "drawing written"
            } else {
                "partial drawing written"
            };
            info!(out = %out.display(), ?outcome, "{}", label);
        }
        Command::Stats => {
            let stats = cache.stats()?;
            println!("Total entries:   {}", stats.total_entries);
            println!("Expired entries: {}", stats.expired_entries);
            println!("Valid entries:   {}", stats.valid_entries);
        }
        Command::ClearExpired => {
            let evicted = cache.clear_expired()?;
            println!("Evicted {} expired entries", evicted);
        }
        Command::Clear => {
            cache.clear()?;
            println!("Cache cleared");
        }
        Command::Delete { image } => {
            if cache.delete(&image)? {
                println!("Deleted {}", image);
            } else {
                println!("No cache entry for {}", image);
            }
        }
    }

    Ok(())
}

fn stem(image: &str) -> &str {
    image.split('.').next().unwrap_or(image)
}
