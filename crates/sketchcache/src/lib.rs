//! # sketchcache
//!
//! Time-bounded local cache for drawing payloads, keyed by image id.
//!
//! Entries expire a fixed window after their write timestamp. Expiry is
//! enforced lazily on read and eagerly via [`DrawingCache::clear_expired`];
//! callers own the scheduling. The backing [`sketchstore`] engine is
//! opened lazily on first use and persists across process restarts.

#![warn(missing_docs)]

mod cache;
mod error;
mod stats;

pub use cache::{CacheEntry, CacheStats, DrawingCache, DEFAULT_EXPIRY};
pub use error::{Error, Result};
pub use stats::CacheCounters;
