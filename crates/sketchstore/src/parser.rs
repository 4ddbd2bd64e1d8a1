//! Record framing for the sketch data file, parsed with nom
//!
//! File format:
//! ```text
//! SKCH001\n
//! [version: u32 LE]
//! [record_count: u32 LE]
//! ...record frames...
//! ```
//!
//! Record frame:
//! ```text
//! [key_len: u16 LE][key: UTF-8 bytes]
//! [timestamp: i64 LE, Unix ms]
//! [flags: u8, bit 0 = tombstone]
//! [value_len: u32 LE][value bytes]
//! ```
//!
//! Frames are parsed with streaming combinators so that a truncated
//! trailing frame (a torn write) surfaces as `Incomplete` rather than
//! being mistaken for corruption.

use nom::{
    bytes::streaming::take,
    number::streaming::{le_i64, le_u16, le_u32, u8 as any_u8},
    IResult,
};

use crate::error::{Error, Result};

/// Magic header for sketch data files
pub const SKETCH_MAGIC: &[u8] = b"SKCH001\n";

/// Total header length: magic + version + record_count
pub const HEADER_LEN: usize = SKETCH_MAGIC.len() + 8;

/// Flags bit marking a deletion record
pub const FLAG_TOMBSTONE: u8 = 0b0000_0001;

/// Sketch data file header
#[derive(Debug, Clone, PartialEq)]
pub struct SketchHeader {
    /// File format version
    pub version: u32,
    /// Number of live records at last clean close
    pub record_count: u32,
}

/// Parse the sketch data file header
pub fn parse_header(input: &[u8]) -> Result<SketchHeader> {
    if input.len() < HEADER_LEN {
        return Err(Error::Parse("Input too short for header".to_string()));
    }

    if &input[0..SKETCH_MAGIC.len()] != SKETCH_MAGIC {
        return Err(Error::Parse("Invalid sketch magic header".to_string()));
    }

    let version_bytes = &input[SKETCH_MAGIC.len()..SKETCH_MAGIC.len() + 4];
    let count_bytes = &input[SKETCH_MAGIC.len() + 4..SKETCH_MAGIC.len() + 8];

    let version = u32::from_le_bytes([
        version_bytes[0],
        version_bytes[1],
        version_bytes[2],
        version_bytes[3],
    ]);

    let record_count =
        u32::from_le_bytes([count_bytes[0], count_bytes[1], count_bytes[2], count_bytes[3]]);

    Ok(SketchHeader {
        version,
        record_count,
    })
}

/// Create a sketch data file header
pub fn create_header(version: u32, record_count: u32) -> Vec<u8> {
    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(SKETCH_MAGIC);
    header.extend_from_slice(&version.to_le_bytes());
    header.extend_from_slice(&record_count.to_le_bytes());
    header
}

/// A record frame borrowed from the data file
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord<'a> {
    /// Record key bytes (UTF-8)
    pub key: &'a [u8],
    /// Write timestamp, Unix ms
    pub timestamp: i64,
    /// Deletion marker
    pub tombstone: bool,
    /// Payload bytes (empty for tombstones)
    pub value: &'a [u8],
}

/// Parse a single record frame
pub fn parse_record(input: &[u8]) -> IResult<&[u8], RawRecord<'_>> {
    let (input, key_len) = le_u16(input)?;
    let (input, key) = take(key_len)(input)?;
    let (input, timestamp) = le_i64(input)?;
    let (input, flags) = any_u8(input)?;
    let (input, value_len) = le_u32(input)?;
    let (input, value) = take(value_len)(input)?;

    Ok((
        input,
        RawRecord {
            key,
            timestamp,
            tombstone: flags & FLAG_TOMBSTONE != 0,
            value,
        },
    ))
}

/// Encode a record frame
pub fn encode_record(key: &[u8], timestamp: i64, tombstone: bool, value: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(2 + key.len() + 8 + 1 + 4 + value.len());
    frame.extend_from_slice(&(key.len() as u16).to_le_bytes());
    frame.extend_from_slice(key);
    frame.extend_from_slice(&timestamp.to_le_bytes());
    frame.push(if tombstone { FLAG_TOMBSTONE } else { 0 });
    frame.extend_from_slice(&(value.len() as u32).to_le_bytes());
    frame.extend_from_slice(value);
    frame
}
