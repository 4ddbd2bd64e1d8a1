//! Storage engine implementation
//!
//! File layout:
//! - `db.sketch`: data file with SKCH header + record frames
//!
//! The data file is an append-only log: an upsert appends a fresh frame
//! and a delete appends a tombstone, so the last frame for a key wins.
//! The live index is rebuilt by replaying the log on open. Reads go
//! through a lazily created memory map that is refreshed whenever
//! appends outgrow it.

use std::collections::{BTreeMap, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use ahash::RandomState;
use memmap2::Mmap;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::parser::{
    create_header, encode_record, parse_header, parse_record, HEADER_LEN, SKETCH_MAGIC,
};

/// Maximum payload size (8 MB)
const MAX_VALUE_SIZE: usize = 8 * 1024 * 1024;

/// Maximum database size (1 GB)
const MAX_DB_SIZE: u64 = 1024 * 1024 * 1024;

/// Location of a live record frame in the data file
#[derive(Debug, Clone, Copy)]
struct RecordLocation {
    offset: u64,
    len: u32,
    timestamp: i64,
}

/// A record read back from the store
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Write timestamp, Unix ms
    pub timestamp: i64,
    /// Payload bytes
    pub value: Vec<u8>,
}

/// Data file handle plus its read map
struct DataFile {
    file: File,
    /// Read map over the data file; `None` until first read or after `clear`
    map: Option<Mmap>,
    size: u64,
}

impl DataFile {
    /// Bytes at `offset..offset + len`, remapping if appends outgrew the map
    fn read_at(&mut self, offset: u64, len: u32) -> Result<&[u8]> {
        let end = offset + u64::from(len);
        let stale = self.map.as_ref().map_or(true, |m| (m.len() as u64) < end);
        if stale {
            // Safety: all writes append behind the data lock, so the
            // remapped view always covers previously indexed frames.
            self.map = Some(unsafe { Mmap::map(&self.file)? });
        }
        match self.map.as_ref() {
            Some(map) if end <= map.len() as u64 => Ok(&map[offset as usize..end as usize]),
            _ => Err(Error::Parse(
                "Record extends past end of data file".to_string(),
            )),
        }
    }
}

/// In-memory view of the live records
#[derive(Default)]
struct StoreIndex {
    /// Primary index: key -> frame location
    primary: HashMap<String, RecordLocation, RandomState>,

    /// Secondary non-unique index: write timestamp -> keys
    by_timestamp: BTreeMap<i64, Vec<String>>,
}

impl StoreIndex {
    fn insert(&mut self, key: String, loc: RecordLocation) {
        if let Some(old) = self.primary.insert(key.clone(), loc) {
            self.remove_timestamp(old.timestamp, &key);
        }
        self.by_timestamp.entry(loc.timestamp).or_default().push(key);
    }

    fn remove(&mut self, key: &str) -> Option<RecordLocation> {
        let loc = self.primary.remove(key)?;
        self.remove_timestamp(loc.timestamp, key);
        Some(loc)
    }

    fn remove_timestamp(&mut self, timestamp: i64, key: &str) {
        if let Some(keys) = self.by_timestamp.get_mut(&timestamp) {
            keys.retain(|k| k != key);
            if keys.is_empty() {
                self.by_timestamp.remove(&timestamp);
            }
        }
    }

    fn clear(&mut self) {
        self.primary.clear();
        self.by_timestamp.clear();
    }
}

/// SketchStore is the main store handle
pub struct SketchStore {
    /// Data file handle and read map
    data: Arc<RwLock<DataFile>>,

    /// Live record indexes
    index: Arc<RwLock<StoreIndex>>,

    /// Is the store closed?
    closed: Arc<RwLock<bool>>,
}

impl SketchStore {
    /// Open or create a store at the given directory path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        let data_path = path.join("db.sketch");

        let (file, size, index) = if data_path.exists() {
            Self::open_existing(&data_path)?
        } else {
            Self::create_new(&data_path)?
        };

        Ok(SketchStore {
            data: Arc::new(RwLock::new(DataFile {
                file,
                map: None,
                size,
            })),
            index: Arc::new(RwLock::new(index)),
            closed: Arc::new(RwLock::new(false)),
        })
    }

    fn create_new(data_path: &Path) -> Result<(File, u64, StoreIndex)> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(data_path)?;

        let header = create_header(1, 0);
        file.write_all(&header)?;

        Ok((file, header.len() as u64, StoreIndex::default()))
    }

    fn open_existing(data_path: &Path) -> Result<(File, u64, StoreIndex)> {
        let mut file = OpenOptions::new().read(true).write(true).open(data_path)?;

        let size = file.seek(SeekFrom::End(0))?;
        if size < HEADER_LEN as u64 {
            return Err(Error::Parse("Data file too short for header".to_string()));
        }

        // Safety: replay happens before the handle is shared; nothing
        // can write to the file while the map is alive.
        let map = unsafe { Mmap::map(&file)? };
        parse_header(&map[..HEADER_LEN])?;

        let mut index = StoreIndex::default();
        let mut offset = HEADER_LEN as u64;
        let mut live_end = offset;

        while offset < size {
            match parse_record(&map[offset as usize..]) {
                Ok((rest, record)) => {
                    let frame_len = (size - offset) as usize - rest.len();
                    let key = String::from_utf8(record.key.to_vec())
                        .map_err(|_| Error::Parse("Record key is not valid UTF-8".to_string()))?;

                    if record.tombstone {
                        index.remove(&key);
                    } else {
                        index.insert(
                            key,
                            RecordLocation {
                                offset,
                                len: frame_len as u32,
                                timestamp: record.timestamp,
                            },
                        );
                    }

                    offset += frame_len as u64;
                    live_end = offset;
                }
                Err(nom::Err::Incomplete(_)) => {
                    // Torn tail from an interrupted write; drop it below
                    break;
                }
                Err(_) => return Err(Error::Parse("Corrupt record frame".to_string())),
            }
        }

        if live_end < size {
            drop(map);
            file.set_len(live_end)?;
            file.seek(SeekFrom::End(0))?;
        }

        Ok((file, live_end, index))
    }

    /// Upsert a record; the previous frame for the key becomes garbage
    pub fn put(&self, key: &str, timestamp: i64, value: &[u8]) -> Result<()> {
        if *self.closed.read() {
            return Err(Error::Closed);
        }

        if value.len() > MAX_VALUE_SIZE {
            return Err(Error::ValueTooLarge(value.len()));
        }

        if key.len() > u16::MAX as usize {
            return Err(Error::KeyTooLarge(key.len()));
        }

        let frame = encode_record(key.as_bytes(), timestamp, false, value);

        let mut index = self.index.write();
        let mut data = self.data.write();

        if data.size + frame.len() as u64 > MAX_DB_SIZE {
            return Err(Error::DatabaseFull(data.size));
        }

        let offset = data.file.seek(SeekFrom::End(0))?;
        data.file.write_all(&frame)?;
        data.size = offset + frame.len() as u64;

        index.insert(
            key.to_string(),
            RecordLocation {
                offset,
                len: frame.len() as u32,
                timestamp,
            },
        );

        Ok(())
    }

    /// Get the live record for a key, if any
    pub fn get(&self, key: &str) -> Result<Option<Record>> {
        if *self.closed.read() {
            return Err(Error::Closed);
        }

        let loc = match self.index.read().primary.get(key) {
            Some(loc) => *loc,
            None => return Ok(None),
        };

        let mut data = self.data.write();
        let bytes = data.read_at(loc.offset, loc.len)?;
        let (_, raw) =
            parse_record(bytes).map_err(|_| Error::Parse("Corrupt record frame".to_string()))?;

        Ok(Some(Record {
            timestamp: raw.timestamp,
            value: raw.value.to_vec(),
        }))
    }

    /// Delete the record for a key; absent keys are a no-op
    pub fn delete(&self, key: &str) -> Result<bool> {
        if *self.closed.read() {
            return Err(Error::Closed);
        }

        let mut index = self.index.write();

        let loc = match index.primary.get(key) {
            Some(loc) => *loc,
            None => return Ok(false),
        };

        let frame = encode_record(key.as_bytes(), loc.timestamp, true, &[]);

        let mut data = self.data.write();
        if data.size + frame.len() as u64 > MAX_DB_SIZE {
            return Err(Error::DatabaseFull(data.size));
        }

        let offset = data.file.seek(SeekFrom::End(0))?;
        data.file.write_all(&frame)?;
        data.size = offset + frame.len() as u64;

        index.remove(key);

        Ok(true)
    }

    /// Snapshot of `(key, write timestamp)` for every live record
    pub fn timestamps(&self) -> Result<Vec<(String, i64)>> {
        if *self.closed.read() {
            return Err(Error::Closed);
        }

        let index = self.index.read();
        Ok(index
            .primary
            .iter()
            .map(|(key, loc)| (key.clone(), loc.timestamp))
            .collect())
    }

    /// Keys of live records written strictly before `cutoff` (Unix ms),
    /// served from the timestamp index
    pub fn keys_older_than(&self, cutoff: i64) -> Result<Vec<String>> {
        if *self.closed.read() {
            return Err(Error::Closed);
        }

        let index = self.index.read();
        Ok(index
            .by_timestamp
            .range(..cutoff)
            .flat_map(|(_, keys)| keys.iter().cloned())
            .collect())
    }

    /// Get the number of live records
    pub fn len(&self) -> usize {
        self.index.read().primary.len()
    }

    /// Check if the store has no live records
    pub fn is_empty(&self) -> bool {
        self.index.read().primary.is_empty()
    }

    /// Drop every record and reset the data file to an empty log
    pub fn clear(&self) -> Result<()> {
        if *self.closed.read() {
            return Err(Error::Closed);
        }

        let mut index = self.index.write();
        let mut data = self.data.write();

        // The map must be dropped before the file shrinks under it
        data.map = None;
        data.file.set_len(HEADER_LEN as u64)?;
        data.file.seek(SeekFrom::Start(0))?;
        data.file.write_all(&create_header(1, 0))?;
        data.size = HEADER_LEN as u64;

        index.clear();

        Ok(())
    }

    /// Close the store and fsync all changes
    pub fn close(&mut self) -> Result<()> {
        if *self.closed.read() {
            return Ok(());
        }

        // Refresh the live record count in the header
        let record_count = self.index.read().primary.len() as u32;

        let mut data = self.data.write();
        data.file
            .seek(SeekFrom::Start(SKETCH_MAGIC.len() as u64 + 4))?;
        data.file.write_all(&record_count.to_le_bytes())?;
        data.file.sync_all()?;

        *self.closed.write() = true;

        Ok(())
    }
}

impl Drop for SketchStore {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_and_open() {
        let dir = TempDir::new().unwrap();
        let mut store = SketchStore::open(dir.path()).unwrap();

        assert_eq!(store.len(), 0);
        assert!(store.is_empty());

        store.close().unwrap();

        // Reopen
        let store = SketchStore::open(dir.path()).unwrap();
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_put_and_get() {
        let dir = TempDir::new().unwrap();
        let mut store = SketchStore::open(dir.path()).unwrap();

        store.put("cat.png", 1000, b"payload").unwrap();
        assert_eq!(store.len(), 1);

        let record = store.get("cat.png").unwrap().unwrap();
        assert_eq!(record.timestamp, 1000);
        assert_eq!(record.value, b"payload");

        store.close().unwrap();
    }

    #[test]
    fn test_get_absent() {
        let dir = TempDir::new().unwrap();
        let store = SketchStore::open(dir.path()).unwrap();

        assert!(store.get("missing.png").unwrap().is_none());
    }

    #[test]
    fn test_put_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = SketchStore::open(dir.path()).unwrap();

        store.put("cat.png", 1000, b"old").unwrap();
        store.put("cat.png", 2000, b"new").unwrap();

        assert_eq!(store.len(), 1);
        let record = store.get("cat.png").unwrap().unwrap();
        assert_eq!(record.timestamp, 2000);
        assert_eq!(record.value, b"new");
    }

    #[test]
    fn test_delete() {
        let dir = TempDir::new().unwrap();
        let store = SketchStore::open(dir.path()).unwrap();

        store.put("cat.png", 1000, b"payload").unwrap();
        assert!(store.delete("cat.png").unwrap());
        assert!(store.get("cat.png").unwrap().is_none());
        assert_eq!(store.len(), 0);

        // Absent key is a no-op, not an error
        assert!(!store.delete("cat.png").unwrap());
    }

    #[test]
    fn test_persistence() {
        let dir = TempDir::new().unwrap();

        {
            let mut store = SketchStore::open(dir.path()).unwrap();
            store.put("cat.png", 1000, b"cat payload").unwrap();
            store.put("dog.png", 2000, b"dog payload").unwrap();
            store.close().unwrap();
        }

        {
            let store = SketchStore::open(dir.path()).unwrap();
            assert_eq!(store.len(), 2);
            assert_eq!(store.get("cat.png").unwrap().unwrap().value, b"cat payload");
            assert_eq!(store.get("dog.png").unwrap().unwrap().timestamp, 2000);
        }
    }

    #[test]
    fn test_tombstone_survives_reopen() {
        let dir = TempDir::new().unwrap();

        {
            let mut store = SketchStore::open(dir.path()).unwrap();
            store.put("cat.png", 1000, b"payload").unwrap();
            store.delete("cat.png").unwrap();
            store.close().unwrap();
        }

        {
            let store = SketchStore::open(dir.path()).unwrap();
            assert!(store.get("cat.png").unwrap().is_none());
            assert_eq!(store.len(), 0);
        }
    }

    #[test]
    fn test_last_write_wins_across_reopen() {
        let dir = TempDir::new().unwrap();

        {
            let mut store = SketchStore::open(dir.path()).unwrap();
            store.put("cat.png", 1000, b"old").unwrap();
            store.put("cat.png", 2000, b"new").unwrap();
            store.close().unwrap();
        }

        {
            let store = SketchStore::open(dir.path()).unwrap();
            assert_eq!(store.len(), 1);
            assert_eq!(store.get("cat.png").unwrap().unwrap().value, b"new");
        }
    }

    #[test]
    fn test_torn_tail_is_truncated() {
        let dir = TempDir::new().unwrap();

        {
            let mut store = SketchStore::open(dir.path()).unwrap();
            store.put("cat.png", 1000, b"payload").unwrap();
            store.close().unwrap();
        }

        // Simulate a torn write by appending half a frame
        let data_path = dir.path().join("db.sketch");
        let mut file = OpenOptions::new().append(true).open(&data_path).unwrap();
        let frame = encode_record(b"dog.png", 2000, false, b"dog payload");
        file.write_all(&frame[..frame.len() / 2]).unwrap();
        drop(file);

        let store = SketchStore::open(dir.path()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("cat.png").unwrap().unwrap().value, b"payload");
        assert!(store.get("dog.png").unwrap().is_none());
    }

    #[test]
    fn test_timestamps_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = SketchStore::open(dir.path()).unwrap();

        store.put("a.png", 100, b"a").unwrap();
        store.put("b.png", 200, b"b").unwrap();

        let mut stamps = store.timestamps().unwrap();
        stamps.sort();
        assert_eq!(
            stamps,
            vec![("a.png".to_string(), 100), ("b.png".to_string(), 200)]
        );
    }

    #[test]
    fn test_keys_older_than() {
        let dir = TempDir::new().unwrap();
        let store = SketchStore::open(dir.path()).unwrap();

        store.put("old.png", 100, b"old").unwrap();
        store.put("edge.png", 200, b"edge").unwrap();
        store.put("new.png", 300, b"new").unwrap();

        // Cutoff is exclusive
        let mut keys = store.keys_older_than(200).unwrap();
        keys.sort();
        assert_eq!(keys, vec!["old.png".to_string()]);

        let mut keys = store.keys_older_than(301).unwrap();
        keys.sort();
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn test_older_than_tracks_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = SketchStore::open(dir.path()).unwrap();

        store.put("cat.png", 100, b"old").unwrap();
        store.put("cat.png", 500, b"new").unwrap();

        // The stale timestamp must not linger in the secondary index
        assert!(store.keys_older_than(200).unwrap().is_empty());
        assert_eq!(store.keys_older_than(501).unwrap().len(), 1);
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();

        {
            let store = SketchStore::open(dir.path()).unwrap();
            store.put("cat.png", 1000, b"payload").unwrap();
            store.clear().unwrap();

            assert!(store.is_empty());
            assert!(store.get("cat.png").unwrap().is_none());

            // The cleared store is still writable
            store.put("dog.png", 2000, b"dog").unwrap();
            assert_eq!(store.len(), 1);
        }

        let store = SketchStore::open(dir.path()).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_value_too_large() {
        let dir = TempDir::new().unwrap();
        let store = SketchStore::open(dir.path()).unwrap();

        let large = vec![b'x'; MAX_VALUE_SIZE + 1];
        let result = store.put("cat.png", 1000, &large);
        assert!(matches!(result, Err(Error::ValueTooLarge(_))));
    }

    #[test]
    fn test_close_twice() {
        let dir = TempDir::new().unwrap();
        let mut store = SketchStore::open(dir.path()).unwrap();

        store.close().unwrap();
        store.close().unwrap(); // Should not error
    }

    #[test]
    fn test_put_after_close() {
        let dir = TempDir::new().unwrap();
        let mut store = SketchStore::open(dir.path()).unwrap();

        store.close().unwrap();

        let result = store.put("cat.png", 1000, b"payload");
        assert!(matches!(result, Err(Error::Closed)));
    }
}
