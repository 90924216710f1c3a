//! Segment - One Store/Index Pair
//!
//! A segment ties one [`Store`] and one [`Index`] together under a shared
//! base offset and is the unit the log rolls, closes, and removes. It owns
//! offset assignment: every append stamps the record with the segment's next
//! offset, writes the encoded frame to the store, and records the
//! (relative offset, position) pair in the index.
//!
//! ## Files
//!
//! A segment with base offset `n` lives in two files in the log directory:
//! `n.store` and `n.index`. Reopening a directory reconstructs each segment
//! from that pair; `next_offset` is seeded from the index's last entry.
//!
//! ## Locking
//!
//! The index and `next_offset` sit behind one `RwLock`: appends take it
//! exclusively (offset assignment must be serialized), reads share it. Store
//! access is serialized by the store's own mutex underneath.

use std::fs;
use std::path::Path;

use bytes::Bytes;
use parking_lot::RwLock;
use streamlog_core::{codec, Record};

use crate::config::SegmentConfig;
use crate::error::{Error, Result};
use crate::index::Index;
use crate::store::Store;

/// A contiguous range of the offset space, backed by a store/index pair
pub struct Segment {
    base_offset: u64,
    store: Store,
    inner: RwLock<SegmentInner>,
    config: SegmentConfig,
}

struct SegmentInner {
    index: Index,
    /// Offset the next append will receive
    next_offset: u64,
}

impl Segment {
    /// Open (or create) the segment with `base_offset` in `dir`
    pub fn open(dir: impl AsRef<Path>, base_offset: u64, config: &SegmentConfig) -> Result<Self> {
        let dir = dir.as_ref();

        let store = Store::open(dir.join(format!("{base_offset}.store")))?;
        let index = Index::open(
            dir.join(format!("{base_offset}.index")),
            config.max_index_bytes,
        )?;

        // An existing index tells us where appends left off; a fresh one
        // starts the segment at its base.
        let next_offset = match index.read_last() {
            Ok(entry) => base_offset + u64::from(entry.rel_offset) + 1,
            Err(Error::Eof) => base_offset,
            Err(e) => return Err(e),
        };

        tracing::debug!(base_offset, next_offset, "opened segment");

        Ok(Self {
            base_offset,
            store,
            inner: RwLock::new(SegmentInner { index, next_offset }),
            config: config.clone(),
        })
    }

    /// Append a record, assigning it this segment's next offset
    pub fn append(&self, mut record: Record) -> Result<u64> {
        let mut inner = self.inner.write();

        let offset = inner.next_offset;
        record.offset = offset;

        let encoded = codec::encode(&record);
        let (_, position) = self.store.append(&encoded)?;

        let rel_offset = (offset - self.base_offset) as u32;
        inner.index.write(rel_offset, position)?;

        inner.next_offset += 1;
        Ok(offset)
    }

    /// Read the record at the absolute `offset`
    pub fn read(&self, offset: u64) -> Result<Record> {
        let inner = self.inner.read();

        let rel_offset = offset
            .checked_sub(self.base_offset)
            .and_then(|rel| u32::try_from(rel).ok())
            .ok_or(Error::OffsetOutOfRange(offset))?;

        let entry = match inner.index.read(rel_offset) {
            Ok(entry) => entry,
            Err(Error::Eof) => return Err(Error::OffsetOutOfRange(offset)),
            Err(e) => return Err(e),
        };

        let payload = self.store.read(entry.position)?;
        let record = codec::decode(Bytes::from(payload))?;
        Ok(record)
    }

    /// Whether the store or index has reached its configured capacity
    ///
    /// A maxed segment stays readable; the log stops appending to it and
    /// rolls a new one.
    pub fn is_maxed(&self) -> bool {
        let inner = self.inner.read();
        self.store.size() >= self.config.max_store_bytes
            || inner.index.size() >= self.config.max_index_bytes
    }

    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Offset the next append to this segment would receive
    pub fn next_offset(&self) -> u64 {
        self.inner.read().next_offset
    }

    /// Close both files
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.write();
        self.close_locked(&mut inner)
    }

    /// Close both files and delete them from disk
    pub fn remove(&self) -> Result<()> {
        let mut inner = self.inner.write();
        self.close_locked(&mut inner)?;

        fs::remove_file(inner.index.path())?;
        fs::remove_file(self.store.path())?;
        Ok(())
    }

    fn close_locked(&self, inner: &mut SegmentInner) -> Result<()> {
        inner.index.close()?;
        self.store.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ENT_WIDTH;
    use crate::store::LEN_WIDTH;
    use tempfile::TempDir;

    fn test_config() -> SegmentConfig {
        SegmentConfig {
            max_store_bytes: 1024,
            max_index_bytes: 3 * ENT_WIDTH,
            initial_offset: 0,
        }
    }

    fn record() -> Record {
        Record::new(Bytes::from("hello world"))
    }

    // ---------------------------------------------------------------
    // Append / read
    // ---------------------------------------------------------------

    #[test]
    fn test_append_assigns_sequential_offsets() {
        let dir = TempDir::new().unwrap();
        let segment = Segment::open(dir.path(), 16, &test_config()).unwrap();

        assert_eq!(segment.next_offset(), 16);

        for want in 16..19u64 {
            let offset = segment.append(record()).unwrap();
            assert_eq!(offset, want);

            let got = segment.read(offset).unwrap();
            assert_eq!(got.offset, want);
            assert_eq!(got.value, record().value);
        }
    }

    #[test]
    fn test_append_overwrites_caller_offset() {
        let dir = TempDir::new().unwrap();
        let segment = Segment::open(dir.path(), 0, &test_config()).unwrap();

        let offset = segment
            .append(Record::with_offset(Bytes::from("x"), 999))
            .unwrap();
        assert_eq!(offset, 0);
        assert_eq!(segment.read(0).unwrap().offset, 0);
    }

    #[test]
    fn test_read_below_base_or_past_end() {
        let dir = TempDir::new().unwrap();
        let segment = Segment::open(dir.path(), 16, &test_config()).unwrap();
        segment.append(record()).unwrap();

        assert!(matches!(
            segment.read(3),
            Err(Error::OffsetOutOfRange(3))
        ));
        assert!(matches!(
            segment.read(17),
            Err(Error::OffsetOutOfRange(17))
        ));
    }

    // ---------------------------------------------------------------
    // Maxing out
    // ---------------------------------------------------------------

    #[test]
    fn test_maxed_by_index() {
        let dir = TempDir::new().unwrap();
        let segment = Segment::open(dir.path(), 0, &test_config()).unwrap();

        for _ in 0..3 {
            assert!(!segment.is_maxed());
            segment.append(record()).unwrap();
        }
        assert!(segment.is_maxed());
    }

    #[test]
    fn test_maxed_by_store() {
        let dir = TempDir::new().unwrap();
        let value = Bytes::from("hello world");
        let frame = codec::encoded_len(&Record::with_offset(value.clone(), 0)) as u64 + LEN_WIDTH;

        let config = SegmentConfig {
            max_store_bytes: 2 * frame,
            max_index_bytes: 1024,
            initial_offset: 0,
        };
        let segment = Segment::open(dir.path(), 0, &config).unwrap();

        segment.append(Record::new(value.clone())).unwrap();
        assert!(!segment.is_maxed());
        segment.append(Record::new(value)).unwrap();
        assert!(segment.is_maxed());
    }

    // ---------------------------------------------------------------
    // Reopen / remove
    // ---------------------------------------------------------------

    #[test]
    fn test_reopen_seeds_next_offset() {
        let dir = TempDir::new().unwrap();
        let config = test_config();

        let segment = Segment::open(dir.path(), 16, &config).unwrap();
        for _ in 0..3 {
            segment.append(record()).unwrap();
        }
        segment.close().unwrap();

        let segment = Segment::open(dir.path(), 16, &config).unwrap();
        assert_eq!(segment.next_offset(), 19);
        assert_eq!(segment.read(17).unwrap().value, record().value);
    }

    #[test]
    fn test_remove_deletes_both_files() {
        let dir = TempDir::new().unwrap();
        let segment = Segment::open(dir.path(), 0, &test_config()).unwrap();
        segment.append(record()).unwrap();

        segment.remove().unwrap();

        assert!(!dir.path().join("0.store").exists());
        assert!(!dir.path().join("0.index").exists());
    }
}
