//! Index - Memory-Mapped Offset Table
//!
//! The index is the lookup half of a segment: a table of fixed-width entries
//! mapping a record's offset (relative to the segment's base) to the byte
//! position of its frame in the store file.
//!
//! ## Entry Format
//!
//! ```text
//! ┌──────────────────┬──────────────────┐
//! │ rel offset (4B)  │ position (8B)    │  big-endian, no header, no padding
//! └──────────────────┴──────────────────┘
//! ```
//!
//! ## Memory-mapping protocol
//!
//! 1. On open, stat the file: its current length is the bytes of valid
//!    entries written before the last close.
//! 2. Grow the file to `max_index_bytes` - the full future capacity - so the
//!    extents are allocated once and the mapping never has to be resized.
//! 3. Map the whole file read-write, shared. Writes dirty pages that the OS
//!    flushes; reads are served from the page cache with no syscalls.
//! 4. On close, msync the mapping, fsync the file, then truncate it back to
//!    `size` so the file on disk holds exactly the valid entries.
//!
//! Entries are tiny, numerous, and random-access on read, which is what the
//! mapping is for; the store keeps buffered sequential writes instead. The
//! two sides are deliberately different and must stay that way.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use crate::error::{Error, Result};
use crate::store::FILE_MODE;

/// Width of the relative-offset column
const OFF_WIDTH: usize = 4;
/// Width of the store-position column
const POS_WIDTH: usize = 8;
/// Width of one index entry
pub const ENT_WIDTH: u64 = (OFF_WIDTH + POS_WIDTH) as u64;

/// One decoded index entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    /// Record offset relative to the segment's base offset
    pub rel_offset: u32,
    /// Byte position of the record's frame in the store file
    pub position: u64,
}

/// Memory-mapped table of offset-to-position entries
pub struct Index {
    path: PathBuf,
    /// Taken on close; any later operation observes `Closed`
    map: Option<Mapping>,
    /// Bytes of valid entries; always a multiple of `ENT_WIDTH`
    size: u64,
}

struct Mapping {
    file: File,
    mmap: MmapMut,
}

impl Index {
    /// Open (or create) the index file at `path`, growing it to
    /// `max_index_bytes` and mapping it read-write
    pub fn open(path: impl AsRef<Path>, max_index_bytes: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .mode(FILE_MODE)
            .open(&path)?;

        // Valid entries end here; everything past it is capacity.
        let size = file.metadata()?.len();

        file.set_len(max_index_bytes)?;

        // SAFETY: the mapping is backed by a file this process just opened
        // and owns for the lifetime of the segment.
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        Ok(Self {
            path,
            map: Some(Mapping { file, mmap }),
            size,
        })
    }

    /// Append one entry
    ///
    /// Fails with [`Error::IndexFull`] when the mapping cannot take another
    /// entry; the owning segment is maxed at that point.
    pub fn write(&mut self, rel_offset: u32, position: u64) -> Result<()> {
        let map = self.map.as_mut().ok_or(Error::Closed)?;

        if self.size + ENT_WIDTH > map.mmap.len() as u64 {
            return Err(Error::IndexFull);
        }

        let at = self.size as usize;
        map.mmap[at..at + OFF_WIDTH].copy_from_slice(&rel_offset.to_be_bytes());
        map.mmap[at + OFF_WIDTH..at + OFF_WIDTH + POS_WIDTH]
            .copy_from_slice(&position.to_be_bytes());

        self.size += ENT_WIDTH;
        Ok(())
    }

    /// Read the entry for `rel_offset`
    ///
    /// Fails with [`Error::Eof`] when the entry lies past the end of the
    /// valid region.
    pub fn read(&self, rel_offset: u32) -> Result<Entry> {
        let map = self.map.as_ref().ok_or(Error::Closed)?;

        if self.size == 0 {
            return Err(Error::Eof);
        }

        let at = u64::from(rel_offset) * ENT_WIDTH;
        if at + ENT_WIDTH > self.size {
            return Err(Error::Eof);
        }

        let at = at as usize;
        let mut off_bytes = [0u8; OFF_WIDTH];
        off_bytes.copy_from_slice(&map.mmap[at..at + OFF_WIDTH]);
        let mut pos_bytes = [0u8; POS_WIDTH];
        pos_bytes.copy_from_slice(&map.mmap[at + OFF_WIDTH..at + OFF_WIDTH + POS_WIDTH]);

        Ok(Entry {
            rel_offset: u32::from_be_bytes(off_bytes),
            position: u64::from_be_bytes(pos_bytes),
        })
    }

    /// Read the last entry, if any
    pub fn read_last(&self) -> Result<Entry> {
        if self.map.is_none() {
            return Err(Error::Closed);
        }

        // An empty index has no last entry; checked here because the
        // entry-count arithmetic below underflows at size zero.
        if self.size == 0 {
            return Err(Error::Eof);
        }

        self.read((self.size / ENT_WIDTH - 1) as u32)
    }

    /// Bytes of valid entries
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Sync the mapping and file, then shrink the file to the valid region
    pub fn close(&mut self) -> Result<()> {
        let Mapping { file, mmap } = self.map.take().ok_or(Error::Closed)?;

        mmap.flush()?;
        file.sync_all()?;

        // Unmap before shrinking so no live mapping extends past EOF.
        drop(mmap);
        file.set_len(self.size)?;

        Ok(())
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MAX_INDEX_BYTES: u64 = 1024;

    fn temp_index(dir: &TempDir) -> Index {
        Index::open(dir.path().join("segment.index"), MAX_INDEX_BYTES).unwrap()
    }

    // ---------------------------------------------------------------
    // Empty index boundaries
    // ---------------------------------------------------------------

    #[test]
    fn test_empty_index_reads_fail() {
        let dir = TempDir::new().unwrap();
        let index = temp_index(&dir);

        assert!(matches!(index.read_last(), Err(Error::Eof)));
        assert!(matches!(index.read(0), Err(Error::Eof)));
    }

    // ---------------------------------------------------------------
    // Write / read
    // ---------------------------------------------------------------

    #[test]
    fn test_write_read_entries() {
        let dir = TempDir::new().unwrap();
        let mut index = temp_index(&dir);

        let entries = [
            Entry { rel_offset: 0, position: 0 },
            Entry { rel_offset: 1, position: 10 },
        ];

        for want in entries {
            index.write(want.rel_offset, want.position).unwrap();
            assert_eq!(index.read(want.rel_offset).unwrap(), want);
        }

        assert_eq!(index.read_last().unwrap(), entries[1]);

        // Read past the number of existing entries
        assert!(matches!(index.read(2), Err(Error::Eof)));
    }

    #[test]
    fn test_positions_strictly_increase() {
        let dir = TempDir::new().unwrap();
        let mut index = temp_index(&dir);

        for rel in 0..10u32 {
            index.write(rel, u64::from(rel) * 19).unwrap();
        }

        let mut last_position = None;
        for rel in 0..10u32 {
            let entry = index.read(rel).unwrap();
            assert_eq!(entry.rel_offset, rel);
            if let Some(last) = last_position {
                assert!(entry.position > last);
            }
            last_position = Some(entry.position);
        }
    }

    #[test]
    fn test_write_fails_when_full() {
        let dir = TempDir::new().unwrap();
        let mut index =
            Index::open(dir.path().join("tiny.index"), 3 * ENT_WIDTH).unwrap();

        for rel in 0..3u32 {
            index.write(rel, u64::from(rel)).unwrap();
        }

        assert!(matches!(index.write(3, 3), Err(Error::IndexFull)));
    }

    // ---------------------------------------------------------------
    // Close / reopen
    // ---------------------------------------------------------------

    #[test]
    fn test_close_truncates_to_valid_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trunc.index");

        let mut index = Index::open(&path, MAX_INDEX_BYTES).unwrap();
        index.write(0, 0).unwrap();
        index.write(1, 19).unwrap();

        // While open, the file is pre-grown to full capacity
        assert_eq!(std::fs::metadata(&path).unwrap().len(), MAX_INDEX_BYTES);

        index.close().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 2 * ENT_WIDTH);
    }

    #[test]
    fn test_reopen_recovers_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reopen.index");

        let mut index = Index::open(&path, MAX_INDEX_BYTES).unwrap();
        index.write(0, 0).unwrap();
        index.write(1, 19).unwrap();
        index.close().unwrap();

        let index = Index::open(&path, MAX_INDEX_BYTES).unwrap();
        let last = index.read_last().unwrap();
        assert_eq!(last, Entry { rel_offset: 1, position: 19 });
    }

    #[test]
    fn test_operations_after_close_fail() {
        let dir = TempDir::new().unwrap();
        let mut index = temp_index(&dir);

        index.write(0, 0).unwrap();
        index.close().unwrap();

        assert!(matches!(index.read(0), Err(Error::Closed)));
        assert!(matches!(index.write(1, 19), Err(Error::Closed)));
        assert!(matches!(index.close(), Err(Error::Closed)));
    }
}
