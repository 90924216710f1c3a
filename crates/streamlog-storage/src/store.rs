//! Store - Append-Only Record File
//!
//! The store is the byte half of a segment: an append-only file holding each
//! record's encoded payload behind an 8-byte big-endian length prefix.
//!
//! ## Frame Format
//!
//! ```text
//! ┌──────────┬──────────────────┐
//! │ len (8B) │ payload (len B)  │  repeated to end of file
//! └──────────┴──────────────────┘
//! ```
//!
//! ## Buffering and the flush contract
//!
//! Appends go through a `BufWriter` so small records coalesce into few
//! syscalls. The prefix and payload for one frame are written back to back
//! inside a single critical section with no flush in between, so a crash can
//! lose whole buffered frames but the file never gains a header-only frame
//! from this path. Every read flushes first; a reader can never observe a
//! byte image older than a completed append from the same process.
//!
//! ## Thread Safety
//!
//! One mutex serializes appends, reads, and close against each other.
//! Positional reads go through a second handle onto the same file, so the
//! writer's cursor is never disturbed.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::os::unix::fs::{FileExt, OpenOptionsExt};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Number of bytes used by the big-endian length prefix of each frame
pub const LEN_WIDTH: u64 = 8;

/// Mode for every file the log creates
pub(crate) const FILE_MODE: u32 = 0o644;

/// Append-only, length-prefix framed byte file
pub struct Store {
    path: PathBuf,
    inner: Mutex<Inner>,
}

struct Inner {
    /// Taken on close; any later operation observes `Closed`
    handle: Option<Handle>,
    /// Logical end of file in bytes, counting buffered frames
    size: u64,
}

struct Handle {
    writer: BufWriter<File>,
    /// Second handle onto the same file for positional reads
    reader: File,
}

impl Store {
    /// Open (or create) the store file at `path`, picking up the size of
    /// whatever frames it already holds
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .mode(FILE_MODE)
            .open(&path)?;

        let size = file.metadata()?.len();
        let reader = file.try_clone()?;

        Ok(Self {
            path,
            inner: Mutex::new(Inner {
                handle: Some(Handle {
                    writer: BufWriter::new(file),
                    reader,
                }),
                size,
            }),
        })
    }

    /// Append one length-prefixed frame
    ///
    /// Returns the total bytes this frame occupies and the byte position
    /// where it starts.
    pub fn append(&self, payload: &[u8]) -> Result<(u64, u64)> {
        let mut inner = self.inner.lock();
        let pos = inner.size;

        let Inner { handle, size } = &mut *inner;
        let handle = handle.as_mut().ok_or(Error::Closed)?;

        handle
            .writer
            .write_all(&(payload.len() as u64).to_be_bytes())?;
        handle.writer.write_all(payload)?;

        let written = LEN_WIDTH + payload.len() as u64;
        *size += written;

        Ok((written, pos))
    }

    /// Read the payload of the frame starting at `pos`
    pub fn read(&self, pos: u64) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();
        let handle = inner.handle.as_mut().ok_or(Error::Closed)?;
        handle.writer.flush()?;

        let mut len_buf = [0u8; LEN_WIDTH as usize];
        handle.reader.read_exact_at(&mut len_buf, pos)?;
        let len = u64::from_be_bytes(len_buf);

        let mut payload = vec![0u8; len as usize];
        handle.reader.read_exact_at(&mut payload, pos + LEN_WIDTH)?;

        Ok(payload)
    }

    /// Fill `buf` with raw store bytes starting at `offset`
    ///
    /// Raw access below the frame layer; reads whole-file byte images for
    /// callers that copy or verify the store directly.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let mut inner = self.inner.lock();
        let handle = inner.handle.as_mut().ok_or(Error::Closed)?;
        handle.writer.flush()?;

        handle.reader.read_exact_at(buf, offset)?;
        Ok(buf.len())
    }

    /// Logical size in bytes, including frames still sitting in the buffer
    pub fn size(&self) -> u64 {
        self.inner.lock().size
    }

    /// Flush buffered frames and sync the file to disk
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let handle = inner.handle.take().ok_or(Error::Closed)?;

        let mut writer = handle.writer;
        writer.flush()?;
        handle.reader.sync_all()?;

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

    const WRITE: &[u8] = b"hello world";
    // frame width: 8-byte prefix + 11-byte payload
    const WIDTH: u64 = LEN_WIDTH + WRITE.len() as u64;

    fn temp_store(dir: &TempDir) -> Store {
        Store::open(dir.path().join("append.store")).unwrap()
    }

    // ---------------------------------------------------------------
    // Append / read
    // ---------------------------------------------------------------

    #[test]
    fn test_append_read() {
        let dir = TempDir::new().unwrap();
        let store = temp_store(&dir);

        for i in 1..4u64 {
            let (n, pos) = store.append(WRITE).unwrap();
            assert_eq!(pos + n, WIDTH * i);
        }

        let mut pos = 0;
        for _ in 1..4 {
            let read = store.read(pos).unwrap();
            assert_eq!(read, WRITE);
            pos += WIDTH;
        }
    }

    #[test]
    fn test_read_at_raw_frames() {
        let dir = TempDir::new().unwrap();
        let store = temp_store(&dir);

        for _ in 1..4 {
            store.append(WRITE).unwrap();
        }

        let mut off = 0u64;
        for _ in 1..4 {
            let mut len_buf = [0u8; LEN_WIDTH as usize];
            let n = store.read_at(&mut len_buf, off).unwrap();
            assert_eq!(n, LEN_WIDTH as usize);
            off += n as u64;

            let size = u64::from_be_bytes(len_buf);
            let mut payload = vec![0u8; size as usize];
            let n = store.read_at(&mut payload, off).unwrap();
            assert_eq!(payload, WRITE);
            assert_eq!(n as u64, size);
            off += n as u64;
        }
    }

    #[test]
    fn test_reopen_recovers_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reopen.store");

        let store = Store::open(&path).unwrap();
        store.append(WRITE).unwrap();
        store.append(WRITE).unwrap();
        store.close().unwrap();

        let store = Store::open(&path).unwrap();
        assert_eq!(store.size(), 2 * WIDTH);
        assert_eq!(store.read(WIDTH).unwrap(), WRITE);
    }

    // ---------------------------------------------------------------
    // Buffering / close
    // ---------------------------------------------------------------

    #[test]
    fn test_close_flushes_buffered_frames() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("close.store");

        let store = Store::open(&path).unwrap();
        store.append(WRITE).unwrap();

        let before = std::fs::metadata(&path).unwrap().len();
        store.close().unwrap();
        let after = std::fs::metadata(&path).unwrap().len();

        assert!(after > before);
        assert_eq!(after, WIDTH);
    }

    #[test]
    fn test_operations_after_close_fail() {
        let dir = TempDir::new().unwrap();
        let store = temp_store(&dir);

        store.append(WRITE).unwrap();
        store.close().unwrap();

        assert!(matches!(store.append(WRITE), Err(Error::Closed)));
        assert!(matches!(store.read(0), Err(Error::Closed)));
        assert!(matches!(store.close(), Err(Error::Closed)));
        // Size is still reported for a closed store
        assert_eq!(store.size(), WIDTH);
    }

    #[test]
    fn test_read_past_end_is_io_error() {
        let dir = TempDir::new().unwrap();
        let store = temp_store(&dir);

        store.append(WRITE).unwrap();
        assert!(matches!(store.read(WIDTH * 10), Err(Error::Io(_))));
    }
}
