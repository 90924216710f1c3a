//! Log - Ordered Collection of Segments
//!
//! The log is the top of the storage engine: an ordered list of segments
//! covering a contiguous, gap-free offset space, with the last segment
//! active for appends.
//!
//! ## Data flow
//!
//! ```text
//! append(record) ──► active segment ──► store.append(frame)
//!                                  └──► index.write(rel, pos)
//!
//! read(offset)   ──► segment owning [base, next) ──► index.read(rel)
//!                                               └──► store.read(pos)
//! ```
//!
//! ## Roll-over
//!
//! After an append leaves the active segment maxed, the log installs a new
//! segment whose base offset is the maxed segment's next offset. Appends
//! normally run under the segment-list read lock; only installing the new
//! segment takes the write lock, and the roll is re-checked there so two
//! racing appenders cannot both roll.
//!
//! ## Startup
//!
//! Opening a directory scans it for `<base>.store` / `<base>.index` pairs,
//! opens each base offset once in ascending order, and creates a fresh
//! segment at `initial_offset` when the directory holds none.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use streamlog_core::Record;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::segment::Segment;

/// A durable, ordered sequence of records addressed by offset
pub struct Log {
    dir: PathBuf,
    config: Config,
    inner: RwLock<LogInner>,
}

struct LogInner {
    /// Ascending by base offset; the last segment is the active one
    segments: Vec<Arc<Segment>>,
}

impl LogInner {
    fn active(&self) -> Result<&Arc<Segment>> {
        self.segments.last().ok_or(Error::Closed)
    }

    /// Segment whose `[base_offset, next_offset)` range covers `offset`
    fn find(&self, offset: u64) -> Option<&Arc<Segment>> {
        let idx = self
            .segments
            .partition_point(|segment| segment.base_offset() <= offset);
        let segment = self.segments.get(idx.checked_sub(1)?)?;
        (offset < segment.next_offset()).then_some(segment)
    }
}

impl Log {
    /// Open the log in `dir`, recovering any segments already on disk
    pub fn open(dir: impl AsRef<Path>, config: Config) -> Result<Self> {
        // Every segment must accept at least one record, or rolling could
        // never make progress.
        if config.segment.max_index_bytes < crate::index::ENT_WIDTH {
            return Err(Error::Config(
                "segment.max_index_bytes cannot hold a single index entry",
            ));
        }

        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut base_offsets = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();

            let known_ext = matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("store" | "index")
            );
            if !known_ext {
                continue;
            }

            if let Some(base) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<u64>().ok())
            {
                base_offsets.push(base);
            }
        }

        base_offsets.sort_unstable();
        // A .store and .index pair shares one base; open it once.
        base_offsets.dedup();

        let mut segments = Vec::with_capacity(base_offsets.len().max(1));
        for base_offset in base_offsets {
            segments.push(Arc::new(Segment::open(&dir, base_offset, &config.segment)?));
        }

        if segments.is_empty() {
            segments.push(Arc::new(Segment::open(
                &dir,
                config.segment.initial_offset,
                &config.segment,
            )?));
        }

        tracing::info!(
            dir = %dir.display(),
            segments = segments.len(),
            "opened log"
        );

        Ok(Self {
            dir,
            config,
            inner: RwLock::new(LogInner { segments }),
        })
    }

    /// Append a record to the active segment, rolling afterwards if the
    /// append maxed it
    ///
    /// Appends run under the segment-list read lock, so a racing appender
    /// can hit a just-maxed segment whose index has no room left before the
    /// roll lands. That surfaces as `IndexFull` here and means "roll, then
    /// try again"; the fresh segment takes the record.
    pub fn append(&self, record: Record) -> Result<u64> {
        loop {
            let outcome = {
                let inner = self.inner.read();
                let active = inner.active()?;
                match active.append(record.clone()) {
                    Ok(offset) => Ok((offset, active.is_maxed())),
                    Err(err) => Err(err),
                }
            };

            match outcome {
                Ok((offset, maxed)) => {
                    if maxed {
                        self.roll()?;
                    }
                    return Ok(offset);
                }
                Err(Error::IndexFull) => self.roll()?,
                Err(err) => return Err(err),
            }
        }
    }

    /// Read the record at `offset`
    pub fn read(&self, offset: u64) -> Result<Record> {
        let inner = self.inner.read();
        let segment = inner.find(offset).ok_or(Error::OffsetOutOfRange(offset))?;
        segment.read(offset)
    }

    /// Base offset of the oldest segment
    pub fn lowest_offset(&self) -> u64 {
        let inner = self.inner.read();
        inner
            .segments
            .first()
            .map(|segment| segment.base_offset())
            .unwrap_or(self.config.segment.initial_offset)
    }

    /// Offset of the newest record, or `None` while the log is empty
    pub fn highest_offset(&self) -> Option<u64> {
        let inner = self.inner.read();
        let first = inner.segments.first()?.base_offset();
        let next = inner.segments.last()?.next_offset();
        (next > first).then(|| next - 1)
    }

    /// Close every segment
    pub fn close(&self) -> Result<()> {
        let inner = self.inner.read();
        for segment in &inner.segments {
            segment.close()?;
        }
        Ok(())
    }

    /// Close the log and delete its directory
    pub fn remove(&self) -> Result<()> {
        {
            let mut inner = self.inner.write();
            for segment in inner.segments.drain(..) {
                segment.close()?;
            }
        }

        tracing::info!(dir = %self.dir.display(), "removing log");
        fs::remove_dir_all(&self.dir)?;
        Ok(())
    }

    /// Remove the log and start over with one fresh segment
    pub fn reset(&self) -> Result<()> {
        let mut inner = self.inner.write();
        for segment in inner.segments.drain(..) {
            segment.close()?;
        }

        fs::remove_dir_all(&self.dir)?;
        fs::create_dir_all(&self.dir)?;

        inner.segments.push(Arc::new(Segment::open(
            &self.dir,
            self.config.segment.initial_offset,
            &self.config.segment,
        )?));

        tracing::debug!(dir = %self.dir.display(), "reset log");
        Ok(())
    }

    /// Install a new active segment at the current next offset
    ///
    /// Re-checks under the write lock: when two appenders race here, the
    /// loser finds a fresh, un-maxed active segment and leaves it alone.
    fn roll(&self) -> Result<()> {
        let mut inner = self.inner.write();

        let active = inner.active()?;
        if !active.is_maxed() {
            return Ok(());
        }

        let base_offset = active.next_offset();
        let segment = Arc::new(Segment::open(&self.dir, base_offset, &self.config.segment)?);

        tracing::debug!(base_offset, "rolled new active segment");
        inner.segments.push(segment);
        Ok(())
    }
}
