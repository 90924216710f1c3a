//! Storage Error Types
//!
//! This module defines all error types that can occur during log storage
//! operations.
//!
//! ## Error Categories
//!
//! - `OffsetOutOfRange`: the requested offset is not held by any segment.
//!   Surfaced as its own variant because tailing consumers treat it as
//!   "not yet", wait, and retry, while every other error is terminal for
//!   the operation.
//! - `Io`: file, mmap, or sync failure. Low-level components return these
//!   upward unchanged; the log never swallows one.
//! - `Codec`: a stored frame failed to decode back into a record.
//! - `IndexFull`: the active segment's index cannot take another entry.
//!   The segment is maxed; the log rolls before this is normally reachable.
//! - `Eof`: a read past the last index entry (or from an empty index).
//! - `Closed`: operation on a store, index, segment, or log that has
//!   already been closed.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] streamlog_core::Error),

    #[error("offset out of range: {0}")]
    OffsetOutOfRange(u64),

    #[error("index has no room for another entry")]
    IndexFull,

    #[error("read past the end of the index")]
    Eof,

    #[error("storage is closed")]
    Closed,
}
