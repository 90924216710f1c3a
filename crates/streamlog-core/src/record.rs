//! Record Data Structure
//!
//! This module defines the core `Record` type - the fundamental unit of data
//! in a StreamLog log.
//!
//! ## Structure
//! Each record contains:
//! - **value**: The payload (arbitrary bytes)
//! - **offset**: Unique, monotonically increasing ID within the log
//!
//! The offset is assigned by the log at append time; whatever offset the
//! producer put on the record is overwritten. Consumers address records by
//! offset, so after a successful append the pair round-trips exactly.
//!
//! ## Design Decisions
//! - Uses `bytes::Bytes` for zero-copy operations (no allocations when
//!   slicing or handing payloads between the codec and the network)
//! - Offset is u64 to support very large logs

use bytes::Bytes;

/// A single record in the log
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    /// Value (payload)
    pub value: Bytes,

    /// Offset of this record in the log, assigned on append
    pub offset: u64,
}

impl Record {
    /// Create a record that has not been appended yet (offset 0 until the
    /// log assigns the real one)
    pub fn new(value: Bytes) -> Self {
        Self { value, offset: 0 }
    }

    /// Create a record with a known offset (used on the read path)
    pub fn with_offset(value: Bytes, offset: u64) -> Self {
        Self { value, offset }
    }
}
