//! StreamLog Storage Engine
//!
//! This crate implements the on-disk storage engine for StreamLog: a
//! segmented, append-only commit log addressed by monotonically increasing
//! 64-bit offsets.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ Log            ordered segments, roll-over    │
//! │ ┌───────────────────────────────────────────┐ │
//! │ │ Segment      offset assignment            │ │
//! │ │ ┌─────────────────┐  ┌──────────────────┐ │ │
//! │ │ │ Store           │  │ Index            │ │ │
//! │ │ │ length-prefixed │  │ mmap'd           │ │ │
//! │ │ │ record frames   │  │ offset→position  │ │ │
//! │ │ │ (buffered)      │  │ entries          │ │ │
//! │ │ └─────────────────┘  └──────────────────┘ │ │
//! │ └───────────────────────────────────────────┘ │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! A log is a directory of `<base_offset>.store` / `<base_offset>.index`
//! pairs. Appends frame the encoded record into the active segment's store
//! and record its position in the index; reads translate an offset to the
//! owning segment, then through the index to a store position. When the
//! active segment reaches its configured store or index capacity, the log
//! rolls a new segment at the next offset.
//!
//! The store uses buffered sequential writes because payloads are
//! variable-length and appends dominate; the index uses a memory mapping
//! because entries are fixed-width and the read path is random-access.
//!
//! ## Usage
//!
//! ```ignore
//! use streamlog_storage::{Config, Log};
//! use streamlog_core::Record;
//! use bytes::Bytes;
//!
//! let log = Log::open("./data/log", Config::default())?;
//!
//! let offset = log.append(Record::new(Bytes::from("hello")))?;
//! let record = log.read(offset)?;
//! assert_eq!(record.value, Bytes::from("hello"));
//! ```

pub mod config;
pub mod error;
pub mod index;
pub mod log;
pub mod segment;
pub mod store;

pub use config::{Config, SegmentConfig};
pub use error::{Error, Result};
pub use log::Log;
pub use segment::Segment;
pub use store::Store;
