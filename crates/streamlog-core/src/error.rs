//! Error Types for StreamLog Core
//!
//! Decoding errors for the varint helpers and the record codec. Encoded
//! records arrive from disk and from the network, so every decode path is
//! fallible and none of them panic on malformed input.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("input truncated")]
    Truncated,

    #[error("varint exceeds 64 bits")]
    VarintOverflow,

    #[error("unsupported wire type: {0}")]
    InvalidWireType(u8),

    #[error("invalid field tag: {0}")]
    InvalidTag(u64),
}
