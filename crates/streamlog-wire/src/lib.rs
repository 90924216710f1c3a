//! StreamLog Wire Protocol
//!
//! This crate defines the protocol between StreamLog clients and the server:
//! length-prefixed frames over TCP, each carrying one typed message.
//!
//! ## Protocol
//!
//! ```text
//! ┌────────────┬──────────────────────────────┐
//! │ len (4B BE)│ tag (1B) | message body      │
//! └────────────┴──────────────────────────────┘
//! ```
//!
//! A connection starts in request/response mode: the client sends
//! [`Request`] frames and the server answers each with one [`Response`]
//! frame, in order. Produce requests may be pipelined freely - that is the
//! produce stream. A `ConsumeStream` request switches the connection to
//! server-push: the server sends a `Record` response for the requested
//! offset and every offset after it, tailing the log until the client goes
//! away.
//!
//! ## Errors on the wire
//!
//! Failures travel as an `Error` response with a one-byte code. Offset
//! out of range has its own code because a tailing consumer treats it as
//! "not yet" and retries, while anything else ends the stream.

pub mod error;
pub mod frame;
pub mod message;

pub use error::{Error, Result};
pub use frame::{read_frame, write_frame, MAX_FRAME_LEN};
pub use message::{ErrorCode, Request, Response};
