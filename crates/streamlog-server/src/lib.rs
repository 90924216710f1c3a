//! StreamLog Server
//!
//! This crate exposes a commit log over the StreamLog wire protocol: unary
//! produce/consume plus pipelined produce streams and tailing consume
//! streams, one tokio task per connection.
//!
//! The server is written against the [`CommitLog`] capability rather than
//! the storage engine directly, so tests (and future replicated logs) can
//! swap the implementation behind the same surface.

pub mod commit_log;
pub mod error;
pub mod server;

pub use commit_log::{CommitLog, InMemoryLog};
pub use error::{Error, Result};
pub use server::Server;
