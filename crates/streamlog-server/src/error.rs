//! Server Error Types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] streamlog_storage::Error),

    #[error("wire error: {0}")]
    Wire(#[from] streamlog_wire::Error),

    #[error("storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
