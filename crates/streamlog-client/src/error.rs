//! Client Error Types

use streamlog_wire::ErrorCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wire error: {0}")]
    Wire(#[from] streamlog_wire::Error),

    /// The requested offset is not in the log (yet); safe to retry later
    #[error("offset out of range: {0}")]
    OffsetOutOfRange(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("server sent an unexpected response")]
    UnexpectedResponse,
}

impl Error {
    pub(crate) fn from_wire(code: ErrorCode, message: String) -> Self {
        match code {
            ErrorCode::OffsetOutOfRange => Error::OffsetOutOfRange(message),
            ErrorCode::Internal => Error::Server(message),
        }
    }
}
