//! Wire Protocol Error Types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] streamlog_core::Error),

    #[error("frame of {0} bytes exceeds the frame limit")]
    FrameTooLarge(usize),

    #[error("unknown message tag: {0}")]
    UnknownMessageTag(u8),

    #[error("unknown error code: {0}")]
    UnknownErrorCode(u8),

    #[error("message truncated")]
    Truncated,

    #[error("error message is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}
