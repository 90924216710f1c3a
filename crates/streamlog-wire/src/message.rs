//! Protocol Messages
//!
//! Typed requests and responses, each encoded as a one-byte tag followed by
//! a fixed body layout. Variable-length tails (produce payloads, encoded
//! records, error text) run to the end of the frame; the frame length
//! delimits them.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use streamlog_core::{codec, Record};

use crate::error::{Error, Result};

const TAG_PRODUCE: u8 = 1;
const TAG_CONSUME: u8 = 2;
const TAG_CONSUME_STREAM: u8 = 3;

const TAG_OFFSET: u8 = 1;
const TAG_RECORD: u8 = 2;
const TAG_ERROR: u8 = 3;

/// Client-to-server message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Append `value` to the log; answered with `Offset`
    Produce { value: Bytes },
    /// Read the record at `offset`; answered with `Record` or `Error`
    Consume { offset: u64 },
    /// Switch the connection to server-push from `offset`, tailing the log
    ConsumeStream { offset: u64 },
}

/// Server-to-client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Offset assigned to a produced record
    Offset(u64),
    /// A consumed record
    Record(Record),
    /// The request failed
    Error { code: ErrorCode, message: String },
}

/// Failure category carried on the wire
///
/// `OffsetOutOfRange` is distinguished so streaming consumers can keep
/// polling; everything else is terminal for the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    OffsetOutOfRange = 1,
    Internal = 2,
}

impl TryFrom<u8> for ErrorCode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(ErrorCode::OffsetOutOfRange),
            2 => Ok(ErrorCode::Internal),
            code => Err(Error::UnknownErrorCode(code)),
        }
    }
}

impl Request {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        match self {
            Request::Produce { value } => {
                buf.put_u8(TAG_PRODUCE);
                buf.put_slice(value);
            }
            Request::Consume { offset } => {
                buf.put_u8(TAG_CONSUME);
                buf.put_u64(*offset);
            }
            Request::ConsumeStream { offset } => {
                buf.put_u8(TAG_CONSUME_STREAM);
                buf.put_u64(*offset);
            }
        }
        buf.freeze()
    }

    pub fn decode(mut body: Bytes) -> Result<Self> {
        if !body.has_remaining() {
            return Err(Error::Truncated);
        }

        match body.get_u8() {
            TAG_PRODUCE => Ok(Request::Produce { value: body }),
            TAG_CONSUME => Ok(Request::Consume {
                offset: get_u64(&mut body)?,
            }),
            TAG_CONSUME_STREAM => Ok(Request::ConsumeStream {
                offset: get_u64(&mut body)?,
            }),
            tag => Err(Error::UnknownMessageTag(tag)),
        }
    }
}

impl Response {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        match self {
            Response::Offset(offset) => {
                buf.put_u8(TAG_OFFSET);
                buf.put_u64(*offset);
            }
            Response::Record(record) => {
                buf.put_u8(TAG_RECORD);
                buf.put_slice(&codec::encode(record));
            }
            Response::Error { code, message } => {
                buf.put_u8(TAG_ERROR);
                buf.put_u8(*code as u8);
                buf.put_slice(message.as_bytes());
            }
        }
        buf.freeze()
    }

    pub fn decode(mut body: Bytes) -> Result<Self> {
        if !body.has_remaining() {
            return Err(Error::Truncated);
        }

        match body.get_u8() {
            TAG_OFFSET => Ok(Response::Offset(get_u64(&mut body)?)),
            TAG_RECORD => Ok(Response::Record(codec::decode(body)?)),
            TAG_ERROR => {
                if !body.has_remaining() {
                    return Err(Error::Truncated);
                }
                let code = ErrorCode::try_from(body.get_u8())?;
                let message = String::from_utf8(body.to_vec())?;
                Ok(Response::Error { code, message })
            }
            tag => Err(Error::UnknownMessageTag(tag)),
        }
    }
}

fn get_u64(body: &mut Bytes) -> Result<u64> {
    if body.remaining() < 8 {
        return Err(Error::Truncated);
    }
    Ok(body.get_u64())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---------------------------------------------------------------
    // Request round-trips
    // ---------------------------------------------------------------

    #[test]
    fn test_produce_roundtrip() {
        let request = Request::Produce {
            value: Bytes::from("first message"),
        };
        assert_eq!(Request::decode(request.encode()).unwrap(), request);
    }

    #[test]
    fn test_produce_empty_value() {
        let request = Request::Produce { value: Bytes::new() };
        assert_eq!(Request::decode(request.encode()).unwrap(), request);
    }

    #[test]
    fn test_consume_roundtrip() {
        for request in [
            Request::Consume { offset: 0 },
            Request::Consume { offset: u64::MAX },
            Request::ConsumeStream { offset: 42 },
        ] {
            assert_eq!(Request::decode(request.encode()).unwrap(), request);
        }
    }

    // ---------------------------------------------------------------
    // Response round-trips
    // ---------------------------------------------------------------

    #[test]
    fn test_offset_roundtrip() {
        let response = Response::Offset(7);
        assert_eq!(Response::decode(response.encode()).unwrap(), response);
    }

    #[test]
    fn test_record_roundtrip() {
        let response = Response::Record(Record::with_offset(Bytes::from("hello world"), 3));
        assert_eq!(Response::decode(response.encode()).unwrap(), response);
    }

    #[test]
    fn test_error_roundtrip() {
        let response = Response::Error {
            code: ErrorCode::OffsetOutOfRange,
            message: "offset out of range: 10".to_string(),
        };
        assert_eq!(Response::decode(response.encode()).unwrap(), response);
    }

    // ---------------------------------------------------------------
    // Malformed input
    // ---------------------------------------------------------------

    #[test]
    fn test_empty_body() {
        assert!(matches!(
            Request::decode(Bytes::new()),
            Err(Error::Truncated)
        ));
        assert!(matches!(
            Response::decode(Bytes::new()),
            Err(Error::Truncated)
        ));
    }

    #[test]
    fn test_unknown_tags() {
        assert!(matches!(
            Request::decode(Bytes::from_static(&[99])),
            Err(Error::UnknownMessageTag(99))
        ));
        assert!(matches!(
            Response::decode(Bytes::from_static(&[99])),
            Err(Error::UnknownMessageTag(99))
        ));
    }

    #[test]
    fn test_truncated_offset() {
        let body = Bytes::from_static(&[TAG_CONSUME, 0, 0]);
        assert!(matches!(Request::decode(body), Err(Error::Truncated)));
    }

    #[test]
    fn test_unknown_error_code() {
        let body = Bytes::from_static(&[TAG_ERROR, 77]);
        assert!(matches!(
            Response::decode(body),
            Err(Error::UnknownErrorCode(77))
        ));
    }
}
