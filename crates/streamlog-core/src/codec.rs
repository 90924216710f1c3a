//! Record Wire Codec
//!
//! Field-tagged, length-delimited binary encoding for [`Record`], compatible
//! with the standard protobuf wire format:
//!
//! ```text
//! field 1 (value)  key 0x0A  | varint length | payload bytes
//! field 2 (offset) key 0x10  | varint offset
//! ```
//!
//! Each field is prefixed by a varint key `(field_number << 3) | wire_type`.
//! Both fields are always emitted, in tag order, so encoding is
//! deterministic and every encoded record is non-empty.
//!
//! ## Forward compatibility
//!
//! The decoder skips fields it does not recognize, dispatching on the wire
//! type (varint, 64-bit, length-delimited, 32-bit). A record written by a
//! future version with extra fields still decodes here; the deprecated group
//! wire types and any truncated field are rejected.
//!
//! The encoding is self-delimiting only per field, so stored records rely on
//! the store's outer length prefix to find their end - `decode` consumes the
//! whole buffer it is given.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::record::Record;
use crate::varint;

/// Field number of `Record::value`
const VALUE_FIELD: u64 = 1;
/// Field number of `Record::offset`
const OFFSET_FIELD: u64 = 2;

/// Wire type for varint-encoded scalars
const WIRE_VARINT: u64 = 0;
/// Wire type for fixed 64-bit scalars
const WIRE_FIXED64: u64 = 1;
/// Wire type for length-delimited payloads
const WIRE_LEN: u64 = 2;
/// Wire type for fixed 32-bit scalars
const WIRE_FIXED32: u64 = 5;

/// Encode a record into a freshly allocated buffer
pub fn encode(record: &Record) -> Bytes {
    let mut buf = BytesMut::with_capacity(encoded_len(record));

    varint::encode_u64(&mut buf, (VALUE_FIELD << 3) | WIRE_LEN);
    varint::encode_u64(&mut buf, record.value.len() as u64);
    buf.put_slice(&record.value);

    varint::encode_u64(&mut buf, (OFFSET_FIELD << 3) | WIRE_VARINT);
    varint::encode_u64(&mut buf, record.offset);

    buf.freeze()
}

/// Exact number of bytes [`encode`] will produce for `record`
pub fn encoded_len(record: &Record) -> usize {
    // Both field keys fit in a single byte (field numbers < 16)
    1 + varint::encoded_len_u64(record.value.len() as u64)
        + record.value.len()
        + 1
        + varint::encoded_len_u64(record.offset)
}

/// Decode a record, consuming the entire buffer
///
/// Unknown fields are skipped; the last occurrence of a repeated field wins,
/// matching standard wire-format semantics.
pub fn decode(mut buf: Bytes) -> Result<Record> {
    let mut value = Bytes::new();
    let mut offset = 0u64;

    while buf.has_remaining() {
        let key = varint::decode_u64(&mut buf)?;
        let field = key >> 3;
        let wire = key & 0x07;

        if field == 0 {
            return Err(Error::InvalidTag(key));
        }

        match (field, wire) {
            (VALUE_FIELD, WIRE_LEN) => value = decode_bytes(&mut buf)?,
            (OFFSET_FIELD, WIRE_VARINT) => offset = varint::decode_u64(&mut buf)?,
            (_, wire) => skip_field(&mut buf, wire)?,
        }
    }

    Ok(Record { value, offset })
}

/// Decode a length-delimited byte field, zero-copy out of `buf`
fn decode_bytes(buf: &mut Bytes) -> Result<Bytes> {
    let len = varint::decode_u64(&mut *buf)?;
    let len = usize::try_from(len).map_err(|_| Error::Truncated)?;

    if buf.remaining() < len {
        return Err(Error::Truncated);
    }

    Ok(buf.copy_to_bytes(len))
}

/// Skip over an unrecognized field based on its wire type
fn skip_field(buf: &mut Bytes, wire: u64) -> Result<()> {
    match wire {
        WIRE_VARINT => {
            varint::decode_u64(&mut *buf)?;
        }
        WIRE_FIXED64 => advance(buf, 8)?,
        WIRE_LEN => {
            decode_bytes(buf)?;
        }
        WIRE_FIXED32 => advance(buf, 4)?,
        wire => return Err(Error::InvalidWireType(wire as u8)),
    }
    Ok(())
}

fn advance(buf: &mut Bytes, n: usize) -> Result<()> {
    if buf.remaining() < n {
        return Err(Error::Truncated);
    }
    buf.advance(n);
    Ok(())
}
