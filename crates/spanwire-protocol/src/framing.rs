//! Varint-delimited stream framing.
//!
//! Each message on the wire is `varint(len(payload)) ++ payload`: an
//! unsigned LEB128 length prefix (base-128, little-endian groups,
//! continuation bit) followed by exactly that many payload bytes. The
//! stream is self-delimiting; a reader recovers message boundaries by
//! decoding the length and reading that many bytes, indefinitely.

use thiserror::Error;

/// Longest legal LEB128 encoding of a u64.
const MAX_VARINT_LEN: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    #[error("malformed varint length prefix")]
    MalformedVarint,
    #[error("frame length {len} exceeds addressable memory")]
    Oversized { len: u64 },
}

/// Append `value` to `buf` as an unsigned LEB128 varint.
pub fn write_varint(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decode a varint from the front of `buf`, returning the value and the
/// number of bytes consumed, or `None` when the buffer ends mid-varint.
pub fn read_varint(buf: &[u8]) -> Result<Option<(u64, usize)>, FramingError> {
    let mut value = 0u64;
    let mut shift = 0u32;
    for (i, &byte) in buf.iter().enumerate() {
        if i >= MAX_VARINT_LEN {
            return Err(FramingError::MalformedVarint);
        }
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(Some((value, i + 1)));
        }
        shift += 7;
    }
    Ok(None)
}

/// Frame a payload: varint length prefix followed by the payload bytes.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(MAX_VARINT_LEN + payload.len());
    write_varint(payload.len() as u64, &mut buf);
    buf.extend_from_slice(payload);
    buf
}

/// Decode one frame from the front of `buf`, returning the payload and
/// the total bytes consumed, or `None` when the buffer holds only part
/// of a frame.
pub fn decode_frame(buf: &[u8]) -> Result<Option<(Vec<u8>, usize)>, FramingError> {
    let Some((len, prefix)) = read_varint(buf)? else {
        return Ok(None);
    };
    let len = usize::try_from(len).map_err(|_| FramingError::Oversized { len })?;
    if buf.len() < prefix + len {
        return Ok(None);
    }
    Ok(Some((buf[prefix..prefix + len].to_vec(), prefix + len)))
}
