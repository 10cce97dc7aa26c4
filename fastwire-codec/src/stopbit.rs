//! Stop-bit entity encoding.
//!
//! FAST transfers integers, strings, and byte vectors as stop-bit entities:
//! big-endian base-128 groups of 7 bits, where every byte's high bit is
//! clear except the terminal byte. Decoding is bounded per type so a
//! corrupt or unterminated stream can never be scanned unboundedly.

use fastwire_core::{DecodeError, FastError};
use std::io::Read;

/// Maximum encoded size of a stop-bit u32 (ceil(32 / 7) bytes).
pub const MAX_U32_BYTES: usize = 5;
/// Maximum encoded size of a stop-bit u64 (ceil(64 / 7) bytes).
pub const MAX_U64_BYTES: usize = 10;

/// Stop bit: set on the terminal byte of every entity.
const STOP: u8 = 0x80;
/// Value bits of one group.
const MASK: u8 = 0x7F;
/// Sign bit of the leading group of a signed entity.
const SIGN: u8 = 0x40;

/// Decodes an unsigned 32-bit integer.
///
/// # Errors
/// [`DecodeError::UnexpectedEof`] if the slice ends mid-entity,
/// [`DecodeError::StopBitTooLong`] if no terminal byte appears within
/// [`MAX_U32_BYTES`], [`DecodeError::IntegerOverflow`] on overflow.
pub fn decode_u32(data: &[u8], offset: &mut usize) -> Result<u32, DecodeError> {
    let mut result: u32 = 0;

    for _ in 0..MAX_U32_BYTES {
        if *offset >= data.len() {
            return Err(DecodeError::UnexpectedEof);
        }
        let byte = data[*offset];
        *offset += 1;

        if result > (u32::MAX >> 7) {
            return Err(DecodeError::IntegerOverflow);
        }
        result = (result << 7) | u32::from(byte & MASK);

        if byte & STOP != 0 {
            return Ok(result);
        }
    }

    Err(DecodeError::StopBitTooLong {
        max_bytes: MAX_U32_BYTES,
    })
}

/// Decodes an unsigned 64-bit integer.
///
/// # Errors
/// See [`decode_u32`]; the byte bound is [`MAX_U64_BYTES`].
pub fn decode_u64(data: &[u8], offset: &mut usize) -> Result<u64, DecodeError> {
    let mut result: u64 = 0;

    for _ in 0..MAX_U64_BYTES {
        if *offset >= data.len() {
            return Err(DecodeError::UnexpectedEof);
        }
        let byte = data[*offset];
        *offset += 1;

        if result > (u64::MAX >> 7) {
            return Err(DecodeError::IntegerOverflow);
        }
        result = (result << 7) | u64::from(byte & MASK);

        if byte & STOP != 0 {
            return Ok(result);
        }
    }

    Err(DecodeError::StopBitTooLong {
        max_bytes: MAX_U64_BYTES,
    })
}

/// Decodes a signed 32-bit integer.
///
/// The sign is carried by bit 6 of the leading byte and extended left.
///
/// # Errors
/// See [`decode_u32`].
pub fn decode_i32(data: &[u8], offset: &mut usize) -> Result<i32, DecodeError> {
    let v = decode_i64_bounded(data, offset, MAX_U32_BYTES)?;
    i32::try_from(v).map_err(|_| DecodeError::IntegerOverflow)
}

/// Decodes a signed 64-bit integer.
///
/// # Errors
/// See [`decode_u32`]; the byte bound is [`MAX_U64_BYTES`].
pub fn decode_i64(data: &[u8], offset: &mut usize) -> Result<i64, DecodeError> {
    decode_i64_bounded(data, offset, MAX_U64_BYTES)
}

fn decode_i64_bounded(
    data: &[u8],
    offset: &mut usize,
    max_bytes: usize,
) -> Result<i64, DecodeError> {
    if *offset >= data.len() {
        return Err(DecodeError::UnexpectedEof);
    }
    let negative = data[*offset] & SIGN != 0;
    let mut result: i64 = if negative { -1 } else { 0 };

    for _ in 0..max_bytes {
        if *offset >= data.len() {
            return Err(DecodeError::UnexpectedEof);
        }
        let byte = data[*offset];
        *offset += 1;

        if result > (i64::MAX >> 7) || result < (i64::MIN >> 7) {
            return Err(DecodeError::IntegerOverflow);
        }
        result = (result << 7) | i64::from(byte & MASK);

        if byte & STOP != 0 {
            return Ok(result);
        }
    }

    Err(DecodeError::StopBitTooLong { max_bytes })
}

/// Decodes an ASCII string; the stop bit rides on the final character.
///
/// A single terminal byte with no payload bits (`0x80`) is the empty string.
///
/// # Errors
/// [`DecodeError::UnexpectedEof`] if the slice ends before a terminal byte.
pub fn decode_ascii(data: &[u8], offset: &mut usize) -> Result<String, DecodeError> {
    if *offset < data.len() && data[*offset] == STOP {
        *offset += 1;
        return Ok(String::new());
    }

    let mut result = Vec::new();
    loop {
        if *offset >= data.len() {
            return Err(DecodeError::UnexpectedEof);
        }
        let byte = data[*offset];
        *offset += 1;

        result.push(byte & MASK);

        if byte & STOP != 0 {
            break;
        }
    }

    String::from_utf8(result).map_err(|_| DecodeError::InvalidString)
}

/// Decodes a byte vector: stop-bit length prefix followed by raw bytes.
///
/// # Errors
/// [`DecodeError::UnexpectedEof`] if fewer bytes remain than declared.
pub fn decode_byte_vector(data: &[u8], offset: &mut usize) -> Result<Vec<u8>, DecodeError> {
    let length = decode_u32(data, offset)? as usize;

    if *offset + length > data.len() {
        return Err(DecodeError::UnexpectedEof);
    }
    let bytes = data[*offset..*offset + length].to_vec();
    *offset += length;

    Ok(bytes)
}

/// Decodes a decimal as a signed exponent followed by a signed mantissa.
///
/// # Errors
/// See [`decode_i32`] and [`decode_i64`].
pub fn decode_decimal(data: &[u8], offset: &mut usize) -> Result<(i64, i32), DecodeError> {
    let exponent = decode_i32(data, offset)?;
    let mantissa = decode_i64(data, offset)?;
    Ok((mantissa, exponent))
}

/// Encodes an unsigned 32-bit integer.
pub fn encode_u32(value: u32, out: &mut Vec<u8>) {
    encode_u64(u64::from(value), out);
}

/// Encodes an unsigned 64-bit integer.
pub fn encode_u64(value: u64, out: &mut Vec<u8>) {
    if value == 0 {
        out.push(STOP);
        return;
    }

    let mut groups = [0u8; MAX_U64_BYTES];
    let mut n = 0;
    let mut v = value;
    while v > 0 {
        groups[n] = (v & u64::from(MASK)) as u8;
        v >>= 7;
        n += 1;
    }

    for i in (0..n).rev() {
        let byte = if i == 0 { groups[0] | STOP } else { groups[i] };
        out.push(byte);
    }
}

/// Encodes a signed 32-bit integer.
pub fn encode_i32(value: i32, out: &mut Vec<u8>) {
    encode_i64(i64::from(value), out);
}

/// Encodes a signed 64-bit integer.
///
/// Uses the minimal number of 7-bit groups whose sign-extension reproduces
/// the value, so the sign bit of the leading group is always correct.
pub fn encode_i64(value: i64, out: &mut Vec<u8>) {
    let mut n = 1;
    while n < MAX_U64_BYTES {
        let shift = 64 - 7 * n;
        if (value << shift) >> shift == value {
            break;
        }
        n += 1;
    }

    for i in (0..n).rev() {
        let mut byte = ((value >> (7 * i)) & i64::from(MASK)) as u8;
        if i == 0 {
            byte |= STOP;
        }
        out.push(byte);
    }
}

/// Encodes an ASCII string with the stop bit on the final character.
pub fn encode_ascii(value: &str, out: &mut Vec<u8>) {
    let bytes = value.as_bytes();
    if bytes.is_empty() {
        out.push(STOP);
        return;
    }

    for (i, &b) in bytes.iter().enumerate() {
        if i == bytes.len() - 1 {
            out.push(b | STOP);
        } else {
            out.push(b & MASK);
        }
    }
}

/// Encodes a byte vector with a stop-bit length prefix.
pub fn encode_byte_vector(value: &[u8], out: &mut Vec<u8>) {
    encode_u32(value.len() as u32, out);
    out.extend_from_slice(value);
}

/// Encodes a decimal as signed exponent then signed mantissa.
pub fn encode_decimal(mantissa: i64, exponent: i32, out: &mut Vec<u8>) {
    encode_i32(exponent, out);
    encode_i64(mantissa, out);
}

/// Reads one stop-bit u32 from a stream, one byte at a time.
///
/// Used for the outer frame length, where the input is a live transport.
/// Returns `Ok(None)` on clean end-of-stream before the first byte; that is
/// the "no more messages" signal, distinct from a zero value (one terminal
/// byte `0x80`).
///
/// # Errors
/// An EOF after the first byte is [`DecodeError::UnexpectedEof`]; bound and
/// overflow violations as in [`decode_u32`]; I/O errors pass through.
pub fn read_u32<R: Read>(input: &mut R) -> Result<Option<u32>, FastError> {
    let mut result: u32 = 0;
    let mut byte = [0u8; 1];

    for i in 0..MAX_U32_BYTES {
        match input.read(&mut byte) {
            Ok(0) => {
                if i == 0 {
                    return Ok(None);
                }
                return Err(DecodeError::UnexpectedEof.into());
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                if i == 0 {
                    return Ok(None);
                }
                return Err(DecodeError::UnexpectedEof.into());
            }
            Err(e) => return Err(e.into()),
        }

        if result > (u32::MAX >> 7) {
            return Err(DecodeError::IntegerOverflow.into());
        }
        result = (result << 7) | u32::from(byte[0] & MASK);

        if byte[0] & STOP != 0 {
            return Ok(Some(result));
        }
    }

    Err(DecodeError::StopBitTooLong {
        max_bytes: MAX_U32_BYTES,
    }
    .into())
}
