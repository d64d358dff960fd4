//! Zig-zag variable-length integers.
//!
//! Signed values are first zig-zag mapped (`0, -1, 1, -2, ...` become
//! `0, 1, 2, 3, ...`) and then written 7 bits per byte, least significant
//! group first, with the high bit set on every byte except the last.
//!
//! ```text
//! 300  -> zig-zag 600 -> 0b100_1011000 -> [0xD8, 0x04]
//! 150  -> zig-zag 300 -> 0b10_0101100  -> [0xAC, 0x02]
//! ```

use crate::error::{AvroError, Result};
use crate::stream::InputBuffer;

/// Longest encoding of a 64-bit value.
pub const MAX_VARINT_LEN: usize = 10;

/// Map a signed value onto an unsigned one so small magnitudes stay small.
#[inline]
pub fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Inverse of [`zigzag_encode`].
#[inline]
pub fn zigzag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Write `n` as an unsigned varint into `buf`, returning the byte count.
#[inline]
pub fn encode_varint(mut n: u64, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut i = 0;
    loop {
        let byte = (n & 0x7f) as u8;
        n >>= 7;
        if n == 0 {
            buf[i] = byte;
            return i + 1;
        }
        buf[i] = byte | 0x80;
        i += 1;
    }
}

/// Write a signed value as a zig-zag varint into `buf`.
#[inline]
pub fn encode_long(n: i64, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    encode_varint(zigzag_encode(n), buf)
}

/// Read an unsigned varint, guarding against over-long encodings.
///
/// The cursor may have moved when this fails; callers that need
/// all-or-nothing reads restore a [`Mark`](crate::stream::Mark).
pub fn read_varint(input: &mut InputBuffer<'_>) -> Result<u64> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        let byte = input.read_byte()?;
        // The tenth byte carries bit 63 only
        if shift == 63 && byte > 1 {
            return Err(AvroError::SchemaMismatch(
                "varint does not fit in 64 bits".to_string(),
            ));
        }
        result |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}

/// Read a zig-zag encoded long.
#[inline]
pub fn read_long(input: &mut InputBuffer<'_>) -> Result<i64> {
    read_varint(input).map(zigzag_decode)
}
