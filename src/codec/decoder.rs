//! Streaming decoder interface and the plain binary decoder.
//!
//! Each read is all-or-nothing: if it fails part way (for example on a
//! truncated varint) the input cursor goes back to where the read began.

use crate::codec::varint;
use crate::error::{AvroError, Result};
use crate::stream::{InputBuffer, Mark};

/// Sequence of primitive reads matching [`Encoder`](crate::codec::Encoder).
pub trait Decoder {
    /// Unread bytes in the attached input.
    fn bytes_remaining(&self) -> usize;

    /// Description of what is still expected when a value was only partly
    /// read, or `None` at a value boundary.
    fn pending(&self) -> Option<String> {
        None
    }

    fn decode_null(&mut self) -> Result<()>;
    fn decode_bool(&mut self) -> Result<bool>;
    fn decode_int(&mut self) -> Result<i32>;
    fn decode_long(&mut self) -> Result<i64>;
    fn decode_float(&mut self) -> Result<f32>;
    fn decode_double(&mut self) -> Result<f64>;
    fn decode_bytes(&mut self) -> Result<Vec<u8>>;
    fn decode_string(&mut self) -> Result<String>;
    fn decode_fixed(&mut self, size: usize) -> Result<Vec<u8>>;
    fn decode_enum(&mut self) -> Result<usize>;

    /// Start an array and return the item count of its first block
    /// (0 for an empty array).
    fn array_start(&mut self) -> Result<usize>;

    /// Item count of the next array block, 0 once the array has ended.
    fn array_next(&mut self) -> Result<usize>;

    /// Start a map and return the entry count of its first block.
    fn map_start(&mut self) -> Result<usize>;

    /// Entry count of the next map block, 0 once the map has ended.
    fn map_next(&mut self) -> Result<usize>;

    fn decode_union_index(&mut self) -> Result<usize>;
}

/// Plain binary decoder with no schema checks.
#[derive(Debug, Default)]
pub struct BinaryDecoder<'a> {
    input: Option<InputBuffer<'a>>,
}

fn non_negative(value: i64, what: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| AvroError::SchemaMismatch(format!("invalid {} {}", what, value)))
}

fn read_len(input: &mut InputBuffer<'_>, what: &str) -> Result<usize> {
    non_negative(varint::read_long(input)?, what)
}

fn read_block_count(input: &mut InputBuffer<'_>) -> Result<usize> {
    let count = varint::read_long(input)?;
    if count >= 0 {
        return non_negative(count, "block count");
    }
    // Negative count: absolute value, followed by the block size in bytes
    read_len(input, "block size")?;
    usize::try_from(count.unsigned_abs())
        .map_err(|_| AvroError::SchemaMismatch(format!("invalid block count {}", count)))
}

impl<'a> BinaryDecoder<'a> {
    /// Create a detached decoder.
    pub fn new() -> Self {
        Self { input: None }
    }

    /// Create a decoder attached to `input`.
    pub fn attached(input: InputBuffer<'a>) -> Self {
        Self { input: Some(input) }
    }

    /// Attach to `input`, replacing any previous input.
    pub fn init(&mut self, input: InputBuffer<'a>) {
        self.input = Some(input);
    }

    /// Detach and return the input.
    pub fn release(&mut self) -> Option<InputBuffer<'a>> {
        self.input.take()
    }

    pub(crate) fn mark(&self) -> Result<Mark> {
        self.input
            .as_ref()
            .map(InputBuffer::mark)
            .ok_or(AvroError::Detached)
    }

    pub(crate) fn restore(&mut self, mark: Mark) {
        if let Some(input) = self.input.as_mut() {
            input.restore(mark);
        }
    }

    /// Run `read` against the input, undoing any partial progress on error.
    fn read<T>(&mut self, read: impl FnOnce(&mut InputBuffer<'a>) -> Result<T>) -> Result<T> {
        let input = self.input.as_mut().ok_or(AvroError::Detached)?;
        let mark = input.mark();
        let result = read(input);
        if result.is_err() {
            input.restore(mark);
        }
        result
    }
}

impl Decoder for BinaryDecoder<'_> {
    fn bytes_remaining(&self) -> usize {
        self.input.as_ref().map_or(0, InputBuffer::bytes_remaining)
    }

    fn decode_null(&mut self) -> Result<()> {
        self.read(|_| Ok(()))
    }

    fn decode_bool(&mut self) -> Result<bool> {
        self.read(|input| match input.read_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(AvroError::SchemaMismatch(format!(
                "invalid boolean byte {:#04x}",
                other
            ))),
        })
    }

    fn decode_int(&mut self) -> Result<i32> {
        self.read(|input| {
            let value = varint::read_long(input)?;
            i32::try_from(value)
                .map_err(|_| AvroError::SchemaMismatch(format!("int out of range: {}", value)))
        })
    }

    fn decode_long(&mut self) -> Result<i64> {
        self.read(varint::read_long)
    }

    fn decode_float(&mut self) -> Result<f32> {
        self.read(|input| {
            let mut buf = [0u8; 4];
            input.read_into(&mut buf)?;
            Ok(f32::from_le_bytes(buf))
        })
    }

    fn decode_double(&mut self) -> Result<f64> {
        self.read(|input| {
            let mut buf = [0u8; 8];
            input.read_into(&mut buf)?;
            Ok(f64::from_le_bytes(buf))
        })
    }

    fn decode_bytes(&mut self) -> Result<Vec<u8>> {
        self.read(|input| {
            let len = read_len(input, "length")?;
            input.read_exact(len)
        })
    }

    fn decode_string(&mut self) -> Result<String> {
        self.read(|input| {
            let len = read_len(input, "length")?;
            let bytes = input.read_exact(len)?;
            String::from_utf8(bytes)
                .map_err(|_| AvroError::SchemaMismatch("invalid UTF-8 string".to_string()))
        })
    }

    fn decode_fixed(&mut self, size: usize) -> Result<Vec<u8>> {
        self.read(|input| input.read_exact(size))
    }

    fn decode_enum(&mut self) -> Result<usize> {
        self.read(|input| read_len(input, "enum index"))
    }

    fn array_start(&mut self) -> Result<usize> {
        self.read(read_block_count)
    }

    fn array_next(&mut self) -> Result<usize> {
        self.read(read_block_count)
    }

    fn map_start(&mut self) -> Result<usize> {
        self.read(read_block_count)
    }

    fn map_next(&mut self) -> Result<usize> {
        self.read(read_block_count)
    }

    fn decode_union_index(&mut self) -> Result<usize> {
        self.read(|input| read_len(input, "union index"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_decoder_fails() {
        let mut decoder = BinaryDecoder::new();
        assert!(matches!(decoder.decode_long(), Err(AvroError::Detached)));
        assert_eq!(decoder.bytes_remaining(), 0);
    }

    #[test]
    fn test_decode_300() {
        let bytes = [0xD8u8, 0x04];
        let mut decoder = BinaryDecoder::attached(InputBuffer::from_slice(&bytes));
        assert_eq!(decoder.decode_int().unwrap(), 300);
        assert_eq!(decoder.bytes_remaining(), 0);
    }

    #[test]
    fn test_decode_primitives() {
        let mut bytes = vec![0x01, 0x00, 0x03];
        bytes.extend_from_slice(&0.25f32.to_le_bytes());
        bytes.extend_from_slice(&1e100f64.to_le_bytes());
        bytes.extend_from_slice(&[0x06, b'f', b'o', b'o']);

        let mut decoder = BinaryDecoder::attached(InputBuffer::from_slice(&bytes));
        assert!(decoder.decode_bool().unwrap());
        assert!(!decoder.decode_bool().unwrap());
        assert_eq!(decoder.decode_long().unwrap(), -2);
        assert_eq!(decoder.decode_float().unwrap(), 0.25);
        assert_eq!(decoder.decode_double().unwrap(), 1e100);
        assert_eq!(decoder.decode_string().unwrap(), "foo");
    }

    #[test]
    fn test_truncated_string_restores_cursor() {
        // Claims 5 bytes, only 2 follow
        let bytes = [0x0A, b'h', b'i'];
        let mut decoder = BinaryDecoder::attached(InputBuffer::from_slice(&bytes));

        let err = decoder.decode_string().unwrap_err();
        assert!(err.is_truncated());
        assert_eq!(decoder.bytes_remaining(), 3);
    }

    #[test]
    fn test_truncated_double() {
        let bytes = [0u8; 5];
        let mut decoder = BinaryDecoder::attached(InputBuffer::from_slice(&bytes));
        assert!(decoder.decode_double().unwrap_err().is_truncated());
        assert_eq!(decoder.bytes_remaining(), 5);
    }

    #[test]
    fn test_malformed_values() {
        let bytes = [0x02];
        let mut decoder = BinaryDecoder::attached(InputBuffer::from_slice(&bytes));
        assert!(matches!(
            decoder.decode_bool(),
            Err(AvroError::SchemaMismatch(_))
        ));

        // Negative length
        let bytes = [0x01];
        let mut decoder = BinaryDecoder::attached(InputBuffer::from_slice(&bytes));
        assert!(matches!(
            decoder.decode_bytes(),
            Err(AvroError::SchemaMismatch(_))
        ));

        let bytes = [0x04, 0xC3, 0x28];
        let mut decoder = BinaryDecoder::attached(InputBuffer::from_slice(&bytes));
        assert!(matches!(
            decoder.decode_string(),
            Err(AvroError::SchemaMismatch(_))
        ));
        assert_eq!(decoder.bytes_remaining(), 3);
    }

    #[test]
    fn test_int_overflow() {
        // zig-zag of 2^31
        let bytes = [0x80, 0x80, 0x80, 0x80, 0x10];
        let mut decoder = BinaryDecoder::attached(InputBuffer::from_slice(&bytes));
        assert!(matches!(
            decoder.decode_int(),
            Err(AvroError::SchemaMismatch(_))
        ));
        assert_eq!(decoder.decode_long().unwrap(), 1 << 31);
    }

    #[test]
    fn test_array_blocks() {
        // Block of 2, then a negative-count block of 1 with byte size 1, then end
        let bytes = [0x04, 0x02, 0x04, 0x01, 0x02, 0x06, 0x00];
        let mut decoder = BinaryDecoder::attached(InputBuffer::from_slice(&bytes));

        let mut items = Vec::new();
        let mut count = decoder.array_start().unwrap();
        while count > 0 {
            for _ in 0..count {
                items.push(decoder.decode_int().unwrap());
            }
            count = decoder.array_next().unwrap();
        }
        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(decoder.bytes_remaining(), 0);
    }

    #[test]
    fn test_fixed_and_indices() {
        let bytes = [0xAA, 0xBB, 0x02, 0x04];
        let mut decoder = BinaryDecoder::attached(InputBuffer::from_slice(&bytes));
        assert_eq!(decoder.decode_fixed(2).unwrap(), vec![0xAA, 0xBB]);
        assert_eq!(decoder.decode_union_index().unwrap(), 1);
        assert_eq!(decoder.decode_enum().unwrap(), 2);
        assert!(decoder.decode_fixed(1).unwrap_err().is_truncated());
    }
}
