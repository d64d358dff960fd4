//! Streaming encoder interface and the plain binary encoder.
//!
//! Binary layout:
//!
//! ```text
//! null            nothing
//! boolean         1 byte, 0 or 1
//! int, long       zig-zag varint
//! float, double   4 / 8 bytes little-endian IEEE 754
//! bytes, string   long length, then the raw bytes
//! fixed           raw bytes, no length
//! enum            long symbol index
//! union           long branch index, then the branch value
//! array, map      blocks of (long count, items...), ended by a 0 count
//! record          fields in declared order, no names or tags
//! ```

use crate::codec::varint::{self, MAX_VARINT_LEN};
use crate::error::{AvroError, Result};
use crate::stream::OutputBuffer;

/// Sequence of primitive writes that every value is made of.
///
/// An encoder owns the [`OutputBuffer`] it is attached to. It must be
/// attached with [`init`](Encoder::init) before writing; writes on a detached
/// encoder fail with [`AvroError::Detached`].
pub trait Encoder {
    /// Attach to `out`, dropping any previously attached buffer and
    /// rewinding per-stream state.
    fn init(&mut self, out: OutputBuffer);

    /// Detach and return the buffer.
    fn release(&mut self) -> Option<OutputBuffer>;

    /// The attached buffer.
    fn output(&self) -> Option<&OutputBuffer>;

    /// Flush the attached buffer.
    fn flush(&mut self);

    /// Bytes written to the attached buffer so far.
    fn byte_count(&self) -> usize {
        self.output().map_or(0, OutputBuffer::byte_count)
    }

    /// Drop everything written after the first `byte_count` bytes and go
    /// back to the start of a value.
    ///
    /// `byte_count` must have been taken at a value boundary.
    fn rewind(&mut self, byte_count: usize);

    /// Description of what is still owed when a value was only partly
    /// written, or `None` at a value boundary.
    fn pending(&self) -> Option<String> {
        None
    }

    fn encode_null(&mut self) -> Result<()>;
    fn encode_bool(&mut self, value: bool) -> Result<()>;
    fn encode_int(&mut self, value: i32) -> Result<()>;
    fn encode_long(&mut self, value: i64) -> Result<()>;
    fn encode_float(&mut self, value: f32) -> Result<()>;
    fn encode_double(&mut self, value: f64) -> Result<()>;
    fn encode_bytes(&mut self, value: &[u8]) -> Result<()>;
    fn encode_string(&mut self, value: &str) -> Result<()>;
    fn encode_fixed(&mut self, value: &[u8]) -> Result<()>;
    fn encode_enum(&mut self, index: usize) -> Result<()>;

    fn array_start(&mut self) -> Result<()>;
    fn array_end(&mut self) -> Result<()>;
    fn map_start(&mut self) -> Result<()>;
    fn map_end(&mut self) -> Result<()>;

    /// Begin a block of `count` items. A count of 0 writes nothing.
    fn set_item_count(&mut self, count: usize) -> Result<()>;

    /// Mark the start of the next item in the current block.
    fn start_item(&mut self) -> Result<()>;

    fn encode_union_index(&mut self, index: usize) -> Result<()>;
}

/// Plain binary encoder with no schema checks.
#[derive(Debug, Default)]
pub struct BinaryEncoder {
    out: Option<OutputBuffer>,
}

impl BinaryEncoder {
    /// Create a detached encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an encoder attached to `out`.
    pub fn attached(out: OutputBuffer) -> Self {
        Self { out: Some(out) }
    }

    fn sink(&mut self) -> Result<&mut OutputBuffer> {
        self.out.as_mut().ok_or(AvroError::Detached)
    }

    fn write_long(&mut self, value: i64) -> Result<()> {
        let mut buf = [0u8; MAX_VARINT_LEN];
        let len = varint::encode_long(value, &mut buf);
        self.sink()?.append(&buf[..len])
    }

    fn write_len(&mut self, len: usize) -> Result<()> {
        self.write_long(len as i64)
    }
}

impl Encoder for BinaryEncoder {
    fn init(&mut self, out: OutputBuffer) {
        self.out = Some(out);
    }

    fn release(&mut self) -> Option<OutputBuffer> {
        self.out.take()
    }

    fn output(&self) -> Option<&OutputBuffer> {
        self.out.as_ref()
    }

    fn flush(&mut self) {
        if let Some(out) = self.out.as_mut() {
            out.flush();
        }
    }

    fn rewind(&mut self, byte_count: usize) {
        if let Some(out) = self.out.as_mut() {
            out.truncate(byte_count);
        }
    }

    fn encode_null(&mut self) -> Result<()> {
        self.sink().map(|_| ())
    }

    fn encode_bool(&mut self, value: bool) -> Result<()> {
        self.sink()?.append(&[u8::from(value)])
    }

    fn encode_int(&mut self, value: i32) -> Result<()> {
        self.write_long(i64::from(value))
    }

    fn encode_long(&mut self, value: i64) -> Result<()> {
        self.write_long(value)
    }

    fn encode_float(&mut self, value: f32) -> Result<()> {
        self.sink()?.append(&value.to_le_bytes())
    }

    fn encode_double(&mut self, value: f64) -> Result<()> {
        self.sink()?.append(&value.to_le_bytes())
    }

    fn encode_bytes(&mut self, value: &[u8]) -> Result<()> {
        let mut prefix = [0u8; MAX_VARINT_LEN];
        let len = varint::encode_long(value.len() as i64, &mut prefix);
        self.sink()?.append_all(&[&prefix[..len], value])
    }

    fn encode_string(&mut self, value: &str) -> Result<()> {
        self.encode_bytes(value.as_bytes())
    }

    fn encode_fixed(&mut self, value: &[u8]) -> Result<()> {
        self.sink()?.append(value)
    }

    fn encode_enum(&mut self, index: usize) -> Result<()> {
        self.write_len(index)
    }

    fn array_start(&mut self) -> Result<()> {
        self.sink().map(|_| ())
    }

    fn array_end(&mut self) -> Result<()> {
        self.write_long(0)
    }

    fn map_start(&mut self) -> Result<()> {
        self.sink().map(|_| ())
    }

    fn map_end(&mut self) -> Result<()> {
        self.write_long(0)
    }

    fn set_item_count(&mut self, count: usize) -> Result<()> {
        if count == 0 {
            return self.sink().map(|_| ());
        }
        self.write_len(count)
    }

    fn start_item(&mut self) -> Result<()> {
        self.sink().map(|_| ())
    }

    fn encode_union_index(&mut self, index: usize) -> Result<()> {
        self.write_len(index)
    }
}
