//! Schema-checking wrappers around the binary encoder and decoder.
//!
//! Before each write or read the wrapper asks the [`Validator`] whether the
//! request matches the next element the schema expects. A rejected request
//! fails with [`AvroError::SchemaValidation`] and touches neither the output
//! buffer nor the input cursor.

use super::decoder::{BinaryDecoder, Decoder};
use super::encoder::{BinaryEncoder, Encoder};
use crate::error::{AvroError, Result};
use crate::schema::{Action, ValidSchema, Validator};
use crate::stream::{InputBuffer, Mark, OutputBuffer};

/// Encoder that checks every write against a compiled schema.
#[derive(Debug)]
pub struct ValidatingEncoder {
    validator: Validator,
    inner: BinaryEncoder,
}

impl ValidatingEncoder {
    /// Create a detached validating encoder for `schema`.
    pub fn new(schema: ValidSchema) -> Self {
        Self {
            validator: Validator::new(schema),
            inner: BinaryEncoder::new(),
        }
    }

    /// Create a validating encoder attached to `out`.
    pub fn attached(schema: ValidSchema, out: OutputBuffer) -> Self {
        let mut encoder = Self::new(schema);
        encoder.init(out);
        encoder
    }

    /// The schema values are checked against.
    pub fn schema(&self) -> &ValidSchema {
        self.validator.schema()
    }

    /// Check `action`, run `write`, then move the cursor.
    ///
    /// The cursor only moves once the bytes are in the buffer, so neither a
    /// rejected action nor a failed write leaves it half advanced.
    fn checked(
        &mut self,
        action: Action,
        write: impl FnOnce(&mut BinaryEncoder) -> Result<()>,
    ) -> Result<()> {
        if self.inner.output().is_none() {
            return Err(AvroError::Detached);
        }
        self.validator.accepts(action)?;
        write(&mut self.inner)?;
        self.validator.advance(action)
    }
}

impl Encoder for ValidatingEncoder {
    fn init(&mut self, out: OutputBuffer) {
        self.validator.reset();
        self.inner.init(out);
    }

    fn release(&mut self) -> Option<OutputBuffer> {
        self.inner.release()
    }

    fn output(&self) -> Option<&OutputBuffer> {
        self.inner.output()
    }

    fn flush(&mut self) {
        self.inner.flush();
    }

    fn rewind(&mut self, byte_count: usize) {
        self.inner.rewind(byte_count);
        self.validator.reset();
    }

    fn pending(&self) -> Option<String> {
        if self.validator.at_value_boundary() {
            None
        } else {
            Some(self.validator.expected())
        }
    }

    fn encode_null(&mut self) -> Result<()> {
        self.checked(Action::Null, |e| e.encode_null())
    }

    fn encode_bool(&mut self, value: bool) -> Result<()> {
        self.checked(Action::Boolean, |e| e.encode_bool(value))
    }

    fn encode_int(&mut self, value: i32) -> Result<()> {
        self.checked(Action::Int, |e| e.encode_int(value))
    }

    fn encode_long(&mut self, value: i64) -> Result<()> {
        self.checked(Action::Long, |e| e.encode_long(value))
    }

    fn encode_float(&mut self, value: f32) -> Result<()> {
        self.checked(Action::Float, |e| e.encode_float(value))
    }

    fn encode_double(&mut self, value: f64) -> Result<()> {
        self.checked(Action::Double, |e| e.encode_double(value))
    }

    fn encode_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.checked(Action::Bytes, |e| e.encode_bytes(value))
    }

    fn encode_string(&mut self, value: &str) -> Result<()> {
        self.checked(Action::String, |e| e.encode_string(value))
    }

    fn encode_fixed(&mut self, value: &[u8]) -> Result<()> {
        self.checked(Action::Fixed(value.len()), |e| e.encode_fixed(value))
    }

    fn encode_enum(&mut self, index: usize) -> Result<()> {
        self.checked(Action::Enum(Some(index)), |e| e.encode_enum(index))
    }

    fn array_start(&mut self) -> Result<()> {
        self.checked(Action::ArrayStart, |e| e.array_start())
    }

    fn array_end(&mut self) -> Result<()> {
        self.checked(Action::ArrayEnd, |e| e.array_end())
    }

    fn map_start(&mut self) -> Result<()> {
        self.checked(Action::MapStart, |e| e.map_start())
    }

    fn map_end(&mut self) -> Result<()> {
        self.checked(Action::MapEnd, |e| e.map_end())
    }

    fn set_item_count(&mut self, count: usize) -> Result<()> {
        self.checked(Action::ItemCount(count), |e| e.set_item_count(count))
    }

    fn start_item(&mut self) -> Result<()> {
        self.checked(Action::StartItem, |e| e.start_item())
    }

    fn encode_union_index(&mut self, index: usize) -> Result<()> {
        self.checked(Action::Union(Some(index)), |e| e.encode_union_index(index))
    }
}

/// Decoder that checks every read against a compiled schema.
#[derive(Debug)]
pub struct ValidatingDecoder<'a> {
    validator: Validator,
    inner: BinaryDecoder<'a>,
}

impl<'a> ValidatingDecoder<'a> {
    /// Create a detached validating decoder for `schema`.
    pub fn new(schema: ValidSchema) -> Self {
        Self {
            validator: Validator::new(schema),
            inner: BinaryDecoder::new(),
        }
    }

    /// Create a validating decoder attached to `input`.
    pub fn attached(schema: ValidSchema, input: InputBuffer<'a>) -> Self {
        let mut decoder = Self::new(schema);
        decoder.init(input);
        decoder
    }

    /// Attach to `input` and rewind the schema cursor.
    pub fn init(&mut self, input: InputBuffer<'a>) {
        self.validator.reset();
        self.inner.init(input);
    }

    /// Detach and return the input.
    pub fn release(&mut self) -> Option<InputBuffer<'a>> {
        self.inner.release()
    }

    /// The schema values are checked against.
    pub fn schema(&self) -> &ValidSchema {
        self.validator.schema()
    }

    pub(crate) fn mark(&self) -> Result<Mark> {
        self.inner.mark()
    }

    /// Go back to `mark`, which must have been taken at a value boundary.
    pub(crate) fn rewind(&mut self, mark: Mark) {
        self.inner.restore(mark);
        self.validator.reset();
    }

    /// Check that a read of kind `kind` is expected, read the value, then
    /// move the cursor with the actions derived from what was read.
    ///
    /// A kind that is rejected consumes nothing. Decoded data the schema
    /// does not allow (an index out of range, say) is reported as a
    /// mismatch and the input is rewound.
    fn checked<T>(
        &mut self,
        kind: Action,
        read: impl FnOnce(&mut BinaryDecoder<'a>) -> Result<T>,
        actions: impl FnOnce(&T) -> Vec<Action>,
    ) -> Result<T> {
        let mark = self.inner.mark()?;
        self.validator.accepts(kind)?;
        let value = read(&mut self.inner)?;
        if let Err(e) = self.validator.advance_all(&actions(&value)) {
            self.inner.restore(mark);
            return Err(AvroError::SchemaMismatch(e.to_string()));
        }
        Ok(value)
    }

    /// Read a value whose kind alone decides the cursor step.
    fn simple<T>(
        &mut self,
        action: Action,
        read: impl FnOnce(&mut BinaryDecoder<'a>) -> Result<T>,
    ) -> Result<T> {
        self.checked(action, read, |_| vec![action])
    }
}

fn block_actions(start: Option<Action>, end: Action, count: usize) -> Vec<Action> {
    let next = if count == 0 {
        end
    } else {
        Action::ItemCount(count)
    };
    start.into_iter().chain(std::iter::once(next)).collect()
}

impl Decoder for ValidatingDecoder<'_> {
    fn bytes_remaining(&self) -> usize {
        self.inner.bytes_remaining()
    }

    fn pending(&self) -> Option<String> {
        if self.validator.at_value_boundary() {
            None
        } else {
            Some(self.validator.expected())
        }
    }

    fn decode_null(&mut self) -> Result<()> {
        self.simple(Action::Null, |d| d.decode_null())
    }

    fn decode_bool(&mut self) -> Result<bool> {
        self.simple(Action::Boolean, |d| d.decode_bool())
    }

    fn decode_int(&mut self) -> Result<i32> {
        self.simple(Action::Int, |d| d.decode_int())
    }

    fn decode_long(&mut self) -> Result<i64> {
        self.simple(Action::Long, |d| d.decode_long())
    }

    fn decode_float(&mut self) -> Result<f32> {
        self.simple(Action::Float, |d| d.decode_float())
    }

    fn decode_double(&mut self) -> Result<f64> {
        self.simple(Action::Double, |d| d.decode_double())
    }

    fn decode_bytes(&mut self) -> Result<Vec<u8>> {
        self.simple(Action::Bytes, |d| d.decode_bytes())
    }

    fn decode_string(&mut self) -> Result<String> {
        self.simple(Action::String, |d| d.decode_string())
    }

    fn decode_fixed(&mut self, size: usize) -> Result<Vec<u8>> {
        self.simple(Action::Fixed(size), |d| d.decode_fixed(size))
    }

    fn decode_enum(&mut self) -> Result<usize> {
        self.checked(
            Action::Enum(None),
            |d| d.decode_enum(),
            |index| vec![Action::Enum(Some(*index))],
        )
    }

    fn array_start(&mut self) -> Result<usize> {
        self.checked(
            Action::ArrayStart,
            |d| d.array_start(),
            |count| block_actions(Some(Action::ArrayStart), Action::ArrayEnd, *count),
        )
    }

    fn array_next(&mut self) -> Result<usize> {
        self.checked(
            Action::ArrayEnd,
            |d| d.array_next(),
            |count| block_actions(None, Action::ArrayEnd, *count),
        )
    }

    fn map_start(&mut self) -> Result<usize> {
        self.checked(
            Action::MapStart,
            |d| d.map_start(),
            |count| block_actions(Some(Action::MapStart), Action::MapEnd, *count),
        )
    }

    fn map_next(&mut self) -> Result<usize> {
        self.checked(
            Action::MapEnd,
            |d| d.map_next(),
            |count| block_actions(None, Action::MapEnd, *count),
        )
    }

    fn decode_union_index(&mut self) -> Result<usize> {
        self.checked(
            Action::Union(None),
            |d| d.decode_union_index(),
            |index| vec![Action::Union(Some(*index))],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, Schema};

    fn schema(schema: Schema) -> ValidSchema {
        ValidSchema::new(schema).unwrap()
    }

    fn user() -> ValidSchema {
        schema(Schema::record(
            "User",
            vec![
                Field::new("id", Schema::Long),
                Field::new("name", Schema::String),
            ],
        ))
    }

    #[test]
    fn test_rejected_write_leaves_buffer_untouched() {
        let mut encoder = ValidatingEncoder::attached(schema(Schema::Int), OutputBuffer::new());
        encoder.encode_int(1).unwrap();
        let before = encoder.byte_count();

        let err = encoder.encode_string("nope").unwrap_err();
        assert_eq!(
            err.to_string(),
            "schema validation error: expected int, got string"
        );
        assert_eq!(encoder.byte_count(), before);
        assert!(encoder.pending().is_none());
    }

    #[test]
    fn test_detached_is_checked_first() {
        let mut encoder = ValidatingEncoder::new(schema(Schema::Int));
        assert!(matches!(encoder.encode_string("x"), Err(AvroError::Detached)));
    }

    #[test]
    fn test_pending_mid_record() {
        let mut encoder = ValidatingEncoder::attached(user(), OutputBuffer::new());
        encoder.encode_long(7).unwrap();
        assert_eq!(encoder.pending().as_deref(), Some("string"));
        encoder.encode_string("ann").unwrap();
        assert!(encoder.pending().is_none());
    }

    #[test]
    fn test_init_rewinds_cursor() {
        let mut encoder = ValidatingEncoder::attached(user(), OutputBuffer::new());
        encoder.encode_long(7).unwrap();

        encoder.init(OutputBuffer::new());
        assert!(encoder.pending().is_none());
        encoder.encode_long(8).unwrap();
        assert_eq!(encoder.byte_count(), 1);
    }

    #[test]
    fn test_validated_array_round_trip() {
        let array = schema(Schema::array(Schema::Int));
        let mut encoder = ValidatingEncoder::attached(array.clone(), OutputBuffer::new());
        encoder.array_start().unwrap();
        encoder.set_item_count(2).unwrap();
        encoder.start_item().unwrap();
        encoder.encode_int(1).unwrap();
        encoder.start_item().unwrap();
        encoder.encode_int(2).unwrap();
        encoder.array_end().unwrap();
        assert!(encoder.pending().is_none());

        let out = encoder.release().unwrap();
        let mut decoder = ValidatingDecoder::attached(array, InputBuffer::from_output(&out));
        assert_eq!(decoder.array_start().unwrap(), 2);
        assert_eq!(decoder.decode_int().unwrap(), 1);
        assert_eq!(decoder.decode_int().unwrap(), 2);
        assert_eq!(decoder.array_next().unwrap(), 0);
        assert!(decoder.pending().is_none());
        assert_eq!(decoder.bytes_remaining(), 0);
    }

    #[test]
    fn test_decoder_rejects_wrong_kind_without_consuming() {
        let bytes = [0x0E, 0x06, b'a', b'n', b'n'];
        let mut decoder = ValidatingDecoder::attached(user(), InputBuffer::from_slice(&bytes));

        assert!(matches!(
            decoder.decode_string(),
            Err(AvroError::SchemaValidation { .. })
        ));
        assert_eq!(decoder.bytes_remaining(), 5);

        assert_eq!(decoder.decode_long().unwrap(), 7);
        assert_eq!(decoder.decode_string().unwrap(), "ann");
        assert!(decoder.pending().is_none());
    }

    #[test]
    fn test_decoded_union_index_out_of_range() {
        let bytes = [0x04];
        let mut decoder = ValidatingDecoder::attached(
            schema(Schema::optional(Schema::Int)),
            InputBuffer::from_slice(&bytes),
        );
        assert!(matches!(
            decoder.decode_union_index(),
            Err(AvroError::SchemaMismatch(_))
        ));
        assert_eq!(decoder.bytes_remaining(), 1);
        assert!(decoder.pending().is_none());
    }

    #[test]
    fn test_array_next_with_items_outstanding() {
        let bytes = [0x04, 0x02, 0x04, 0x00];
        let mut decoder = ValidatingDecoder::attached(
            schema(Schema::array(Schema::Int)),
            InputBuffer::from_slice(&bytes),
        );
        assert_eq!(decoder.array_start().unwrap(), 2);
        decoder.decode_int().unwrap();
        assert!(matches!(
            decoder.array_next(),
            Err(AvroError::SchemaValidation { .. })
        ));
        assert_eq!(decoder.bytes_remaining(), 2);
    }
}
