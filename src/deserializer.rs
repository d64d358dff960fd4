//! Deserializer facade.
//!
//! A [`Deserializer`] owns one input buffer and one decoder (plain or
//! validating) and reads values off the stream left to right. Each
//! `deserialize*` call is all-or-nothing: when a value cannot be read in
//! full, the cursor goes back to where the call began and no value is
//! returned.
//!
//! The input is either borrowed caller memory, which ties the deserializer to
//! the lifetime of that memory, or a snapshot of an output buffer.

use crate::codec::{BinaryDecoder, Decode, Decoder, ValidatingDecoder};
use crate::error::{AvroError, Result};
use crate::schema::ValidSchema;
use crate::stream::{InputBuffer, Mark, OutputBuffer, Snapshot};
use crate::value::Value;

enum DecoderKind<'a> {
    Plain(BinaryDecoder<'a>),
    Validating(ValidatingDecoder<'a>),
}

impl<'a> DecoderKind<'a> {
    fn as_dyn(&mut self) -> &mut (dyn Decoder + 'a) {
        match self {
            DecoderKind::Plain(d) => d,
            DecoderKind::Validating(d) => d,
        }
    }

    fn mark(&self) -> Result<Mark> {
        match self {
            DecoderKind::Plain(d) => d.mark(),
            DecoderKind::Validating(d) => d.mark(),
        }
    }

    fn rewind(&mut self, mark: Mark) {
        match self {
            DecoderKind::Plain(d) => d.restore(mark),
            DecoderKind::Validating(d) => d.rewind(mark),
        }
    }
}

/// Decodes values from a borrowed slice or an output snapshot.
pub struct Deserializer<'a> {
    decoder: DecoderKind<'a>,
}

impl<'a> Deserializer<'a> {
    fn plain(input: InputBuffer<'a>) -> Self {
        tracing::debug!(bytes = input.len(), validating = false, "created deserializer");
        Self {
            decoder: DecoderKind::Plain(BinaryDecoder::attached(input)),
        }
    }

    fn checked(schema: ValidSchema, input: InputBuffer<'a>) -> Self {
        tracing::debug!(bytes = input.len(), validating = true, "created deserializer");
        Self {
            decoder: DecoderKind::Validating(ValidatingDecoder::attached(schema, input)),
        }
    }

    /// Read from caller-owned memory.
    pub fn from_slice(data: &'a [u8]) -> Self {
        Self::plain(InputBuffer::from_slice(data))
    }

    /// Read the current contents of an output buffer.
    pub fn from_output(out: &OutputBuffer) -> Self {
        Self::plain(InputBuffer::from_output(out))
    }

    /// Read from an output snapshot, sharing its chunks.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self::plain(InputBuffer::from_snapshot(snapshot))
    }

    /// Read from caller-owned memory, checking every read against `schema`.
    pub fn validating_from_slice(schema: ValidSchema, data: &'a [u8]) -> Self {
        Self::checked(schema, InputBuffer::from_slice(data))
    }

    /// Read an output buffer, checking every read against `schema`.
    pub fn validating_from_output(schema: ValidSchema, out: &OutputBuffer) -> Self {
        Self::checked(schema, InputBuffer::from_output(out))
    }

    /// Read an output snapshot, checking every read against `schema`.
    pub fn validating_from_snapshot(schema: ValidSchema, snapshot: Snapshot) -> Self {
        Self::checked(schema, InputBuffer::from_snapshot(snapshot))
    }

    /// Unread bytes left in the input.
    pub fn bytes_remaining(&self) -> usize {
        match &self.decoder {
            DecoderKind::Plain(d) => d.bytes_remaining(),
            DecoderKind::Validating(d) => d.bytes_remaining(),
        }
    }

    /// Decode the next value.
    ///
    /// # Errors
    ///
    /// - [`AvroError::TruncatedInput`] if the input ends inside the value
    /// - [`AvroError::SchemaValidation`] if the requested reads do not match
    ///   the schema, or stop before the schema's value is complete
    /// - [`AvroError::SchemaMismatch`] if the bytes are not a valid encoding
    pub fn deserialize<T: Decode>(&mut self) -> Result<T> {
        self.read(|decoder| T::decode(decoder))
    }

    /// Decode the next value into `target`, which is left untouched on error.
    pub fn deserialize_into<T: Decode>(&mut self, target: &mut T) -> Result<()> {
        *target = self.deserialize()?;
        Ok(())
    }

    /// Decode the next value as a [`Value`] of `schema`.
    pub fn deserialize_value(&mut self, schema: &ValidSchema) -> Result<Value> {
        self.read(|decoder| Value::decode(schema, decoder))
    }

    fn read<T>(&mut self, read: impl FnOnce(&mut dyn Decoder) -> Result<T>) -> Result<T> {
        let mark = self.decoder.mark()?;
        let result = read(self.decoder.as_dyn()).and_then(|value| {
            match self.decoder.as_dyn().pending() {
                Some(expected) => Err(AvroError::validation(expected, "end of value")),
                None => Ok(value),
            }
        });
        if let Err(e) = &result {
            tracing::debug!(error = %e, "deserialize failed, rewinding input");
            self.decoder.rewind(mark);
        }
        result
    }
}

impl std::fmt::Debug for Deserializer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deserializer")
            .field(
                "validating",
                &matches!(self.decoder, DecoderKind::Validating(_)),
            )
            .field("bytes_remaining", &self.bytes_remaining())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, Schema};
    use crate::Serializer;

    fn pair() -> ValidSchema {
        ValidSchema::new(Schema::record(
            "Pair",
            vec![Field::new("a", Schema::Int), Field::new("b", Schema::String)],
        ))
        .unwrap()
    }

    #[test]
    fn test_slice_round_trip() {
        let bytes = [0xD8, 0x04, 0x02, b'z'];
        let mut de = Deserializer::from_slice(&bytes);
        assert_eq!(de.deserialize::<i32>().unwrap(), 300);
        assert_eq!(de.deserialize::<String>().unwrap(), "z");
        assert_eq!(de.bytes_remaining(), 0);
    }

    #[test]
    fn test_truncated_value_rewinds() {
        let bytes = [0x02, 0x06, b'a'];
        let mut de = Deserializer::from_slice(&bytes);
        let err = de.deserialize::<(i32, String)>().unwrap_err();
        assert!(err.is_truncated());
        assert_eq!(de.bytes_remaining(), 3);
        assert_eq!(de.deserialize::<i32>().unwrap(), 1);
    }

    #[test]
    fn test_deserialize_into_keeps_target_on_error() {
        let bytes = [0x0A, b'h'];
        let mut de = Deserializer::from_slice(&bytes);
        let mut target = String::from("old");
        assert!(de.deserialize_into(&mut target).is_err());
        assert_eq!(target, "old");
    }

    #[test]
    fn test_validating_rejects_partial_value() {
        let mut serializer = Serializer::validating(pair());
        serializer.serialize(&(5i32, "five".to_string())).unwrap();
        serializer.finish();

        let mut de = Deserializer::validating_from_snapshot(pair(), serializer.snapshot());
        let err = de.deserialize::<i32>().unwrap_err();
        assert!(matches!(err, AvroError::SchemaValidation { .. }));
        assert_eq!(de.bytes_remaining(), serializer.size());

        let (a, b) = de.deserialize::<(i32, String)>().unwrap();
        assert_eq!((a, b.as_str()), (5, "five"));
    }

    #[test]
    fn test_validating_wrong_kind() {
        let bytes = [0x02, 0x02, b'x'];
        let mut de = Deserializer::validating_from_slice(pair(), &bytes);
        let err = de.deserialize::<String>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "schema validation error: expected int, got string"
        );
        assert_eq!(de.bytes_remaining(), 3);
    }

    #[test]
    fn test_validating_array_of_empty_records() {
        let schema = ValidSchema::new(Schema::array(Schema::record("Empty", vec![]))).unwrap();
        let empty = Value::Record(Vec::new());

        let bytes = [0x04, 0x00];
        let mut de = Deserializer::validating_from_slice(schema.clone(), &bytes);
        assert_eq!(
            de.deserialize_value(&schema).unwrap(),
            Value::Array(vec![empty.clone(), empty.clone()])
        );
        assert_eq!(de.bytes_remaining(), 0);

        let mut serializer = Serializer::validating(schema.clone());
        serializer.serialize(&Value::Array(vec![empty; 3])).unwrap();
        serializer.finish();
        assert_eq!(serializer.buffer(), vec![0x06, 0x00]);
    }

    #[test]
    fn test_from_output() {
        let mut serializer = Serializer::new();
        serializer.serialize(&Some(2.5f64)).unwrap();
        let out = serializer.into_output();

        let mut de = Deserializer::from_output(&out);
        assert_eq!(de.deserialize::<Option<f64>>().unwrap(), Some(2.5));
    }
}
