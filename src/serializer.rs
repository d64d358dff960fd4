//! Serializer facade.
//!
//! A [`Serializer`] owns one output buffer and one encoder (plain or
//! validating, chosen at construction). Values are appended one after the
//! other to the same stream until [`reset`](Serializer::reset) starts a new
//! one.
//!
//! # Example
//!
//! ```
//! use avro_binary::Serializer;
//!
//! let mut serializer = Serializer::with_chunk_size(16);
//! serializer.serialize(&"x".repeat(100)).unwrap();
//! serializer.finish();
//!
//! // 2-byte length prefix plus the payload, whatever the chunk size
//! assert_eq!(serializer.size(), 102);
//! assert_eq!(serializer.buffer().len(), 102);
//! ```

use crate::codec::{BinaryEncoder, Encode, Encoder, ValidatingEncoder};
use crate::error::{AvroError, Result};
use crate::schema::ValidSchema;
use crate::stream::{OutputBuffer, Snapshot, DEFAULT_CHUNK_SIZE};

/// Builder for configuring and creating a [`Serializer`].
#[derive(Debug, Clone)]
pub struct SerializerBuilder {
    chunk_size: usize,
    schema: Option<ValidSchema>,
}

impl SerializerBuilder {
    /// Create a builder for a plain serializer with the default chunk size.
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            schema: None,
        }
    }

    /// Set the output buffer chunk size.
    ///
    /// A size of 0 is treated as 1.
    /// Default: 4096
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Validate every write against `schema`.
    pub fn schema(mut self, schema: ValidSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Build the serializer with a fresh output buffer.
    pub fn build(self) -> Serializer {
        let out = OutputBuffer::with_chunk_size(self.chunk_size);
        let validating = self.schema.is_some();
        let encoder: Box<dyn Encoder + Send> = match self.schema {
            Some(schema) => Box::new(ValidatingEncoder::attached(schema, out)),
            None => Box::new(BinaryEncoder::attached(out)),
        };

        tracing::debug!(
            chunk_size = self.chunk_size,
            validating,
            "created serializer"
        );

        Serializer {
            encoder,
            chunk_size: self.chunk_size,
        }
    }
}

impl Default for SerializerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encodes values into an owned, growable buffer.
pub struct Serializer {
    encoder: Box<dyn Encoder + Send>,
    chunk_size: usize,
}

impl Serializer {
    /// Create a serializer builder.
    pub fn builder() -> SerializerBuilder {
        SerializerBuilder::new()
    }

    /// Plain serializer with the default chunk size.
    pub fn new() -> Self {
        SerializerBuilder::new().build()
    }

    /// Plain serializer with the given chunk size.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        SerializerBuilder::new().chunk_size(chunk_size).build()
    }

    /// Validating serializer with the default chunk size.
    pub fn validating(schema: ValidSchema) -> Self {
        SerializerBuilder::new().schema(schema).build()
    }

    /// Validating serializer with the given chunk size.
    pub fn validating_with_chunk_size(schema: ValidSchema, chunk_size: usize) -> Self {
        SerializerBuilder::new()
            .schema(schema)
            .chunk_size(chunk_size)
            .build()
    }

    /// Append the encoding of `value` to the stream.
    ///
    /// # Errors
    ///
    /// - [`AvroError::SchemaValidation`] if a write does not match the schema,
    ///   or if `value` stops before the schema's value is complete
    /// - [`AvroError::OutOfMemory`] if the buffer cannot grow
    ///
    /// On error the stream is left exactly as it was before the call: bytes
    /// already written for `value` are dropped and a validating encoder goes
    /// back to the start of the schema, ready for the next value.
    pub fn serialize<T: Encode + ?Sized>(&mut self, value: &T) -> Result<()> {
        let before = self.encoder.byte_count();
        let result = value.encode(self.encoder.as_mut()).and_then(|()| {
            match self.encoder.pending() {
                Some(expected) => Err(AvroError::validation(expected, "end of value")),
                None => Ok(()),
            }
        });
        if let Err(e) = &result {
            tracing::debug!(
                error = %e,
                dropped = self.encoder.byte_count() - before,
                "serialize failed, rewinding output"
            );
            self.encoder.rewind(before);
        }
        result
    }

    /// Flush the output buffer. Idempotent.
    pub fn finish(&mut self) {
        self.encoder.flush();
    }

    /// Copy of all bytes written so far. Does not consume anything.
    pub fn buffer(&self) -> Vec<u8> {
        self.encoder
            .output()
            .map(OutputBuffer::to_vec)
            .unwrap_or_default()
    }

    /// Total bytes written so far.
    pub fn size(&self) -> usize {
        self.encoder.byte_count()
    }

    /// Configured chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Immutable view of the output, for building a
    /// [`Deserializer`](crate::Deserializer) without copying flushed chunks.
    pub fn snapshot(&self) -> Snapshot {
        self.encoder
            .output()
            .map(OutputBuffer::snapshot)
            .unwrap_or_default()
    }

    /// Flush and hand over the output buffer.
    pub fn into_output(mut self) -> OutputBuffer {
        self.encoder.flush();
        self.encoder
            .release()
            .unwrap_or_else(|| OutputBuffer::with_chunk_size(self.chunk_size))
    }

    /// Discard the stream and start a new one.
    ///
    /// The encoder is kept and re-attached to a fresh buffer of the same
    /// chunk size; a validating encoder starts again at the schema root.
    pub fn reset(&mut self) {
        self.encoder.flush();
        let discarded = self.encoder.release().map_or(0, |out| out.byte_count());
        self.encoder
            .init(OutputBuffer::with_chunk_size(self.chunk_size));
        tracing::debug!(discarded, "reset serializer");
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Serializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Serializer")
            .field("chunk_size", &self.chunk_size)
            .field("size", &self.size())
            .finish()
    }
}
