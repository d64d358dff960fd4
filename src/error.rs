//! Error types for avro-binary.

use thiserror::Error;

/// Main error type for all encode/decode operations.
#[derive(Debug, Error)]
pub enum AvroError {
    /// Growing the output buffer failed to allocate a new chunk.
    #[error("out of memory: failed to allocate {requested} bytes")]
    OutOfMemory {
        /// Size of the allocation that failed.
        requested: usize,
    },

    /// The decoder needed more bytes than the input holds.
    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput {
        /// Bytes required by the value being read.
        needed: usize,
        /// Bytes left in the input when the read began.
        remaining: usize,
    },

    /// A write or read request disagrees with the next schema element.
    #[error("schema validation error: expected {expected}, got {actual}")]
    SchemaValidation {
        /// What the schema expects next.
        expected: String,
        /// What the caller attempted.
        actual: String,
    },

    /// Decoded data does not line up with the schema or the binary layout.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// The schema definition itself is invalid.
    #[error("invalid schema: {0}")]
    Schema(String),

    /// Schema JSON could not be parsed.
    #[error("schema JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Encoder or decoder used while not attached to a buffer.
    #[error("encoder/decoder is not attached to a buffer")]
    Detached,
}

impl AvroError {
    /// Creates a validation error from the expected and actual kinds.
    pub fn validation(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::SchemaValidation {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Returns true for errors caused by input running out.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::TruncatedInput { .. })
    }
}

/// Result type alias using AvroError.
pub type Result<T> = std::result::Result<T, AvroError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_both_kinds() {
        let err = AvroError::validation("int", "string");
        assert_eq!(
            err.to_string(),
            "schema validation error: expected int, got string"
        );
    }

    #[test]
    fn test_truncated_message() {
        let err = AvroError::TruncatedInput {
            needed: 4,
            remaining: 1,
        };
        assert!(err.is_truncated());
        assert!(err.to_string().contains("needed 4 bytes, 1 remaining"));
    }

    #[test]
    fn test_json_error_converts() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: AvroError = parse.unwrap_err().into();
        assert!(matches!(err, AvroError::Json(_)));
    }
}
