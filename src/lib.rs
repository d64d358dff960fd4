//! # avro-binary
//!
//! Schema-driven binary serialization in the Avro binary encoding.
//!
//! Values are written field by field, in declared order, into a growable
//! buffer made of fixed-size chunks, and read back in the same order.
//! Integers use zig-zag varints, strings and bytes are length-prefixed,
//! arrays and maps are written as counted blocks, and unions as a branch
//! index followed by the branch value.
//!
//! ## Architecture
//!
//! - **Streams**: [`OutputBuffer`](stream::OutputBuffer) (chunked byte sink)
//!   and [`InputBuffer`](stream::InputBuffer) (sequential byte source)
//! - **Codec**: plain and schema-validating encoders/decoders, plus the
//!   [`Encode`]/[`Decode`] value model
//! - **Schema**: compiled, immutable [`ValidSchema`](schema::ValidSchema)
//! - **Facades**: [`Serializer`] and [`Deserializer`] own a buffer and a
//!   codec and expose one-call encode/decode
//!
//! ## Example
//!
//! ```
//! use avro_binary::schema::ValidSchema;
//! use avro_binary::{Deserializer, Serializer};
//!
//! let schema = ValidSchema::parse_str(r#"{
//!     "type": "record",
//!     "name": "Reading",
//!     "fields": [
//!         {"name": "sensor", "type": "string"},
//!         {"name": "value", "type": "double"},
//!         {"name": "tags", "type": {"type": "array", "items": "string"}}
//!     ]
//! }"#).unwrap();
//!
//! let reading = ("sensor-1".to_string(), 21.5f64, vec!["lab".to_string()]);
//!
//! let mut serializer = Serializer::validating(schema.clone());
//! serializer.serialize(&reading).unwrap();
//! serializer.finish();
//!
//! let bytes = serializer.buffer();
//! let mut deserializer = Deserializer::validating_from_slice(schema, &bytes);
//! let back: (String, f64, Vec<String>) = deserializer.deserialize().unwrap();
//! assert_eq!(back, reading);
//! ```

pub mod codec;
pub mod error;
pub mod schema;
pub mod stream;

mod deserializer;
mod serializer;
mod value;

pub use codec::{Decode, Encode};
pub use deserializer::Deserializer;
pub use error::{AvroError, Result};
pub use serializer::{Serializer, SerializerBuilder};
pub use value::{Value, MAX_DEPTH};
