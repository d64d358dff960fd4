//! Codec module - the binary encoding and its streaming encoders/decoders.
//!
//! This module provides:
//!
//! - [`Encoder`] / [`Decoder`] - the streaming write/read contract
//! - [`BinaryEncoder`] / [`BinaryDecoder`] - the plain binary layout
//! - [`ValidatingEncoder`] / [`ValidatingDecoder`] - the same, checked against a schema
//! - [`Encode`] / [`Decode`] - how Rust values map onto the streaming calls
//!
//! # Example
//!
//! ```
//! use avro_binary::codec::{BinaryDecoder, BinaryEncoder, Decode, Encode, Encoder};
//! use avro_binary::stream::{InputBuffer, OutputBuffer};
//!
//! let mut encoder = BinaryEncoder::attached(OutputBuffer::new());
//! 300i32.encode(&mut encoder).unwrap();
//! encoder.flush();
//!
//! let bytes = encoder.output().unwrap().to_vec();
//! assert_eq!(bytes, vec![0xD8, 0x04]);
//!
//! let mut decoder = BinaryDecoder::attached(InputBuffer::from_slice(&bytes));
//! assert_eq!(i32::decode(&mut decoder).unwrap(), 300);
//! ```

mod decoder;
mod encoder;
mod traits;
mod validating;

pub mod varint;

pub use decoder::{BinaryDecoder, Decoder};
pub use encoder::{BinaryEncoder, Encoder};
pub use traits::{Decode, Encode, MAX_EMPTY_ITEMS};
pub use validating::{ValidatingDecoder, ValidatingEncoder};

pub(crate) use traits::{decode_block, encode_entries};
