//! Schema-less value tree.
//!
//! [`Value`] can hold anything the binary encoding can express. Encoding a
//! value needs no schema (pair it with a validating encoder to have it
//! checked); decoding one does, since the bytes alone do not say what they
//! are.
//!
//! ```
//! use avro_binary::schema::{Field, Schema, ValidSchema};
//! use avro_binary::{Deserializer, Serializer, Value};
//!
//! let schema = ValidSchema::new(Schema::record(
//!     "Pair",
//!     vec![Field::new("key", Schema::String), Field::new("n", Schema::Int)],
//! ))
//! .unwrap();
//!
//! let value = Value::Record(vec![
//!     ("key".into(), Value::String("a".into())),
//!     ("n".into(), Value::Int(3)),
//! ]);
//!
//! let mut serializer = Serializer::validating(schema.clone());
//! serializer.serialize(&value).unwrap();
//! serializer.finish();
//!
//! let mut deserializer = Deserializer::from_snapshot(serializer.snapshot());
//! assert_eq!(deserializer.deserialize_value(&schema).unwrap(), value);
//! ```

use std::collections::HashMap;

use crate::codec::{decode_block, encode_entries, Decoder, Encode, Encoder};
use crate::error::{AvroError, Result};
use crate::schema::{Node, NodeId, ValidSchema};

/// A decoded or to-be-encoded value of any schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
    Fixed(Vec<u8>),
    /// Symbol index and symbol name.
    Enum(usize, String),
    /// Branch index and branch value.
    Union(usize, Box<Value>),
    Array(Vec<Value>),
    Map(HashMap<String, Value>),
    /// Fields in declared order.
    Record(Vec<(String, Value)>),
}

/// Deepest nesting of unions, arrays, maps and records that
/// [`Value::decode`] accepts.
pub const MAX_DEPTH: usize = 512;

impl Value {
    /// Decode one value of `schema` from `decoder`.
    ///
    /// # Errors
    ///
    /// Fails with [`AvroError::TruncatedInput`] when the input ends early and
    /// with [`AvroError::SchemaMismatch`] when the bytes cannot belong to
    /// `schema` or nest deeper than [`MAX_DEPTH`].
    pub fn decode(schema: &ValidSchema, decoder: &mut dyn Decoder) -> Result<Value> {
        decode_node(schema, schema.root(), decoder, 0)
    }
}

fn decode_node(
    schema: &ValidSchema,
    id: NodeId,
    decoder: &mut dyn Decoder,
    depth: usize,
) -> Result<Value> {
    let value = match schema.node(id) {
        Node::Null => {
            decoder.decode_null()?;
            Value::Null
        }
        Node::Boolean => Value::Boolean(decoder.decode_bool()?),
        Node::Int => Value::Int(decoder.decode_int()?),
        Node::Long => Value::Long(decoder.decode_long()?),
        Node::Float => Value::Float(decoder.decode_float()?),
        Node::Double => Value::Double(decoder.decode_double()?),
        Node::Bytes => Value::Bytes(decoder.decode_bytes()?),
        Node::String => Value::String(decoder.decode_string()?),
        Node::Fixed { size, .. } => Value::Fixed(decoder.decode_fixed(*size)?),
        Node::Enum { name, symbols } => {
            let index = decoder.decode_enum()?;
            let symbol = symbols.get(index).ok_or_else(|| {
                AvroError::SchemaMismatch(format!("enum '{}' has no symbol {}", name, index))
            })?;
            Value::Enum(index, symbol.clone())
        }
        node if depth >= MAX_DEPTH => {
            return Err(AvroError::SchemaMismatch(format!(
                "{} nested deeper than {} levels",
                node.kind(),
                MAX_DEPTH
            )))
        }
        Node::Union(branches) => {
            let index = decoder.decode_union_index()?;
            let branch = *branches.get(index).ok_or_else(|| {
                AvroError::SchemaMismatch(format!("union has no branch {}", index))
            })?;
            Value::Union(
                index,
                Box::new(decode_node(schema, branch, decoder, depth + 1)?),
            )
        }
        Node::Array(item) => {
            let mut items = Vec::new();
            let mut count = decoder.array_start()?;
            while count > 0 {
                decode_block(decoder, count, |decoder| {
                    items.push(decode_node(schema, *item, decoder, depth + 1)?);
                    Ok(())
                })?;
                count = decoder.array_next()?;
            }
            Value::Array(items)
        }
        Node::Map(value) => {
            let mut entries = HashMap::new();
            let mut count = decoder.map_start()?;
            while count > 0 {
                for _ in 0..count {
                    let key = decoder.decode_string()?;
                    entries.insert(key, decode_node(schema, *value, decoder, depth + 1)?);
                }
                count = decoder.map_next()?;
            }
            Value::Map(entries)
        }
        Node::Record { fields, .. } => {
            let mut values = Vec::with_capacity(fields.len());
            for (name, field) in fields {
                values.push((name.clone(), decode_node(schema, *field, decoder, depth + 1)?));
            }
            Value::Record(values)
        }
    };
    Ok(value)
}

impl Encode for Value {
    fn encode(&self, encoder: &mut dyn Encoder) -> Result<()> {
        match self {
            Value::Null => encoder.encode_null(),
            Value::Boolean(b) => encoder.encode_bool(*b),
            Value::Int(n) => encoder.encode_int(*n),
            Value::Long(n) => encoder.encode_long(*n),
            Value::Float(x) => encoder.encode_float(*x),
            Value::Double(x) => encoder.encode_double(*x),
            Value::Bytes(data) => encoder.encode_bytes(data),
            Value::String(s) => encoder.encode_string(s),
            Value::Fixed(data) => encoder.encode_fixed(data),
            Value::Enum(index, _) => encoder.encode_enum(*index),
            Value::Union(index, value) => {
                encoder.encode_union_index(*index)?;
                value.encode(encoder)
            }
            Value::Array(items) => items.encode(encoder),
            Value::Map(entries) => encode_entries(encoder, entries.len(), entries),
            Value::Record(fields) => fields.iter().try_for_each(|(_, v)| v.encode(encoder)),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Float(x)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Double(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(data: Vec<u8>) -> Self {
        Value::Bytes(data)
    }
}
