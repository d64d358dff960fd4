//! JSON schema definitions.
//!
//! Accepts the usual Avro JSON forms: a primitive type name, a JSON array
//! (union), or an object with a `"type"` key. Attributes the binary encoding
//! does not need (`doc`, `default`, `aliases`, `order`, logical types) are
//! ignored.

use serde::Deserialize;

use super::{Field, Schema};
use crate::error::{AvroError, Result};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSchema {
    Name(String),
    Union(Vec<RawSchema>),
    Complex(Box<RawComplex>),
}

#[derive(Debug, Deserialize)]
struct RawComplex {
    #[serde(rename = "type")]
    kind: RawSchema,
    name: Option<String>,
    namespace: Option<String>,
    #[serde(default)]
    fields: Vec<RawField>,
    #[serde(default)]
    symbols: Vec<String>,
    items: Option<RawSchema>,
    values: Option<RawSchema>,
    size: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    name: String,
    #[serde(rename = "type")]
    schema: RawSchema,
}

pub(crate) fn parse_schema(json: &str) -> Result<Schema> {
    let raw: RawSchema = serde_json::from_str(json)?;
    convert(raw, None)
}

fn primitive(name: &str) -> Option<Schema> {
    let schema = match name {
        "null" => Schema::Null,
        "boolean" => Schema::Boolean,
        "int" => Schema::Int,
        "long" => Schema::Long,
        "float" => Schema::Float,
        "double" => Schema::Double,
        "bytes" => Schema::Bytes,
        "string" => Schema::String,
        _ => return None,
    };
    Some(schema)
}

/// Qualify `name` with the explicit or enclosing namespace.
fn full_name(name: &str, namespace: Option<&str>, enclosing: Option<&str>) -> String {
    if name.contains('.') {
        return name.to_string();
    }
    match namespace.or(enclosing) {
        Some(ns) if !ns.is_empty() => format!("{}.{}", ns, name),
        _ => name.to_string(),
    }
}

/// Namespace part of a full name, if any.
fn namespace_of(full: &str) -> Option<&str> {
    full.rfind('.').map(|i| &full[..i])
}

fn convert(raw: RawSchema, ns: Option<&str>) -> Result<Schema> {
    match raw {
        RawSchema::Name(name) => match primitive(&name) {
            Some(schema) => Ok(schema),
            None if matches!(
                name.as_str(),
                "record" | "error" | "enum" | "array" | "map" | "fixed"
            ) =>
            {
                Err(AvroError::Schema(format!(
                    "'{}' must be declared as an object",
                    name
                )))
            }
            None => Ok(Schema::Ref(full_name(&name, None, ns))),
        },
        RawSchema::Union(branches) => Ok(Schema::Union(
            branches
                .into_iter()
                .map(|b| convert(b, ns))
                .collect::<Result<_>>()?,
        )),
        RawSchema::Complex(complex) => convert_complex(*complex, ns),
    }
}

fn convert_complex(raw: RawComplex, ns: Option<&str>) -> Result<Schema> {
    let type_name = match raw.kind {
        RawSchema::Name(name) => name,
        // {"type": [...]} or {"type": {...}}: the wrapper adds nothing
        nested => return convert(nested, ns),
    };

    let named = |what: &str| -> Result<String> {
        let name = raw
            .name
            .as_deref()
            .ok_or_else(|| AvroError::Schema(format!("{} is missing a name", what)))?;
        Ok(full_name(name, raw.namespace.as_deref(), ns))
    };

    match type_name.as_str() {
        "record" | "error" => {
            let name = named("record")?;
            let inner_ns = namespace_of(&name);
            let fields = raw
                .fields
                .into_iter()
                .map(|f| Ok(Field::new(f.name, convert(f.schema, inner_ns)?)))
                .collect::<Result<Vec<_>>>()?;
            Ok(Schema::Record { name, fields })
        }
        "enum" => Ok(Schema::Enum {
            name: named("enum")?,
            symbols: raw.symbols,
        }),
        "fixed" => {
            let name = named("fixed")?;
            let size = raw
                .size
                .ok_or_else(|| AvroError::Schema(format!("fixed '{}' is missing a size", name)))?;
            Ok(Schema::Fixed { name, size })
        }
        "array" => {
            let items = raw
                .items
                .ok_or_else(|| AvroError::Schema("array is missing 'items'".to_string()))?;
            Ok(Schema::Array(Box::new(convert(items, ns)?)))
        }
        "map" => {
            let values = raw
                .values
                .ok_or_else(|| AvroError::Schema("map is missing 'values'".to_string()))?;
            Ok(Schema::Map(Box::new(convert(values, ns)?)))
        }
        other => convert(RawSchema::Name(other.to_string()), ns),
    }
}
