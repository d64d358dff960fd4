//! Schema model and compiled schema.
//!
//! A [`Schema`] is a plain tree describing the shape of a value. Compiling it
//! into a [`ValidSchema`] checks it for consistency and flattens it into an
//! arena of nodes, resolving named references so recursive types work.
//!
//! # Example
//!
//! ```
//! use avro_binary::schema::{Field, Schema, ValidSchema};
//!
//! let schema = Schema::record(
//!     "Point",
//!     vec![Field::new("x", Schema::Int), Field::new("y", Schema::Int)],
//! );
//! let compiled = ValidSchema::new(schema).unwrap();
//!
//! let same = ValidSchema::parse_str(r#"{
//!     "type": "record",
//!     "name": "Point",
//!     "fields": [{"name": "x", "type": "int"}, {"name": "y", "type": "int"}]
//! }"#).unwrap();
//! assert_eq!(compiled.root_kind(), same.root_kind());
//! ```

mod parse;
mod validator;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::error::{AvroError, Result};

pub(crate) use validator::{Action, Validator};

/// Index of a node inside a compiled schema.
pub type NodeId = usize;

/// The kind of a schema element, used in validation messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Record,
    Enum,
    Array,
    Map,
    Union,
    Fixed,
}

impl SchemaKind {
    /// Lower-case Avro type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::Null => "null",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Int => "int",
            SchemaKind::Long => "long",
            SchemaKind::Float => "float",
            SchemaKind::Double => "double",
            SchemaKind::Bytes => "bytes",
            SchemaKind::String => "string",
            SchemaKind::Record => "record",
            SchemaKind::Enum => "enum",
            SchemaKind::Array => "array",
            SchemaKind::Map => "map",
            SchemaKind::Union => "union",
            SchemaKind::Fixed => "fixed",
        }
    }

    fn is_named(&self) -> bool {
        matches!(self, SchemaKind::Record | SchemaKind::Enum | SchemaKind::Fixed)
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uncompiled schema tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    /// Named record with fields in declared order.
    Record { name: String, fields: Vec<Field> },
    /// Named enumeration; values are encoded by symbol index.
    Enum { name: String, symbols: Vec<String> },
    Array(Box<Schema>),
    /// Map with string keys.
    Map(Box<Schema>),
    Union(Vec<Schema>),
    /// Named fixed-size byte string.
    Fixed { name: String, size: usize },
    /// Reference to a named type defined elsewhere in the same schema.
    Ref(String),
}

/// A record field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }
}

impl Schema {
    pub fn record(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Schema::Record {
            name: name.into(),
            fields,
        }
    }

    pub fn enumeration(name: impl Into<String>, symbols: &[&str]) -> Self {
        Schema::Enum {
            name: name.into(),
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn array(items: Schema) -> Self {
        Schema::Array(Box::new(items))
    }

    pub fn map(values: Schema) -> Self {
        Schema::Map(Box::new(values))
    }

    pub fn fixed(name: impl Into<String>, size: usize) -> Self {
        Schema::Fixed {
            name: name.into(),
            size,
        }
    }

    /// Union of `null` and `schema`, in that order.
    pub fn optional(schema: Schema) -> Self {
        Schema::Union(vec![Schema::Null, schema])
    }
}

/// A node of the compiled schema arena.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Record {
        name: String,
        fields: Vec<(String, NodeId)>,
    },
    Enum {
        name: String,
        symbols: Vec<String>,
    },
    Array(NodeId),
    Map(NodeId),
    Union(Vec<NodeId>),
    Fixed {
        name: String,
        size: usize,
    },
}

impl Node {
    pub(crate) fn kind(&self) -> SchemaKind {
        match self {
            Node::Null => SchemaKind::Null,
            Node::Boolean => SchemaKind::Boolean,
            Node::Int => SchemaKind::Int,
            Node::Long => SchemaKind::Long,
            Node::Float => SchemaKind::Float,
            Node::Double => SchemaKind::Double,
            Node::Bytes => SchemaKind::Bytes,
            Node::String => SchemaKind::String,
            Node::Record { .. } => SchemaKind::Record,
            Node::Enum { .. } => SchemaKind::Enum,
            Node::Array(_) => SchemaKind::Array,
            Node::Map(_) => SchemaKind::Map,
            Node::Union(_) => SchemaKind::Union,
            Node::Fixed { .. } => SchemaKind::Fixed,
        }
    }

    fn name(&self) -> Option<&str> {
        match self {
            Node::Record { name, .. } | Node::Enum { name, .. } | Node::Fixed { name, .. } => {
                Some(name)
            }
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Compiled {
    nodes: Vec<Node>,
    root: NodeId,
}

/// Immutable, compiled schema.
///
/// Cloning is cheap: all clones share the same compiled nodes.
#[derive(Debug, Clone)]
pub struct ValidSchema {
    inner: Arc<Compiled>,
}

impl ValidSchema {
    /// Compile a schema tree.
    ///
    /// # Errors
    ///
    /// Returns [`AvroError::Schema`] for duplicate names or fields, empty or
    /// duplicate enum symbols, nested unions, ambiguous union branches and
    /// unknown references.
    pub fn new(schema: Schema) -> Result<Self> {
        let mut compiler = Compiler::default();
        let root = compiler.compile(&schema)?;
        compiler.check_recursion()?;
        tracing::debug!(
            nodes = compiler.nodes.len(),
            root = %compiler.nodes[root].kind(),
            "compiled schema"
        );
        Ok(Self {
            inner: Arc::new(Compiled {
                nodes: compiler.nodes,
                root,
            }),
        })
    }

    /// Parse and compile a JSON schema definition.
    ///
    /// # Errors
    ///
    /// Returns [`AvroError::Json`] for malformed JSON and
    /// [`AvroError::Schema`] for invalid definitions.
    pub fn parse_str(json: &str) -> Result<Self> {
        Self::new(parse::parse_schema(json)?)
    }

    /// Kind of the top-level schema element.
    pub fn root_kind(&self) -> SchemaKind {
        self.node(self.inner.root).kind()
    }

    #[inline]
    pub(crate) fn root(&self) -> NodeId {
        self.inner.root
    }

    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.inner.nodes[id]
    }
}

#[derive(Default)]
struct Compiler {
    nodes: Vec<Node>,
    names: HashMap<String, NodeId>,
}

impl Compiler {
    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn define(&mut self, name: &str, node: Node) -> Result<NodeId> {
        if name.is_empty() {
            return Err(AvroError::Schema(format!(
                "{} must have a name",
                node.kind()
            )));
        }
        if self.names.contains_key(name) {
            return Err(AvroError::Schema(format!("duplicate type name '{}'", name)));
        }
        let id = self.push(node);
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Reject records that contain themselves through record fields alone.
    /// Such a value would never end; recursion has to pass through a union,
    /// array or map.
    fn check_recursion(&self) -> Result<()> {
        for (id, node) in self.nodes.iter().enumerate() {
            if let Node::Record { name, .. } = node {
                if self.reaches(id, id, &mut HashSet::new()) {
                    return Err(AvroError::Schema(format!(
                        "record '{}' contains itself without a union, array or map in between",
                        name
                    )));
                }
            }
        }
        Ok(())
    }

    fn reaches(&self, from: NodeId, target: NodeId, seen: &mut HashSet<NodeId>) -> bool {
        let Node::Record { fields, .. } = &self.nodes[from] else {
            return false;
        };
        fields.iter().any(|&(_, field)| {
            field == target || (seen.insert(field) && self.reaches(field, target, seen))
        })
    }

    fn compile(&mut self, schema: &Schema) -> Result<NodeId> {
        let id = match schema {
            Schema::Null => self.push(Node::Null),
            Schema::Boolean => self.push(Node::Boolean),
            Schema::Int => self.push(Node::Int),
            Schema::Long => self.push(Node::Long),
            Schema::Float => self.push(Node::Float),
            Schema::Double => self.push(Node::Double),
            Schema::Bytes => self.push(Node::Bytes),
            Schema::String => self.push(Node::String),
            Schema::Record { name, fields } => {
                // Registered before the fields so they can refer back to it.
                let id = self.define(
                    name,
                    Node::Record {
                        name: name.clone(),
                        fields: Vec::new(),
                    },
                )?;
                let mut seen = HashSet::new();
                let mut compiled = Vec::with_capacity(fields.len());
                for field in fields {
                    if !seen.insert(field.name.as_str()) {
                        return Err(AvroError::Schema(format!(
                            "duplicate field '{}' in record '{}'",
                            field.name, name
                        )));
                    }
                    compiled.push((field.name.clone(), self.compile(&field.schema)?));
                }
                if let Node::Record { fields, .. } = &mut self.nodes[id] {
                    *fields = compiled;
                }
                id
            }
            Schema::Enum { name, symbols } => {
                if symbols.is_empty() {
                    return Err(AvroError::Schema(format!(
                        "enum '{}' has no symbols",
                        name
                    )));
                }
                let mut seen = HashSet::new();
                if let Some(dup) = symbols.iter().find(|s| !seen.insert(s.as_str())) {
                    return Err(AvroError::Schema(format!(
                        "duplicate symbol '{}' in enum '{}'",
                        dup, name
                    )));
                }
                self.define(
                    name,
                    Node::Enum {
                        name: name.clone(),
                        symbols: symbols.clone(),
                    },
                )?
            }
            Schema::Array(items) => {
                let item = self.compile(items)?;
                self.push(Node::Array(item))
            }
            Schema::Map(values) => {
                let value = self.compile(values)?;
                self.push(Node::Map(value))
            }
            Schema::Union(branches) => {
                let mut compiled = Vec::with_capacity(branches.len());
                let mut seen: HashSet<(SchemaKind, Option<String>)> = HashSet::new();
                for branch in branches {
                    let id = self.compile(branch)?;
                    let node = &self.nodes[id];
                    let kind = node.kind();
                    if kind == SchemaKind::Union {
                        return Err(AvroError::Schema(
                            "unions may not immediately contain other unions".to_string(),
                        ));
                    }
                    let key = (kind, node.name().map(str::to_string));
                    if !seen.insert(key) {
                        let what = if kind.is_named() {
                            format!("{} '{}'", kind, node.name().unwrap_or_default())
                        } else {
                            kind.to_string()
                        };
                        return Err(AvroError::Schema(format!(
                            "union contains {} more than once",
                            what
                        )));
                    }
                    compiled.push(id);
                }
                self.push(Node::Union(compiled))
            }
            Schema::Fixed { name, size } => self.define(
                name,
                Node::Fixed {
                    name: name.clone(),
                    size: *size,
                },
            )?,
            Schema::Ref(name) => *self
                .names
                .get(name)
                .ok_or_else(|| AvroError::Schema(format!("unknown type '{}'", name)))?,
        };
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_err(schema: Schema) -> String {
        match ValidSchema::new(schema) {
            Err(AvroError::Schema(msg)) => msg,
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_compile_primitive() {
        let schema = ValidSchema::new(Schema::Long).unwrap();
        assert_eq!(schema.root_kind(), SchemaKind::Long);
        assert_eq!(schema.node(schema.root()), &Node::Long);
    }

    #[test]
    fn test_compile_record_keeps_field_order() {
        let schema = ValidSchema::new(Schema::record(
            "User",
            vec![
                Field::new("name", Schema::String),
                Field::new("age", Schema::Int),
                Field::new("tags", Schema::array(Schema::String)),
            ],
        ))
        .unwrap();

        match schema.node(schema.root()) {
            Node::Record { name, fields } => {
                assert_eq!(name, "User");
                let names: Vec<&str> = fields.iter().map(|(n, _)| n.as_str()).collect();
                assert_eq!(names, vec!["name", "age", "tags"]);
                assert_eq!(schema.node(fields[2].1).kind(), SchemaKind::Array);
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_compile_recursive_record() {
        let schema = ValidSchema::new(Schema::record(
            "List",
            vec![
                Field::new("value", Schema::Int),
                Field::new("next", Schema::optional(Schema::Ref("List".into()))),
            ],
        ))
        .unwrap();

        let Node::Record { fields, .. } = schema.node(schema.root()) else {
            panic!("expected record");
        };
        let Node::Union(branches) = schema.node(fields[1].1) else {
            panic!("expected union");
        };
        assert_eq!(branches[1], schema.root());
    }

    #[test]
    fn test_reject_record_containing_itself() {
        let msg = compile_err(Schema::record(
            "Loop",
            vec![Field::new("me", Schema::Ref("Loop".into()))],
        ));
        assert!(msg.contains("record 'Loop' contains itself"));

        let msg = compile_err(Schema::record(
            "Loop",
            vec![
                Field::new("x", Schema::Int),
                Field::new("me", Schema::Ref("Loop".into())),
            ],
        ));
        assert!(msg.contains("record 'Loop' contains itself"));

        // Through another record
        let msg = compile_err(Schema::record(
            "A",
            vec![Field::new(
                "b",
                Schema::record("B", vec![Field::new("a", Schema::Ref("A".into()))]),
            )],
        ));
        assert!(msg.contains("contains itself"));
    }

    #[test]
    fn test_recursion_through_array_or_map_is_allowed() {
        let tree = Schema::record(
            "Tree",
            vec![
                Field::new("children", Schema::array(Schema::Ref("Tree".into()))),
                Field::new("attrs", Schema::map(Schema::Ref("Tree".into()))),
            ],
        );
        assert_eq!(ValidSchema::new(tree).unwrap().root_kind(), SchemaKind::Record);
    }

    #[test]
    fn test_reject_duplicate_field() {
        let msg = compile_err(Schema::record(
            "R",
            vec![Field::new("a", Schema::Int), Field::new("a", Schema::Long)],
        ));
        assert!(msg.contains("duplicate field 'a'"));
    }

    #[test]
    fn test_reject_duplicate_type_name() {
        let msg = compile_err(Schema::record(
            "R",
            vec![
                Field::new("a", Schema::fixed("F", 4)),
                Field::new("b", Schema::fixed("F", 8)),
            ],
        ));
        assert!(msg.contains("duplicate type name 'F'"));
    }

    #[test]
    fn test_reject_bad_enums() {
        assert!(compile_err(Schema::enumeration("E", &[])).contains("no symbols"));
        assert!(compile_err(Schema::enumeration("E", &["A", "B", "A"])).contains("duplicate symbol"));
    }

    #[test]
    fn test_reject_ambiguous_unions() {
        let msg = compile_err(Schema::Union(vec![Schema::Int, Schema::Int]));
        assert!(msg.contains("union contains int more than once"));

        let msg = compile_err(Schema::Union(vec![
            Schema::Null,
            Schema::Union(vec![Schema::Int]),
        ]));
        assert!(msg.contains("may not immediately contain"));
    }

    #[test]
    fn test_union_of_distinct_named_types_is_allowed() {
        let schema = ValidSchema::new(Schema::Union(vec![
            Schema::fixed("A", 2),
            Schema::fixed("B", 2),
        ]))
        .unwrap();
        assert_eq!(schema.root_kind(), SchemaKind::Union);
    }

    #[test]
    fn test_reject_unknown_reference() {
        let msg = compile_err(Schema::array(Schema::Ref("Missing".into())));
        assert!(msg.contains("unknown type 'Missing'"));
    }

    #[test]
    fn test_clone_shares_nodes() {
        let a = ValidSchema::new(Schema::map(Schema::Double)).unwrap();
        let b = a.clone();
        assert!(Arc::ptr_eq(&a.inner, &b.inner));
    }
}
