//! Schema cursor for validating encoders and decoders.
//!
//! The validator keeps a stack of what the schema expects next, in
//! depth-first order. Records are expanded into their fields as soon as they
//! reach the top, arrays and maps become counted item blocks, and a union is
//! replaced by the branch that was selected. When the root value completes,
//! the cursor starts over at the root so a stream can hold many values.
//!
//! Every step runs on a scratch copy of the stack and only replaces the real
//! stack on success, so a rejected step leaves the cursor where it was.

use std::mem;

use super::{Node, NodeId, ValidSchema};
use crate::error::{AvroError, Result};

/// A single write or read request, as seen by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Fixed(usize),
    /// Enum symbol index; `None` checks the kind only.
    Enum(Option<usize>),
    /// Union branch index; `None` checks the kind only.
    Union(Option<usize>),
    ArrayStart,
    MapStart,
    ItemCount(usize),
    StartItem,
    ArrayEnd,
    MapEnd,
}

impl Action {
    fn describe(&self) -> String {
        match self {
            Action::Null => "null".into(),
            Action::Boolean => "boolean".into(),
            Action::Int => "int".into(),
            Action::Long => "long".into(),
            Action::Float => "float".into(),
            Action::Double => "double".into(),
            Action::Bytes => "bytes".into(),
            Action::String => "string".into(),
            Action::Fixed(size) => format!("fixed({})", size),
            Action::Enum(Some(i)) => format!("enum symbol {}", i),
            Action::Enum(None) => "enum".into(),
            Action::Union(Some(i)) => format!("union branch {}", i),
            Action::Union(None) => "union".into(),
            Action::ArrayStart => "array start".into(),
            Action::MapStart => "map start".into(),
            Action::ItemCount(n) => format!("item count {}", n),
            Action::StartItem => "item start".into(),
            Action::ArrayEnd => "array end".into(),
            Action::MapEnd => "map end".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Value(NodeId),
    MapKey,
    Items {
        item: NodeId,
        map: bool,
        remaining: usize,
    },
}

/// Tracks the next expected schema element.
#[derive(Debug, Clone)]
pub(crate) struct Validator {
    schema: ValidSchema,
    stack: Vec<Expect>,
    scratch: Vec<Expect>,
    fresh: Vec<Expect>,
}

impl Validator {
    pub(crate) fn new(schema: ValidSchema) -> Self {
        let mut fresh = Vec::new();
        start_root(&schema, &mut fresh);
        Self {
            stack: fresh.clone(),
            scratch: Vec::with_capacity(fresh.len()),
            fresh,
            schema,
        }
    }

    pub(crate) fn schema(&self) -> &ValidSchema {
        &self.schema
    }

    /// Rewind the cursor to the start of the root value.
    pub(crate) fn reset(&mut self) {
        self.stack.clear();
        self.stack.extend_from_slice(&self.fresh);
    }

    /// True when no value is partially written or read.
    pub(crate) fn at_value_boundary(&self) -> bool {
        self.stack == self.fresh
    }

    /// Check whether `action` is acceptable next, without moving the cursor.
    pub(crate) fn accepts(&mut self, action: Action) -> Result<()> {
        self.scratch.clear();
        self.scratch.extend_from_slice(&self.stack);
        step(&self.schema, &mut self.scratch, action)
    }

    /// Apply `action`, moving the cursor only if it is accepted.
    pub(crate) fn advance(&mut self, action: Action) -> Result<()> {
        self.advance_all(&[action])
    }

    /// Apply a sequence of actions as one step: all of them or none.
    pub(crate) fn advance_all(&mut self, actions: &[Action]) -> Result<()> {
        self.scratch.clear();
        self.scratch.extend_from_slice(&self.stack);
        let schema = &self.schema;
        let scratch = &mut self.scratch;
        match actions.iter().try_for_each(|action| step(schema, scratch, *action)) {
            Ok(()) => {
                mem::swap(&mut self.stack, &mut self.scratch);
                Ok(())
            }
            Err(e) => {
                tracing::debug!(error = %e, "schema validation rejected step");
                Err(e)
            }
        }
    }

    /// Human readable description of the next expected element.
    pub(crate) fn expected(&self) -> String {
        describe(&self.schema, self.stack.last())
    }
}

fn start_root(schema: &ValidSchema, stack: &mut Vec<Expect>) {
    stack.push(Expect::Value(schema.root()));
    expand_records(schema, stack);
}

/// Replace records on top of the stack with their fields (first field on top).
fn expand_records(schema: &ValidSchema, stack: &mut Vec<Expect>) {
    while let Some(&Expect::Value(id)) = stack.last() {
        let Node::Record { fields, .. } = schema.node(id) else {
            break;
        };
        stack.pop();
        stack.extend(fields.iter().rev().map(|(_, field)| Expect::Value(*field)));
    }
}

/// True for records that expand to no reads at all.
fn zero_width(schema: &ValidSchema, id: NodeId) -> bool {
    match schema.node(id) {
        Node::Record { fields, .. } => fields.iter().all(|&(_, field)| zero_width(schema, field)),
        _ => false,
    }
}

fn describe(schema: &ValidSchema, top: Option<&Expect>) -> String {
    match top {
        None => "end of value".into(),
        Some(Expect::Value(id)) => describe_node(schema, *id),
        Some(Expect::MapKey) => "map key (string)".into(),
        Some(Expect::Items {
            item,
            map: false,
            remaining,
        }) if *remaining > 0 => format!("array item ({})", describe_node(schema, *item)),
        Some(Expect::Items {
            map: true,
            remaining,
            ..
        }) if *remaining > 0 => "map key (string)".into(),
        Some(Expect::Items { map: false, .. }) => "array item count or array end".into(),
        Some(Expect::Items { map: true, .. }) => "map item count or map end".into(),
    }
}

fn describe_node(schema: &ValidSchema, id: NodeId) -> String {
    match schema.node(id) {
        Node::Fixed { size, .. } => format!("fixed({})", size),
        node => node.kind().to_string(),
    }
}

fn mismatch(schema: &ValidSchema, stack: &[Expect], action: Action) -> AvroError {
    AvroError::validation(describe(schema, stack.last()), action.describe())
}

/// Push the next item of the block on top of the stack.
fn start_item(schema: &ValidSchema, stack: &mut Vec<Expect>, item: NodeId, map: bool) {
    if let Some(Expect::Items { remaining, .. }) = stack.last_mut() {
        *remaining -= 1;
    }
    stack.push(Expect::Value(item));
    if map {
        stack.push(Expect::MapKey);
    }
    expand_records(schema, stack);
}

fn step(schema: &ValidSchema, stack: &mut Vec<Expect>, action: Action) -> Result<()> {
    let Some(&top) = stack.last() else {
        return Err(mismatch(schema, stack, action));
    };

    match top {
        Expect::Items {
            item,
            map,
            remaining,
        } => {
            // Array items that read nothing are done once counted
            let remaining = match action {
                Action::ItemCount(_) | Action::ArrayEnd
                    if !map && remaining > 0 && zero_width(schema, item) =>
                {
                    0
                }
                _ => remaining,
            };
            match action {
                Action::ItemCount(n) if remaining == 0 => {
                    if let Some(Expect::Items { remaining, .. }) = stack.last_mut() {
                        *remaining = n;
                    }
                }
                Action::ArrayEnd if !map && remaining == 0 => {
                    stack.pop();
                }
                Action::MapEnd if map && remaining == 0 => {
                    stack.pop();
                }
                Action::StartItem if remaining > 0 => start_item(schema, stack, item, map),
                Action::ItemCount(_)
                | Action::ArrayEnd
                | Action::MapEnd
                | Action::StartItem => return Err(mismatch(schema, stack, action)),
                _ if remaining > 0 => {
                    // Item started implicitly by its first value
                    start_item(schema, stack, item, map);
                    return step(schema, stack, action);
                }
                _ => return Err(mismatch(schema, stack, action)),
            }
        }
        Expect::MapKey => match action {
            Action::String => {
                stack.pop();
            }
            _ => return Err(mismatch(schema, stack, action)),
        },
        Expect::Value(id) => {
            let replacement = match (schema.node(id), action) {
                (Node::Null, Action::Null)
                | (Node::Boolean, Action::Boolean)
                | (Node::Int, Action::Int)
                | (Node::Long, Action::Long)
                | (Node::Float, Action::Float)
                | (Node::Double, Action::Double)
                | (Node::Bytes, Action::Bytes)
                | (Node::String, Action::String) => None,
                (Node::Fixed { size, .. }, Action::Fixed(n)) if *size == n => None,
                (Node::Enum { symbols, .. }, Action::Enum(index)) => match index {
                    Some(i) if i >= symbols.len() => {
                        return Err(AvroError::validation(
                            format!("enum symbol index below {}", symbols.len()),
                            action.describe(),
                        ))
                    }
                    _ => None,
                },
                (Node::Union(branches), Action::Union(index)) => match index {
                    Some(i) => match branches.get(i) {
                        Some(branch) => Some(Expect::Value(*branch)),
                        None => {
                            return Err(AvroError::validation(
                                format!("union branch index below {}", branches.len()),
                                action.describe(),
                            ))
                        }
                    },
                    // Kind check only; keep the union on top
                    None => Some(top),
                },
                (Node::Array(item), Action::ArrayStart) => Some(Expect::Items {
                    item: *item,
                    map: false,
                    remaining: 0,
                }),
                (Node::Map(value), Action::MapStart) => Some(Expect::Items {
                    item: *value,
                    map: true,
                    remaining: 0,
                }),
                _ => return Err(mismatch(schema, stack, action)),
            };
            stack.pop();
            if let Some(next) = replacement {
                stack.push(next);
            }
        }
    }

    expand_records(schema, stack);
    if stack.is_empty() {
        start_root(schema, stack);
    }
    Ok(())
}
