//! Schema-driven traversal between records and intermediate trees.
//!
//! The engine has no compile-time knowledge of record shapes: it walks a
//! [`StructSpec`] at runtime and matches exhaustively over [`TypeSpec`].
//! Leaf decisions that depend on the wire format go through a [`LeafCodec`].

use std::num::TryFromIntError;

use crate::codec::policy::{DecodePolicy, process_string_or_binary};
use crate::codec::tree::{LeafCodec, LeafError, Node, Trail};
use crate::error::{DecodeError, EncodeError};
use crate::limits::{
    DEFAULT_MAX_CONTAINER_LEN, DEFAULT_MAX_DEPTH, DEFAULT_MAX_FRAME_LEN, DEFAULT_MAX_STRING_LEN,
};
use crate::model::{MapValue, Record, StructRef, StructSpec, TType, TypeSpec, Value};

/// Decode behavior and limits shared by every wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// How string and binary leaves are surfaced.
    pub policy: DecodePolicy,
    /// Maximum nesting depth of structs and containers, enforced on encode
    /// and decode alike.
    pub max_depth: usize,
    /// Maximum length of one JSON frame.
    pub max_frame_len: usize,
    /// Maximum element count of one container.
    pub max_container_len: usize,
    /// Maximum length of one string or binary value.
    pub max_string_len: usize,
    /// Fail when a required field is absent from the wire.
    pub enforce_required: bool,
    /// Reject non-strict (unversioned) binary message headers.
    pub strict_read: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            policy: DecodePolicy::Auto,
            max_depth: DEFAULT_MAX_DEPTH,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            max_container_len: DEFAULT_MAX_CONTAINER_LEN,
            max_string_len: DEFAULT_MAX_STRING_LEN,
            enforce_required: false,
            strict_read: false,
        }
    }
}

impl DecodeOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns these options with a different decode policy.
    pub fn with_policy(mut self, policy: DecodePolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Generic record/tree codec parameterized by a format's leaf rules.
#[derive(Debug, Clone, Default)]
pub struct TreeCodec<L> {
    leaves: L,
    options: DecodeOptions,
}

impl<L: LeafCodec> TreeCodec<L> {
    /// Creates a codec with default options.
    pub fn new(leaves: L) -> Self {
        Self::with_options(leaves, DecodeOptions::default())
    }

    /// Creates a codec with the given options.
    pub fn with_options(leaves: L, options: DecodeOptions) -> Self {
        Self { leaves, options }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    pub fn leaves(&self) -> &L {
        &self.leaves
    }

    // =========================================================================
    // ENCODING
    // =========================================================================

    /// Encodes a record as an object node, omitting unset fields.
    pub fn encode_struct(&self, record: &Record) -> Result<Node, EncodeError> {
        self.encode_record(record, &Trail::root(record.type_name()), 0)
    }

    /// Encodes a value against a type spec.
    pub fn encode_value(&self, value: &Value, ty: &TypeSpec) -> Result<Node, EncodeError> {
        self.encode_node(value, ty, &Trail::root("value"), 0)
    }

    /// Encodes list or set elements as a sequence node.
    pub fn encode_list(&self, items: &[Value], elem: &TypeSpec) -> Result<Node, EncodeError> {
        self.encode_seq(items, elem, &Trail::root("list"), 0)
    }

    /// Encodes a map as a node of `(key, value)` pairs.
    pub fn encode_map(
        &self,
        map: &MapValue,
        key: &TypeSpec,
        value: &TypeSpec,
    ) -> Result<Node, EncodeError> {
        self.encode_pairs(map, key, value, &Trail::root("map"), 0)
    }

    fn encode_record(&self, record: &Record, trail: &Trail<'_>, depth: usize) -> Result<Node, EncodeError> {
        let spec = defined(record.spec_ref()).map_err(|name| EncodeError::UndefinedStruct { name })?;
        let depth = self.descend_encode(depth)?;

        let mut fields = Vec::with_capacity(spec.fields().len());
        for (slot, field) in spec.fields().iter().enumerate() {
            if field.ty == TypeSpec::Void {
                continue;
            }
            if let Some(value) = record.slot_value(slot) {
                let node = self.encode_node(value, &field.ty, &trail.field(&field.name), depth)?;
                fields.push((field.name.to_string(), node));
            }
        }
        Ok(Node::Object(fields))
    }

    fn encode_seq(
        &self,
        items: &[Value],
        elem: &TypeSpec,
        trail: &Trail<'_>,
        depth: usize,
    ) -> Result<Node, EncodeError> {
        let depth = self.descend_encode(depth)?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.encode_node(item, elem, &trail.index(i), depth))
            .collect::<Result<Vec<_>, _>>()
            .map(Node::Seq)
    }

    fn encode_pairs(
        &self,
        map: &MapValue,
        key: &TypeSpec,
        value: &TypeSpec,
        trail: &Trail<'_>,
        depth: usize,
    ) -> Result<Node, EncodeError> {
        let depth = self.descend_encode(depth)?;
        let mut pairs = Vec::with_capacity(map.len());
        for (i, (k, v)) in map.iter().enumerate() {
            let k = self.encode_node(k, key, &trail.key(i), depth)?;
            let v = self.encode_node(v, value, &trail.value(i), depth)?;
            pairs.push((k, v));
        }
        Ok(Node::Map(pairs))
    }

    fn encode_node(
        &self,
        value: &Value,
        ty: &TypeSpec,
        trail: &Trail<'_>,
        depth: usize,
    ) -> Result<Node, EncodeError> {
        match (ty, value) {
            (TypeSpec::Bool, Value::Bool(v)) => Ok(Node::Bool(*v)),
            (TypeSpec::Byte, Value::Byte(v)) => Ok(Node::Int(i64::from(*v))),
            (TypeSpec::I16, Value::I16(v)) => Ok(Node::Int(i64::from(*v))),
            (TypeSpec::I32, Value::I32(v)) => Ok(Node::Int(i64::from(*v))),
            (TypeSpec::I64, Value::I64(v)) => Ok(Node::Int(*v)),
            (TypeSpec::Double, Value::Double(v)) => Ok(self.leaves.encode_double(*v)),
            (TypeSpec::String, Value::String(s)) => Ok(Node::Text(s.clone())),
            (TypeSpec::String, Value::Binary(b)) => String::from_utf8(b.clone())
                .map(Node::Text)
                .map_err(|_| EncodeError::InvalidUtf8 {
                    path: trail.render(),
                }),
            (TypeSpec::Binary, Value::Binary(b)) => Ok(self.leaves.encode_binary(b)),
            (TypeSpec::Binary, Value::String(s)) => Ok(self.leaves.encode_binary(s.as_bytes())),
            (TypeSpec::Struct(expected), Value::Struct(record)) if record.spec_ref().ptr_eq(expected) => {
                self.encode_record(record, trail, depth)
            }
            (TypeSpec::List(elem), Value::List(items)) | (TypeSpec::Set(elem), Value::Set(items)) => {
                self.encode_seq(items, elem, trail, depth)
            }
            (TypeSpec::Map(key, val), Value::Map(map)) => self.encode_pairs(map, key, val, trail, depth),
            _ => Err(EncodeError::TypeMismatch {
                path: trail.render(),
                expected: ty.ttype(),
                found: value.kind(),
            }),
        }
    }

    // =========================================================================
    // DECODING
    // =========================================================================

    /// Decodes an object node into a fresh record of `spec`.
    ///
    /// Names not present in the descriptor are skipped and `null` leaves a
    /// field at its default.
    pub fn decode_struct(&self, node: Node, spec: &StructRef) -> Result<Record, DecodeError> {
        self.decode_node_struct(node, spec, &Trail::root(spec.name()), 0)
    }

    /// Decodes a node against a type spec.
    pub fn decode_value(&self, node: Node, ty: &TypeSpec) -> Result<Value, DecodeError> {
        self.decode_node(node, ty, &Trail::root("value"), 0)
    }

    /// Decodes a sequence node into list elements.
    pub fn decode_list(&self, node: Node, elem: &TypeSpec) -> Result<Vec<Value>, DecodeError> {
        let trail = Trail::root("list");
        match node {
            Node::Seq(items) => self.decode_seq(items, elem, &trail, 0),
            other => Err(mismatch(&trail, TType::List, other.kind())),
        }
    }

    /// Decodes a map node, or a sequence of `{key, value}` objects.
    pub fn decode_map(&self, node: Node, key: &TypeSpec, value: &TypeSpec) -> Result<MapValue, DecodeError> {
        self.decode_pairs(node, key, value, &Trail::root("map"), 0)
    }

    fn decode_node_struct(
        &self,
        node: Node,
        spec: &StructRef,
        trail: &Trail<'_>,
        depth: usize,
    ) -> Result<Record, DecodeError> {
        let depth = self.descend(depth)?;
        let fields = match node {
            Node::Object(fields) => fields,
            other => return Err(mismatch(trail, TType::Struct, other.kind())),
        };
        let struct_spec = defined(spec).map_err(|name| DecodeError::UndefinedStruct { name })?;

        let mut record = Record::new(spec);
        for (name, node) in fields {
            let Some(slot) = struct_spec.slot_of(&name) else {
                continue;
            };
            let field = &struct_spec.fields()[slot];
            if node == Node::Null || field.ty == TypeSpec::Void {
                continue;
            }
            let value = self.decode_node(node, &field.ty, &trail.field(&field.name), depth)?;
            record.set_slot(slot, value);
        }

        if self.options.enforce_required {
            check_required(&record, struct_spec)?;
        }
        Ok(record)
    }

    fn decode_node(&self, node: Node, ty: &TypeSpec, trail: &Trail<'_>, depth: usize) -> Result<Value, DecodeError> {
        match ty {
            TypeSpec::Bool => match node {
                Node::Bool(v) => Ok(Value::Bool(v)),
                Node::Int(0) => Ok(Value::Bool(false)),
                Node::Int(1) => Ok(Value::Bool(true)),
                other => Err(mismatch(trail, TType::Bool, other.kind())),
            },
            TypeSpec::Byte => self.decode_int(node, TType::Byte, trail, |v| i8::try_from(v).map(Value::Byte)),
            TypeSpec::I16 => self.decode_int(node, TType::I16, trail, |v| i16::try_from(v).map(Value::I16)),
            TypeSpec::I32 => self.decode_int(node, TType::I32, trail, |v| i32::try_from(v).map(Value::I32)),
            TypeSpec::I64 => self.decode_int(node, TType::I64, trail, |v| Ok(Value::I64(v))),
            TypeSpec::Double => self
                .leaves
                .decode_double(node)
                .map(Value::Double)
                .map_err(|err| leaf_error(err, trail, TType::Double)),
            TypeSpec::String => {
                let bytes = match node {
                    Node::Text(s) => s.into_bytes(),
                    Node::Bytes(b) => b,
                    other => return Err(mismatch(trail, TType::String, other.kind())),
                };
                self.surface(bytes, TType::String, trail)
            }
            TypeSpec::Binary => {
                let bytes = self
                    .leaves
                    .decode_binary(node)
                    .map_err(|err| leaf_error(err, trail, TType::Binary))?;
                self.surface(bytes, TType::Binary, trail)
            }
            TypeSpec::Struct(spec) => self
                .decode_node_struct(node, spec, trail, depth)
                .map(Value::Struct),
            TypeSpec::List(elem) => match node {
                Node::Seq(items) => self.decode_seq(items, elem, trail, depth).map(Value::List),
                other => Err(mismatch(trail, TType::List, other.kind())),
            },
            TypeSpec::Set(elem) => match node {
                Node::Seq(items) => self.decode_seq(items, elem, trail, depth).map(Value::Set),
                other => Err(mismatch(trail, TType::Set, other.kind())),
            },
            TypeSpec::Map(key, value) => self
                .decode_pairs(node, key, value, trail, depth)
                .map(Value::Map),
            TypeSpec::Void => Err(mismatch(trail, TType::Void, node.kind())),
        }
    }

    fn decode_int(
        &self,
        node: Node,
        expected: TType,
        trail: &Trail<'_>,
        narrow: impl FnOnce(i64) -> Result<Value, TryFromIntError>,
    ) -> Result<Value, DecodeError> {
        let wide = self
            .leaves
            .decode_integer(node)
            .map_err(|err| leaf_error(err, trail, expected))?;
        narrow(wide).map_err(|_| DecodeError::IntegerOutOfRange {
            path: trail.render(),
            expected,
            value: wide.to_string(),
        })
    }

    fn decode_seq(
        &self,
        items: Vec<Node>,
        elem: &TypeSpec,
        trail: &Trail<'_>,
        depth: usize,
    ) -> Result<Vec<Value>, DecodeError> {
        let depth = self.descend(depth)?;
        self.check_len(items.len())?;
        items
            .into_iter()
            .enumerate()
            .map(|(i, item)| self.decode_node(item, elem, &trail.index(i), depth))
            .collect()
    }

    fn decode_pairs(
        &self,
        node: Node,
        key: &TypeSpec,
        value: &TypeSpec,
        trail: &Trail<'_>,
        depth: usize,
    ) -> Result<MapValue, DecodeError> {
        let depth = self.descend(depth)?;
        let pairs = match node {
            Node::Map(pairs) => pairs,
            Node::Seq(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| split_pair(item, &trail.index(i)))
                .collect::<Result<Vec<_>, _>>()?,
            other => return Err(mismatch(trail, TType::Map, other.kind())),
        };
        self.check_len(pairs.len())?;

        let mut map = MapValue::with_capacity(pairs.len());
        for (i, (k, v)) in pairs.into_iter().enumerate() {
            let k = self.decode_node(k, key, &trail.key(i), depth)?;
            let v = self.decode_node(v, value, &trail.value(i), depth)?;
            // Duplicate wire keys: the later entry replaces the earlier one.
            map.insert(k, v);
        }
        Ok(map)
    }

    fn surface(&self, bytes: Vec<u8>, tag: TType, trail: &Trail<'_>) -> Result<Value, DecodeError> {
        if bytes.len() > self.options.max_string_len {
            return Err(DecodeError::LengthExceedsLimit {
                field: "string",
                len: bytes.len(),
                max: self.options.max_string_len,
            });
        }
        process_string_or_binary(bytes, tag, self.options.policy).map_err(|_| DecodeError::InvalidUtf8 {
            path: trail.render(),
        })
    }

    fn descend(&self, depth: usize) -> Result<usize, DecodeError> {
        let max = self.options.max_depth;
        next_level(depth, max).ok_or(DecodeError::DepthExceeded { max })
    }

    fn descend_encode(&self, depth: usize) -> Result<usize, EncodeError> {
        let max = self.options.max_depth;
        next_level(depth, max).ok_or(EncodeError::DepthExceeded { max })
    }

    fn check_len(&self, len: usize) -> Result<(), DecodeError> {
        if len > self.options.max_container_len {
            return Err(DecodeError::LengthExceedsLimit {
                field: "container",
                len,
                max: self.options.max_container_len,
            });
        }
        Ok(())
    }
}

/// Enters one struct or container level, or `None` past `max`.
///
/// Shared by every reader and writer, so encode and decode agree on depth.
pub(crate) fn next_level(depth: usize, max: usize) -> Option<usize> {
    let depth = depth + 1;
    (depth <= max).then_some(depth)
}

/// Returns the descriptor behind `spec`, or its name if undefined.
pub(crate) fn defined(spec: &StructRef) -> Result<&StructSpec, String> {
    spec.get().ok_or_else(|| spec.name().to_string())
}

/// Fails on the first required field that is unset.
pub(crate) fn check_required(record: &Record, spec: &StructSpec) -> Result<(), DecodeError> {
    match spec
        .fields()
        .iter()
        .find(|f| f.required && record.get_by_id(f.id).is_none())
    {
        Some(field) => Err(DecodeError::MissingRequired {
            struct_name: spec.name().to_string(),
            field: field.name.to_string(),
        }),
        None => Ok(()),
    }
}

fn split_pair(node: Node, trail: &Trail<'_>) -> Result<(Node, Node), DecodeError> {
    let Node::Object(fields) = node else {
        return Err(mismatch(trail, TType::Map, node.kind()));
    };
    let mut key = None;
    let mut value = None;
    for (name, node) in fields {
        match name.as_str() {
            "key" => key = Some(node),
            "value" => value = Some(node),
            _ => {}
        }
    }
    match (key, value) {
        (Some(k), Some(v)) => Ok((k, v)),
        _ => Err(mismatch(trail, TType::Map, "object without key and value")),
    }
}

fn mismatch(trail: &Trail<'_>, expected: TType, found: &str) -> DecodeError {
    DecodeError::SchemaMismatch {
        path: trail.render(),
        expected,
        found: found.to_string(),
    }
}

fn leaf_error(err: LeafError, trail: &Trail<'_>, expected: TType) -> DecodeError {
    match err {
        LeafError::Shape(found) => mismatch(trail, expected, found),
        LeafError::OutOfRange(value) => DecodeError::IntegerOutOfRange {
            path: trail.render(),
            expected,
            value,
        },
        LeafError::Base64(reason) => DecodeError::InvalidBase64 {
            path: trail.render(),
            reason,
        },
    }
}
