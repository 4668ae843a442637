//! Format-neutral intermediate tree.
//!
//! The traversal engine turns records into [`Node`] trees and back. A wire
//! format renders the tree; the only decisions it contributes to traversal
//! are the leaf rules of [`LeafCodec`] (how binaries and doubles look, which
//! textual forms of numbers are accepted).

use std::fmt::Write as _;

/// A node of the intermediate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    /// Lists and sets, in source order.
    Seq(Vec<Node>),
    /// Map entries as `(key, value)` pairs, in source order.
    Map(Vec<(Node, Node)>),
    /// Struct fields by name, in descriptor order.
    Object(Vec<(String, Node)>),
}

impl Node {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "bool",
            Node::Int(_) => "integer",
            Node::Double(_) => "double",
            Node::Text(_) => "string",
            Node::Bytes(_) => "bytes",
            Node::Seq(_) => "array",
            Node::Map(_) => "map",
            Node::Object(_) => "object",
        }
    }
}

/// Why a leaf node could not be read.
#[derive(Debug, Clone, PartialEq)]
pub enum LeafError {
    /// The node has the wrong shape; carries the found kind.
    Shape(&'static str),
    /// The node is numeric text or a number that does not fit an i64.
    OutOfRange(String),
    /// The node is text that is not valid base64.
    Base64(String),
}

/// Leaf rules contributed by a wire format.
pub trait LeafCodec {
    /// Renders raw bytes of a binary field.
    fn encode_binary(&self, bytes: &[u8]) -> Node;

    /// Recovers raw bytes of a binary field.
    fn decode_binary(&self, node: Node) -> Result<Vec<u8>, LeafError>;

    /// Renders a double.
    fn encode_double(&self, value: f64) -> Node {
        Node::Double(value)
    }

    /// Reads a double.
    fn decode_double(&self, node: Node) -> Result<f64, LeafError> {
        match node {
            Node::Double(v) => Ok(v),
            Node::Int(v) => Ok(v as f64),
            other => Err(LeafError::Shape(other.kind())),
        }
    }

    /// Reads an integer before it is narrowed to the declared width.
    fn decode_integer(&self, node: Node) -> Result<i64, LeafError> {
        match node {
            Node::Int(v) => Ok(v),
            other => Err(LeafError::Shape(other.kind())),
        }
    }
}

/// Leaf rules for in-process trees: bytes stay bytes, doubles stay doubles.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawLeaves;

impl LeafCodec for RawLeaves {
    fn encode_binary(&self, bytes: &[u8]) -> Node {
        Node::Bytes(bytes.to_vec())
    }

    fn decode_binary(&self, node: Node) -> Result<Vec<u8>, LeafError> {
        match node {
            Node::Bytes(b) => Ok(b),
            Node::Text(s) => Ok(s.into_bytes()),
            other => Err(LeafError::Shape(other.kind())),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Step<'a> {
    Root(&'a str),
    Field(&'a str),
    Index(usize),
    Key(usize),
    Value(usize),
}

/// Breadcrumb trail to the node being processed, rendered only on error.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Trail<'a> {
    parent: Option<&'a Trail<'a>>,
    step: Step<'a>,
}

impl<'a> Trail<'a> {
    pub(crate) fn root(name: &'a str) -> Self {
        Self {
            parent: None,
            step: Step::Root(name),
        }
    }

    pub(crate) fn field<'b>(&'b self, name: &'b str) -> Trail<'b> {
        self.push(Step::Field(name))
    }

    pub(crate) fn index(&self, i: usize) -> Trail<'_> {
        self.push(Step::Index(i))
    }

    pub(crate) fn key(&self, i: usize) -> Trail<'_> {
        self.push(Step::Key(i))
    }

    pub(crate) fn value(&self, i: usize) -> Trail<'_> {
        self.push(Step::Value(i))
    }

    fn push<'b>(&'b self, step: Step<'b>) -> Trail<'b> {
        Trail {
            parent: Some(self),
            step,
        }
    }

    /// Renders the trail as `Item.phones[1]` or `Item.scores[0].key`.
    pub(crate) fn render(&self) -> String {
        let mut steps = Vec::new();
        let mut cur = Some(self);
        while let Some(trail) = cur {
            steps.push(trail.step);
            cur = trail.parent;
        }

        let mut out = String::new();
        for step in steps.iter().rev() {
            // Writing to a String cannot fail.
            let _ = match step {
                Step::Root(name) => write!(out, "{name}"),
                Step::Field(name) => write!(out, ".{name}"),
                Step::Index(i) => write!(out, "[{i}]"),
                Step::Key(i) => write!(out, "[{i}].key"),
                Step::Value(i) => write!(out, "[{i}].value"),
            };
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trail_render() {
        let root = Trail::root("Item");
        let phones = root.field("phones");
        assert_eq!(phones.index(1).render(), "Item.phones[1]");

        let scores = root.field("scores");
        assert_eq!(scores.key(0).render(), "Item.scores[0].key");
        assert_eq!(scores.value(2).field("x").render(), "Item.scores[2].value.x");
    }

    #[test]
    fn test_raw_leaves() {
        let leaves = RawLeaves;
        assert_eq!(leaves.encode_binary(&[0xff]), Node::Bytes(vec![0xff]));
        assert_eq!(leaves.decode_binary(Node::Bytes(vec![1])), Ok(vec![1]));
        assert_eq!(leaves.decode_double(Node::Int(2)), Ok(2.0));
        assert_eq!(
            leaves.decode_integer(Node::Text("1".into())),
            Err(LeafError::Shape("string"))
        );
    }
}
