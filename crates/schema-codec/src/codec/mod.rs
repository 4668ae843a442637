//! Encoding/decoding of records.
//!
//! The traversal engine is format-neutral; the JSON and binary formats sit
//! on top of it and share the string/binary decode policy.

pub mod binary;
pub mod engine;
pub mod json;
pub mod policy;
pub mod primitives;
pub mod tree;

pub use binary::{BinaryProtocol, decode_binary, encode_binary};
pub use engine::{DecodeOptions, TreeCodec};
pub use json::{
    JsonLeaves, JsonProtocol, decode_json, encode_json, json_to_list, json_to_map, json_to_node,
    json_to_struct, list_to_json, map_to_json, node_to_json, struct_to_json,
};
pub use policy::{DecodePolicy, process_string_or_binary};
pub use primitives::{Reader, Writer};
pub use tree::{LeafCodec, LeafError, Node, RawLeaves};
