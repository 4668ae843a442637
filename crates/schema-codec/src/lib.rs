//! Schema-driven record codec with interchangeable wire formats.
//!
//! Records are described at runtime by struct descriptors rather than by
//! compiled types. One generic traversal engine walks a descriptor and turns a
//! [`Record`] into a format-neutral tree and back; wire formats only decide how
//! the leaves of that tree look.
//!
//! # Quick Start
//!
//! ```rust
//! use schema_codec::{DecodeOptions, MemoryBuffer, Protocol, ProtocolKind, Record, StructSpec, TypeSpec, Value};
//!
//! let item = StructSpec::builder("Item")
//!     .optional(1, "id", TypeSpec::I32)
//!     .optional(2, "phones", TypeSpec::list(TypeSpec::String))
//!     .optional(3, "binary", TypeSpec::Binary)
//!     .build()
//!     .unwrap();
//!
//! let record = Record::new(&item)
//!     .with("id", 13)
//!     .unwrap()
//!     .with("phones", Value::List(vec!["5234".into(), "12346456".into()]))
//!     .unwrap()
//!     .with("binary", vec![0xffu8])
//!     .unwrap();
//!
//! let mut buf = MemoryBuffer::new();
//! let mut protocol = ProtocolKind::Json.open(&mut buf, DecodeOptions::default());
//! protocol.write_struct(&record).unwrap();
//! drop(protocol);
//!
//! buf.reset();
//! let mut protocol = ProtocolKind::Json.open(&mut buf, DecodeOptions::default());
//! assert_eq!(protocol.read_struct(&item).unwrap(), record);
//! ```
//!
//! # Modules
//!
//! - [`model`]: Type tags, descriptors, values and records
//! - [`codec`]: Traversal engine, decode policy, JSON and binary formats
//! - [`protocol`]: Protocol trait and format negotiation
//! - [`transport`]: Byte sinks/sources
//! - [`validate`]: Required-field and conformance checks
//! - [`error`]: Error types
//! - [`limits`]: Protocol constants and decode limits
//!
//! # Wire Formats
//!
//! - JSON: 4-byte big-endian length + `{"metadata": {"version": 1}, "payload": {...}}`
//! - Binary: positional `(type, id, value)` fields terminated by a stop byte
//!
//! Decoding bounds nesting depth, frame size, container and string lengths,
//! so untrusted input cannot force unbounded allocation or recursion. Maps
//! are hash-indexed, so duplicate-key resolution stays linear in the entry
//! count. Encoding applies the same depth limit, so whatever a protocol
//! writes, a peer with the same options can read back.

pub mod codec;
pub mod error;
pub mod limits;
pub mod model;
pub mod protocol;
pub mod transport;
pub mod validate;

// Re-export commonly used types at crate root
pub use codec::{
    BinaryProtocol, DecodeOptions, DecodePolicy, JsonProtocol, decode_binary, decode_json,
    encode_binary, encode_json, json_to_list, json_to_map, json_to_struct, list_to_json,
    map_to_json, struct_to_json,
};
pub use error::{
    DecodeError, EncodeError, ErrorCode, FieldError, ParseError, SpecError, TransportError,
    ValidationError,
};
pub use model::{FieldSpec, MapValue, Record, StructRef, StructSpec, StructSpecBuilder, TType, TypeSpec, Value};
pub use protocol::{MessageHeader, MessageType, Protocol, ProtocolKind};
pub use transport::{MemoryBuffer, StreamTransport, Transport};
pub use validate::validate_record;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
