//! Protocol constants and default decode limits.
//!
//! The limits bound allocations and recursion when decoding untrusted input.
//! Per-protocol overrides go through [`DecodeOptions`](crate::codec::DecodeOptions).

/// Envelope version written into `metadata.version` by the JSON format.
pub const JSON_PROTOCOL_VERSION: u64 = 1;

/// Width of the big-endian length prefix framing a JSON envelope.
pub const FRAME_PREFIX_LEN: usize = 4;

/// Strict binary message header marker.
pub const BINARY_VERSION_1: u32 = 0x8001_0000;

/// Mask selecting the version bits of a strict binary header.
pub const BINARY_VERSION_MASK: u32 = 0xffff_0000;

/// Mask selecting the message type bits of a strict binary header.
pub const BINARY_TYPE_MASK: u32 = 0x0000_00ff;

/// Field type byte terminating a binary struct.
pub const BINARY_STOP: u8 = 0;

/// Default maximum nesting depth of structs and containers.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default maximum JSON frame length (64 MiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Default maximum element count of a single list, set or map.
pub const DEFAULT_MAX_CONTAINER_LEN: usize = 1024 * 1024;

/// Default maximum length of a single string or binary value (16 MiB).
pub const DEFAULT_MAX_STRING_LEN: usize = 16 * 1024 * 1024;
