//! String/binary decode policy.
//!
//! Strings and binaries share one wire shape. Whether decoded wire bytes are
//! surfaced as text or left as raw bytes depends on the declared tag of the
//! field and on the caller's policy:
//!
//! | Tag    | `Auto`              | `Always`            | `TryDecode`              | `Never`   |
//! |--------|---------------------|---------------------|--------------------------|-----------|
//! | string | text, error if bad  | text, error if bad  | text, bytes if bad       | bytes     |
//! | binary | bytes               | text, error if bad  | text, bytes if bad       | bytes     |
//!
//! The policy only applies when decoding; encoding always writes text fields
//! as text and binary fields as binary.

use std::str::FromStr;

use crate::error::ParseError;
use crate::model::{TType, Value};

/// How string and binary leaves are surfaced on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    /// Decode `string` fields as UTF-8, leave `binary` fields as bytes.
    #[default]
    Auto,
    /// Decode every string/binary leaf as UTF-8; invalid UTF-8 is an error.
    Always,
    /// Decode every string/binary leaf as UTF-8, falling back to bytes.
    TryDecode,
    /// Leave every string/binary leaf as bytes.
    Never,
}

impl FromStr for DecodePolicy {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(DecodePolicy::Auto),
            "always" | "true" => Ok(DecodePolicy::Always),
            "try" => Ok(DecodePolicy::TryDecode),
            "never" | "false" => Ok(DecodePolicy::Never),
            other => Err(ParseError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Invalid UTF-8 under a policy that requires text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Utf8Required;

/// Surfaces wire bytes of a string/binary leaf according to `policy`.
///
/// `tag` is the declared tag of the field (or container element) being
/// decoded; anything other than [`TType::Binary`] is treated as a string.
pub fn process_string_or_binary(
    bytes: Vec<u8>,
    tag: TType,
    policy: DecodePolicy,
) -> Result<Value, Utf8Required> {
    let (decode, strict) = match policy {
        DecodePolicy::Auto => (tag != TType::Binary, true),
        DecodePolicy::Always => (true, true),
        DecodePolicy::TryDecode => (true, false),
        DecodePolicy::Never => (false, false),
    };
    if !decode {
        return Ok(Value::Binary(bytes));
    }
    match String::from_utf8(bytes) {
        Ok(text) => Ok(Value::String(text)),
        Err(_) if strict => Err(Utf8Required),
        Err(err) => Ok(Value::Binary(err.into_bytes())),
    }
}
