//! Error types for descriptor construction, encoding, decoding and validation.

use thiserror::Error;

use crate::model::TType;

/// Stable error classes shared by every wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// E001: Transport exhausted or failed
    TransportEof,
    /// E002: Invalid base64, UTF-8, JSON or envelope
    InvalidEncoding,
    /// E003: Wire shape disagrees with the declared type
    SchemaMismatch,
    /// E004: Configured limit exceeded
    LimitExceeded,
}

impl ErrorCode {
    /// Returns the error code string (e.g., "E001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::TransportEof => "E001",
            ErrorCode::InvalidEncoding => "E002",
            ErrorCode::SchemaMismatch => "E003",
            ErrorCode::LimitExceeded => "E004",
        }
    }
}

/// Error raised by a [`Transport`](crate::transport::Transport).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport exhausted: needed {need} bytes, {available} available")]
    Eof { need: usize, available: usize },

    #[error("transport io failure: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

/// Error during decoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    // === E001: Transport ===
    #[error("[E001] {0}")]
    Transport(#[from] TransportError),

    // === E002: Invalid encoding ===
    #[error("[E002] invalid base64 in {path}: {reason}")]
    InvalidBase64 { path: String, reason: String },

    #[error("[E002] invalid UTF-8 in {path}")]
    InvalidUtf8 { path: String },

    #[error("[E002] malformed JSON: {0}")]
    MalformedJson(String),

    #[error("[E002] malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("[E002] unsupported envelope version: {version}")]
    UnsupportedVersion { version: u64 },

    #[error("[E002] invalid message type: {value}")]
    InvalidMessageType { value: i64 },

    #[error("[E002] invalid bool value: {value} (expected 0x00 or 0x01)")]
    InvalidBool { value: u8 },

    #[error("[E002] unknown wire type: {value}")]
    UnknownWireType { value: u8 },

    #[error("[E002] bad protocol version: 0x{found:08x}")]
    BadProtocolVersion { found: u32 },

    #[error("[E002] negative length {len} for {field}")]
    NegativeLength { field: &'static str, len: i64 },

    // === E003: Schema mismatch ===
    #[error("[E003] schema mismatch at {path}: expected {expected}, found {found}")]
    SchemaMismatch {
        path: String,
        expected: TType,
        found: String,
    },

    #[error("[E003] value {value} at {path} does not fit {expected}")]
    IntegerOutOfRange {
        path: String,
        expected: TType,
        value: String,
    },

    #[error("[E003] struct descriptor {name} was declared but never defined")]
    UndefinedStruct { name: String },

    #[error("[E003] required field {field} missing from {struct_name}")]
    MissingRequired { struct_name: String, field: String },

    // === E004: Limits ===
    #[error("[E004] nesting depth exceeded (max={max})")]
    DepthExceeded { max: usize },

    #[error("[E004] frame length {len} exceeds maximum {max}")]
    FrameTooLarge { len: usize, max: usize },

    #[error("[E004] {field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },
}

impl DecodeError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DecodeError::Transport(_) => ErrorCode::TransportEof,
            DecodeError::SchemaMismatch { .. }
            | DecodeError::IntegerOutOfRange { .. }
            | DecodeError::UndefinedStruct { .. }
            | DecodeError::MissingRequired { .. } => ErrorCode::SchemaMismatch,
            DecodeError::DepthExceeded { .. }
            | DecodeError::FrameTooLarge { .. }
            | DecodeError::LengthExceedsLimit { .. } => ErrorCode::LimitExceeded,
            _ => ErrorCode::InvalidEncoding,
        }
    }
}

/// Error during encoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: TType,
        found: &'static str,
    },

    #[error("string field {path} holds bytes that are not valid UTF-8")]
    InvalidUtf8 { path: String },

    #[error("struct descriptor {name} was declared but never defined")]
    UndefinedStruct { name: String },

    #[error("JSON serialization failed: {0}")]
    Json(String),

    #[error("{field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("frame length {len} does not fit the length prefix")]
    FrameTooLarge { len: usize },

    #[error("nesting depth exceeds maximum {max}")]
    DepthExceeded { max: usize },
}

impl EncodeError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            EncodeError::Transport(_) => ErrorCode::TransportEof,
            EncodeError::TypeMismatch { .. } | EncodeError::UndefinedStruct { .. } => {
                ErrorCode::SchemaMismatch
            }
            EncodeError::LengthExceedsLimit { .. }
            | EncodeError::FrameTooLarge { .. }
            | EncodeError::DepthExceeded { .. } => ErrorCode::LimitExceeded,
            EncodeError::InvalidUtf8 { .. } | EncodeError::Json(_) => ErrorCode::InvalidEncoding,
        }
    }
}

/// Error while building a struct descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("field id {id} in {struct_name} must be positive")]
    InvalidFieldId { struct_name: String, id: i16 },

    #[error("duplicate field id {id} in {struct_name}")]
    DuplicateFieldId { struct_name: String, id: i16 },

    #[error("duplicate field name {name} in {struct_name}")]
    DuplicateFieldName { struct_name: String, name: String },

    #[error("default given for unknown field {name} in {struct_name}")]
    UnknownDefault { struct_name: String, name: String },

    #[error("default for {struct_name}.{field} does not conform to {expected}")]
    DefaultTypeMismatch {
        struct_name: String,
        field: String,
        expected: TType,
    },

    #[error("struct descriptor {name} is already defined")]
    AlreadyDefined { name: String },

    #[error("struct descriptor declared as {declared} cannot be defined as {defined}")]
    NameMismatch { declared: String, defined: String },
}

/// Error when addressing a record field by name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("{struct_name} has no field named {field}")]
    UnknownField { struct_name: String, field: String },
}

/// Error during semantic validation of a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("required field {field} missing from {struct_name}")]
    MissingRequired { struct_name: String, field: String },

    #[error("value at {path} does not conform to {expected}: found {found}")]
    TypeMismatch {
        path: String,
        expected: TType,
        found: &'static str,
    },

    #[error("string field {path} holds bytes that are not valid UTF-8")]
    InvalidUtf8 { path: String },

    #[error("struct descriptor {name} was declared but never defined")]
    UndefinedStruct { name: String },
}

/// Error when parsing a configuration name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown decode policy: {0}")]
    UnknownPolicy(String),

    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),
}
