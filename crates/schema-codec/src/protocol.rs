//! Protocol abstraction shared by the wire formats.
//!
//! A protocol writes and reads records against a [`Transport`]; callers pick
//! one by name through [`ProtocolKind`] and never touch format details.

use std::fmt;
use std::str::FromStr;

use crate::codec::binary::BinaryProtocol;
use crate::codec::engine::DecodeOptions;
use crate::codec::json::JsonProtocol;
use crate::error::{DecodeError, EncodeError, ParseError, TransportError};
use crate::model::{Record, StructRef};
use crate::transport::Transport;

/// Kind of an RPC message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Call = 1,
    Reply = 2,
    Exception = 3,
    Oneway = 4,
}

impl MessageType {
    /// Parses a message type from its wire value.
    pub fn from_i64(value: i64) -> Result<Self, DecodeError> {
        match value {
            1 => Ok(MessageType::Call),
            2 => Ok(MessageType::Reply),
            3 => Ok(MessageType::Exception),
            4 => Ok(MessageType::Oneway),
            _ => Err(DecodeError::InvalidMessageType { value }),
        }
    }
}

/// Header written before a message's struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub name: String,
    pub kind: MessageType,
    pub seqid: i32,
}

impl MessageHeader {
    pub fn new(name: impl Into<String>, kind: MessageType, seqid: i32) -> Self {
        Self {
            name: name.into(),
            kind,
            seqid,
        }
    }
}

/// A wire format bound to a transport.
pub trait Protocol {
    /// Starts a message; the header travels with the next struct.
    fn write_message_begin(&mut self, header: &MessageHeader) -> Result<(), EncodeError>;

    fn write_message_end(&mut self) -> Result<(), EncodeError>;

    /// Writes a record.
    fn write_struct(&mut self, record: &Record) -> Result<(), EncodeError>;

    /// Reads the header of the next message.
    fn read_message_begin(&mut self) -> Result<MessageHeader, DecodeError>;

    fn read_message_end(&mut self) -> Result<(), DecodeError>;

    /// Reads a record of `spec`.
    fn read_struct(&mut self, spec: &StructRef) -> Result<Record, DecodeError>;

    /// Flushes the underlying transport.
    fn flush(&mut self) -> Result<(), TransportError>;
}

impl<P: Protocol + ?Sized> Protocol for Box<P> {
    fn write_message_begin(&mut self, header: &MessageHeader) -> Result<(), EncodeError> {
        (**self).write_message_begin(header)
    }

    fn write_message_end(&mut self) -> Result<(), EncodeError> {
        (**self).write_message_end()
    }

    fn write_struct(&mut self, record: &Record) -> Result<(), EncodeError> {
        (**self).write_struct(record)
    }

    fn read_message_begin(&mut self) -> Result<MessageHeader, DecodeError> {
        (**self).read_message_begin()
    }

    fn read_message_end(&mut self) -> Result<(), DecodeError> {
        (**self).read_message_end()
    }

    fn read_struct(&mut self, spec: &StructRef) -> Result<Record, DecodeError> {
        (**self).read_struct(spec)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        (**self).flush()
    }
}

/// Wire format selector, negotiated by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProtocolKind {
    #[default]
    Json,
    Binary,
}

impl ProtocolKind {
    pub fn name(self) -> &'static str {
        match self {
            ProtocolKind::Json => "json",
            ProtocolKind::Binary => "binary",
        }
    }

    /// Binds this format to a transport.
    pub fn open<'a, T: Transport + 'a>(self, transport: T, options: DecodeOptions) -> Box<dyn Protocol + 'a> {
        match self {
            ProtocolKind::Json => Box::new(JsonProtocol::with_options(transport, options)),
            ProtocolKind::Binary => Box::new(BinaryProtocol::with_options(transport, options)),
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProtocolKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ProtocolKind::Json),
            "binary" => Ok(ProtocolKind::Binary),
            _ => Err(ParseError::UnknownProtocol(s.to_string())),
        }
    }
}
