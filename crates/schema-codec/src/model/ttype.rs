//! The closed set of wire type tags.

use std::fmt;

/// Wire type kinds.
///
/// `Binary` shares the wire representation of `String` (an opaque byte
/// sequence); it only changes how decoded bytes are surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TType {
    Void,
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    String,
    Binary,
    Struct,
    List,
    Set,
    Map,
}

impl TType {
    /// Returns the type byte used by the positional binary format.
    pub fn wire_id(self) -> u8 {
        match self {
            TType::Void => 1,
            TType::Bool => 2,
            TType::Byte => 3,
            TType::Double => 4,
            TType::I16 => 6,
            TType::I32 => 8,
            TType::I64 => 10,
            TType::String | TType::Binary => 11,
            TType::Struct => 12,
            TType::Map => 13,
            TType::Set => 14,
            TType::List => 15,
        }
    }

    /// Creates a TType from its binary wire id.
    ///
    /// Id 11 always maps to `String`; the binary/string distinction is not
    /// carried on the wire.
    pub fn from_wire_id(v: u8) -> Option<TType> {
        match v {
            1 => Some(TType::Void),
            2 => Some(TType::Bool),
            3 => Some(TType::Byte),
            4 => Some(TType::Double),
            6 => Some(TType::I16),
            8 => Some(TType::I32),
            10 => Some(TType::I64),
            11 => Some(TType::String),
            12 => Some(TType::Struct),
            13 => Some(TType::Map),
            14 => Some(TType::Set),
            15 => Some(TType::List),
            _ => None,
        }
    }

    /// Lowercase name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            TType::Void => "void",
            TType::Bool => "bool",
            TType::Byte => "byte",
            TType::I16 => "i16",
            TType::I32 => "i32",
            TType::I64 => "i64",
            TType::Double => "double",
            TType::String => "string",
            TType::Binary => "binary",
            TType::Struct => "struct",
            TType::List => "list",
            TType::Set => "set",
            TType::Map => "map",
        }
    }

    /// Returns true for the fixed-width integer tags.
    pub fn is_integer(self) -> bool {
        matches!(self, TType::Byte | TType::I16 | TType::I32 | TType::I64)
    }

    /// Returns true if values of this tag share the string wire shape.
    pub fn is_string_like(self) -> bool {
        matches!(self, TType::String | TType::Binary)
    }
}

impl fmt::Display for TType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_id_roundtrip() {
        for t in [
            TType::Void,
            TType::Bool,
            TType::Byte,
            TType::I16,
            TType::I32,
            TType::I64,
            TType::Double,
            TType::String,
            TType::Struct,
            TType::List,
            TType::Set,
            TType::Map,
        ] {
            assert_eq!(TType::from_wire_id(t.wire_id()), Some(t));
        }
    }

    #[test]
    fn test_binary_is_string_on_wire() {
        assert_eq!(TType::Binary.wire_id(), TType::String.wire_id());
        assert_eq!(TType::from_wire_id(11), Some(TType::String));
        assert_eq!(TType::from_wire_id(0), None);
        assert_eq!(TType::from_wire_id(7), None);
    }
}
