//! Positional binary wire format.
//!
//! ```text
//! struct   := (type:u8 id:i16 value)* 0x00
//! string   := len:i32 bytes
//! list/set := elem_type:u8 count:i32 value*
//! map      := key_type:u8 value_type:u8 count:i32 (key value)*
//! message  := (0x8001_0000 | type):i32 name:string seqid:i32
//! ```
//!
//! Integers and doubles are big-endian fixed width; bools are one byte.
//! Fields are addressed by id, so unknown ids are skipped by wire type.

use tracing::debug;

use crate::codec::engine::{DecodeOptions, check_required, defined, next_level};
use crate::codec::policy::process_string_or_binary;
use crate::codec::primitives::{Reader, Writer};
use crate::codec::tree::Trail;
use crate::error::{DecodeError, EncodeError, TransportError};
use crate::limits::{
    BINARY_STOP, BINARY_TYPE_MASK, BINARY_VERSION_1, BINARY_VERSION_MASK, DEFAULT_MAX_DEPTH,
};
use crate::model::{MapValue, Record, StructRef, TType, TypeSpec, Value};
use crate::protocol::{MessageHeader, MessageType, Protocol};
use crate::transport::{MemoryBuffer, Transport};

// =============================================================================
// ENCODING
// =============================================================================

/// Encodes a record as a standalone binary struct.
///
/// Nesting is bounded by the default `max_depth`; use a [`BinaryProtocol`]
/// built with other options to write deeper records.
pub fn encode_binary(record: &Record) -> Result<Vec<u8>, EncodeError> {
    let mut writer = Writer::new();
    Encoder {
        writer: &mut writer,
        max_depth: DEFAULT_MAX_DEPTH,
    }
    .record(record, &Trail::root(record.type_name()), 0)?;
    Ok(writer.into_bytes())
}

/// Encoding state for one top-level write.
struct Encoder<'w> {
    writer: &'w mut Writer,
    max_depth: usize,
}

impl Encoder<'_> {
    fn descend(&self, depth: usize) -> Result<usize, EncodeError> {
        next_level(depth, self.max_depth).ok_or(EncodeError::DepthExceeded { max: self.max_depth })
    }

    fn record(&mut self, record: &Record, trail: &Trail<'_>, depth: usize) -> Result<(), EncodeError> {
        let spec = defined(record.spec_ref()).map_err(|name| EncodeError::UndefinedStruct { name })?;
        let depth = self.descend(depth)?;

        for (slot, field) in spec.fields().iter().enumerate() {
            if field.ty == TypeSpec::Void {
                continue;
            }
            if let Some(value) = record.slot_value(slot) {
                self.writer.write_byte(field.ty.ttype().wire_id());
                self.writer.write_i16(field.id);
                self.value(value, &field.ty, &trail.field(&field.name), depth)?;
            }
        }
        self.writer.write_byte(BINARY_STOP);
        Ok(())
    }

    fn value(&mut self, value: &Value, ty: &TypeSpec, trail: &Trail<'_>, depth: usize) -> Result<(), EncodeError> {
        let w = &mut *self.writer;
        match (ty, value) {
            (TypeSpec::Bool, Value::Bool(v)) => w.write_bool(*v),
            (TypeSpec::Byte, Value::Byte(v)) => w.write_i8(*v),
            (TypeSpec::I16, Value::I16(v)) => w.write_i16(*v),
            (TypeSpec::I32, Value::I32(v)) => w.write_i32(*v),
            (TypeSpec::I64, Value::I64(v)) => w.write_i64(*v),
            (TypeSpec::Double, Value::Double(v)) => w.write_f64(*v),
            (TypeSpec::String, Value::String(s)) | (TypeSpec::Binary, Value::String(s)) => {
                w.write_bytes_prefixed(s.as_bytes(), "string")?
            }
            (TypeSpec::String, Value::Binary(b)) => {
                if std::str::from_utf8(b).is_err() {
                    return Err(EncodeError::InvalidUtf8 {
                        path: trail.render(),
                    });
                }
                w.write_bytes_prefixed(b, "string")?
            }
            (TypeSpec::Binary, Value::Binary(b)) => w.write_bytes_prefixed(b, "binary")?,
            (TypeSpec::Struct(expected), Value::Struct(record)) if record.spec_ref().ptr_eq(expected) => {
                self.record(record, trail, depth)?
            }
            (TypeSpec::List(elem), Value::List(items)) | (TypeSpec::Set(elem), Value::Set(items)) => {
                let depth = self.descend(depth)?;
                self.writer.write_byte(elem.ttype().wire_id());
                self.writer.write_len(items.len(), "list")?;
                for (i, item) in items.iter().enumerate() {
                    self.value(item, elem, &trail.index(i), depth)?;
                }
            }
            (TypeSpec::Map(key, val), Value::Map(map)) => {
                let depth = self.descend(depth)?;
                self.writer.write_byte(key.ttype().wire_id());
                self.writer.write_byte(val.ttype().wire_id());
                self.writer.write_len(map.len(), "map")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    self.value(k, key, &trail.key(i), depth)?;
                    self.value(v, val, &trail.value(i), depth)?;
                }
            }
            _ => {
                return Err(EncodeError::TypeMismatch {
                    path: trail.render(),
                    expected: ty.ttype(),
                    found: value.kind(),
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// DECODING
// =============================================================================

/// Decodes a standalone binary struct into a record of `spec`.
pub fn decode_binary(bytes: &[u8], spec: &StructRef, options: &DecodeOptions) -> Result<Record, DecodeError> {
    BinaryProtocol::with_options(MemoryBuffer::from(bytes), *options).read_struct(spec)
}

/// Decoding state for one top-level read.
struct Decoder<'r, 't, T: ?Sized> {
    reader: &'r mut Reader<'t, T>,
    options: &'r DecodeOptions,
}

impl<T: Transport + ?Sized> Decoder<'_, '_, T> {
    fn descend(&self, depth: usize) -> Result<usize, DecodeError> {
        let max = self.options.max_depth;
        next_level(depth, max).ok_or(DecodeError::DepthExceeded { max })
    }

    fn wire_type(&mut self) -> Result<Option<TType>, DecodeError> {
        match self.reader.read_byte()? {
            BINARY_STOP => Ok(None),
            value => TType::from_wire_id(value)
                .map(Some)
                .ok_or(DecodeError::UnknownWireType { value }),
        }
    }

    fn element_type(&mut self) -> Result<TType, DecodeError> {
        let value = self.reader.read_byte()?;
        TType::from_wire_id(value).ok_or(DecodeError::UnknownWireType { value })
    }

    fn record(&mut self, spec: &StructRef, trail: &Trail<'_>, depth: usize) -> Result<Record, DecodeError> {
        let depth = self.descend(depth)?;
        let struct_spec = defined(spec).map_err(|name| DecodeError::UndefinedStruct { name })?;

        let mut record = Record::new(spec);
        while let Some(wire) = self.wire_type()? {
            let id = self.reader.read_i16()?;
            let Some(slot) = struct_spec.slot_of_id(id) else {
                self.skip(wire, depth)?;
                continue;
            };
            let field = &struct_spec.fields()[slot];
            let field_trail = trail.field(&field.name);
            expect_wire(&field_trail, &field.ty, wire)?;
            if field.ty == TypeSpec::Void {
                continue;
            }
            let value = self.value(&field.ty, &field_trail, depth)?;
            record.set_slot(slot, value);
        }

        if self.options.enforce_required {
            check_required(&record, struct_spec)?;
        }
        Ok(record)
    }

    fn value(&mut self, ty: &TypeSpec, trail: &Trail<'_>, depth: usize) -> Result<Value, DecodeError> {
        let value = match ty {
            TypeSpec::Bool => Value::Bool(self.reader.read_bool()?),
            TypeSpec::Byte => Value::Byte(self.reader.read_i8()?),
            TypeSpec::I16 => Value::I16(self.reader.read_i16()?),
            TypeSpec::I32 => Value::I32(self.reader.read_i32()?),
            TypeSpec::I64 => Value::I64(self.reader.read_i64()?),
            TypeSpec::Double => Value::Double(self.reader.read_f64()?),
            TypeSpec::String | TypeSpec::Binary => {
                let bytes = self.reader.read_bytes_prefixed("string")?;
                process_string_or_binary(bytes, ty.ttype(), self.options.policy).map_err(|_| {
                    DecodeError::InvalidUtf8 {
                        path: trail.render(),
                    }
                })?
            }
            TypeSpec::Struct(spec) => Value::Struct(self.record(spec, trail, depth)?),
            TypeSpec::List(elem) => Value::List(self.seq(elem, trail, depth)?),
            TypeSpec::Set(elem) => Value::Set(self.seq(elem, trail, depth)?),
            TypeSpec::Map(key, val) => {
                let depth = self.descend(depth)?;
                let key_wire = self.element_type()?;
                let val_wire = self.element_type()?;
                let count = self.reader.read_len(self.options.max_container_len, "map")?;
                if count > 0 {
                    expect_wire(trail, key, key_wire)?;
                    expect_wire(trail, val, val_wire)?;
                }
                let mut map = MapValue::with_capacity(count);
                for i in 0..count {
                    let k = self.value(key, &trail.key(i), depth)?;
                    let v = self.value(val, &trail.value(i), depth)?;
                    // Duplicate wire keys: the later entry replaces the earlier one.
                    map.insert(k, v);
                }
                Value::Map(map)
            }
            TypeSpec::Void => {
                return Err(DecodeError::SchemaMismatch {
                    path: trail.render(),
                    expected: TType::Void,
                    found: "value".to_string(),
                });
            }
        };
        Ok(value)
    }

    fn seq(&mut self, elem: &TypeSpec, trail: &Trail<'_>, depth: usize) -> Result<Vec<Value>, DecodeError> {
        let depth = self.descend(depth)?;
        let wire = self.element_type()?;
        let count = self.reader.read_len(self.options.max_container_len, "list")?;
        if count > 0 {
            expect_wire(trail, elem, wire)?;
        }
        (0..count)
            .map(|i| self.value(elem, &trail.index(i), depth))
            .collect()
    }

    /// Consumes one value of wire type `wire` without decoding it.
    fn skip(&mut self, wire: TType, depth: usize) -> Result<(), DecodeError> {
        match wire {
            TType::Void => {}
            TType::Bool | TType::Byte => {
                self.reader.read_bytes(1)?;
            }
            TType::I16 => {
                self.reader.read_bytes(2)?;
            }
            TType::I32 => {
                self.reader.read_bytes(4)?;
            }
            TType::I64 | TType::Double => {
                self.reader.read_bytes(8)?;
            }
            TType::String | TType::Binary => {
                self.reader.read_bytes_prefixed("string")?;
            }
            TType::Struct => {
                let depth = self.descend(depth)?;
                while let Some(field_wire) = self.wire_type()? {
                    self.reader.read_i16()?;
                    self.skip(field_wire, depth)?;
                }
            }
            TType::List | TType::Set => {
                let depth = self.descend(depth)?;
                let elem = self.element_type()?;
                let count = self.reader.read_len(self.options.max_container_len, "list")?;
                for _ in 0..count {
                    self.skip(elem, depth)?;
                }
            }
            TType::Map => {
                let depth = self.descend(depth)?;
                let key = self.element_type()?;
                let val = self.element_type()?;
                let count = self.reader.read_len(self.options.max_container_len, "map")?;
                for _ in 0..count {
                    self.skip(key, depth)?;
                    self.skip(val, depth)?;
                }
            }
        }
        Ok(())
    }

    fn message_header(&mut self) -> Result<MessageHeader, DecodeError> {
        let first = self.reader.read_i32()?;
        let (name, kind) = if first < 0 {
            let word = first as u32;
            if word & BINARY_VERSION_MASK != BINARY_VERSION_1 {
                return Err(DecodeError::BadProtocolVersion { found: word });
            }
            let name = self.reader.read_bytes_prefixed("message name")?;
            (name, i64::from(word & BINARY_TYPE_MASK))
        } else {
            if self.options.strict_read {
                return Err(DecodeError::BadProtocolVersion { found: first as u32 });
            }
            // Legacy header: the first word is the name length.
            let len = first as usize;
            if len > self.options.max_string_len {
                return Err(DecodeError::LengthExceedsLimit {
                    field: "message name",
                    len,
                    max: self.options.max_string_len,
                });
            }
            let name = self.reader.read_bytes(len)?;
            (name, i64::from(self.reader.read_byte()?))
        };

        let name = String::from_utf8(name).map_err(|_| DecodeError::InvalidUtf8 {
            path: "message name".to_string(),
        })?;
        let kind = MessageType::from_i64(kind)?;
        let seqid = self.reader.read_i32()?;
        Ok(MessageHeader { name, kind, seqid })
    }
}

fn expect_wire(trail: &Trail<'_>, ty: &TypeSpec, wire: TType) -> Result<(), DecodeError> {
    let expected = ty.ttype();
    if expected.wire_id() != wire.wire_id() {
        return Err(DecodeError::SchemaMismatch {
            path: trail.render(),
            expected,
            found: wire.name().to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// PROTOCOL
// =============================================================================

/// Binary protocol over a transport.
#[derive(Debug)]
pub struct BinaryProtocol<T> {
    transport: T,
    options: DecodeOptions,
}

impl<T: Transport> BinaryProtocol<T> {
    /// Creates a protocol with default decode options.
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, DecodeOptions::default())
    }

    pub fn with_options(transport: T, options: DecodeOptions) -> Self {
        Self { transport, options }
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    fn decode<R>(
        &mut self,
        f: impl FnOnce(&mut Decoder<'_, '_, T>) -> Result<R, DecodeError>,
    ) -> Result<R, DecodeError> {
        let mut reader = Reader::new(&mut self.transport, self.options.max_string_len);
        let mut decoder = Decoder {
            reader: &mut reader,
            options: &self.options,
        };
        f(&mut decoder)
    }
}

impl<T: Transport> Protocol for BinaryProtocol<T> {
    fn write_message_begin(&mut self, header: &MessageHeader) -> Result<(), EncodeError> {
        debug!(name = %header.name, kind = ?header.kind, seqid = header.seqid, "binary message begin");
        let mut w = Writer::with_capacity(12 + header.name.len());
        w.write_u32(BINARY_VERSION_1 | u32::from(header.kind as u8));
        w.write_bytes_prefixed(header.name.as_bytes(), "message name")?;
        w.write_i32(header.seqid);
        Ok(self.transport.write(w.as_bytes())?)
    }

    fn write_message_end(&mut self) -> Result<(), EncodeError> {
        Ok(())
    }

    fn write_struct(&mut self, record: &Record) -> Result<(), EncodeError> {
        let mut writer = Writer::new();
        Encoder {
            writer: &mut writer,
            max_depth: self.options.max_depth,
        }
        .record(record, &Trail::root(record.type_name()), 0)?;
        Ok(self.transport.write(writer.as_bytes())?)
    }

    fn read_message_begin(&mut self) -> Result<MessageHeader, DecodeError> {
        let header = self.decode(|d| d.message_header())?;
        debug!(name = %header.name, kind = ?header.kind, seqid = header.seqid, "binary message read");
        Ok(header)
    }

    fn read_message_end(&mut self) -> Result<(), DecodeError> {
        Ok(())
    }

    fn read_struct(&mut self, spec: &StructRef) -> Result<Record, DecodeError> {
        self.decode(|d| d.record(spec, &Trail::root(spec.name()), 0))
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.transport.flush()
    }
}
