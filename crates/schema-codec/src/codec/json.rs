//! JSON wire format.
//!
//! A message is one frame: a 4-byte big-endian length followed by that many
//! bytes of UTF-8 JSON holding the envelope
//!
//! ```text
//! {"metadata": {"version": 1}, "payload": {<field name>: <node>, ...}}
//! ```
//!
//! Binary leaves are base64 (padded on write, padding optional on read) and
//! maps are arrays of `{"key": k, "value": v}` objects, since map keys may be
//! composite.

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Number, Value as Json};
use std::num::IntErrorKind;
use tracing::{debug, trace};

use crate::codec::engine::{DecodeOptions, TreeCodec};
use crate::codec::tree::{LeafCodec, LeafError, Node};
use crate::error::{DecodeError, EncodeError, TransportError};
use crate::limits::{FRAME_PREFIX_LEN, JSON_PROTOCOL_VERSION};
use crate::model::{MapValue, Record, StructRef, TypeSpec, Value};
use crate::protocol::{MessageHeader, MessageType, Protocol};
use crate::transport::{MemoryBuffer, Transport};

const NAN: &str = "NaN";
const INFINITY: &str = "Infinity";
const NEG_INFINITY: &str = "-Infinity";

/// Standard alphabet, accepting input with or without padding and with
/// non-zero trailing bits.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// =============================================================================
// LEAF RULES
// =============================================================================

/// Leaf rules of the JSON format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLeaves;

impl LeafCodec for JsonLeaves {
    fn encode_binary(&self, bytes: &[u8]) -> Node {
        Node::Text(STANDARD.encode(bytes))
    }

    fn decode_binary(&self, node: Node) -> Result<Vec<u8>, LeafError> {
        match node {
            Node::Text(text) => decode_base64(&text),
            Node::Bytes(bytes) => Ok(bytes),
            other => Err(LeafError::Shape(other.kind())),
        }
    }

    fn encode_double(&self, value: f64) -> Node {
        if value.is_nan() {
            Node::Text(NAN.to_string())
        } else if value == f64::INFINITY {
            Node::Text(INFINITY.to_string())
        } else if value == f64::NEG_INFINITY {
            Node::Text(NEG_INFINITY.to_string())
        } else {
            Node::Double(value)
        }
    }

    fn decode_double(&self, node: Node) -> Result<f64, LeafError> {
        match node {
            Node::Double(v) => Ok(v),
            Node::Int(v) => Ok(v as f64),
            Node::Text(text) => match text.as_str() {
                NAN => Ok(f64::NAN),
                INFINITY => Ok(f64::INFINITY),
                NEG_INFINITY => Ok(f64::NEG_INFINITY),
                other => other.trim().parse().map_err(|_| LeafError::Shape("string")),
            },
            other => Err(LeafError::Shape(other.kind())),
        }
    }

    fn decode_integer(&self, node: Node) -> Result<i64, LeafError> {
        match node {
            Node::Int(v) => Ok(v),
            Node::Text(text) => text.trim().parse().map_err(|err: std::num::ParseIntError| {
                match err.kind() {
                    IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                        LeafError::OutOfRange(text.clone())
                    }
                    _ => LeafError::Shape("string"),
                }
            }),
            Node::Double(v) if v.fract() == 0.0 => {
                if v >= i64::MIN as f64 && v < i64::MAX as f64 {
                    Ok(v as i64)
                } else {
                    Err(LeafError::OutOfRange(v.to_string()))
                }
            }
            other => Err(LeafError::Shape(other.kind())),
        }
    }
}

fn decode_base64(text: &str) -> Result<Vec<u8>, LeafError> {
    LENIENT.decode(text).map_err(|err| LeafError::Base64(err.to_string()))
}

// =============================================================================
// TREE <-> JSON
// =============================================================================

/// Renders an intermediate tree as a JSON value.
pub fn node_to_json(node: Node) -> Json {
    match node {
        Node::Null => Json::Null,
        Node::Bool(v) => Json::Bool(v),
        Node::Int(v) => Json::Number(v.into()),
        Node::Double(v) => match Number::from_f64(v) {
            Some(n) => Json::Number(n),
            None => node_to_json(JsonLeaves.encode_double(v)),
        },
        Node::Text(s) => Json::String(s),
        Node::Bytes(b) => node_to_json(JsonLeaves.encode_binary(&b)),
        Node::Seq(items) => Json::Array(items.into_iter().map(node_to_json).collect()),
        Node::Map(pairs) => Json::Array(
            pairs
                .into_iter()
                .map(|(k, v)| {
                    let mut entry = JsonMap::with_capacity(2);
                    entry.insert("key".to_string(), node_to_json(k));
                    entry.insert("value".to_string(), node_to_json(v));
                    Json::Object(entry)
                })
                .collect(),
        ),
        Node::Object(fields) => Json::Object(
            fields
                .into_iter()
                .map(|(name, node)| (name, node_to_json(node)))
                .collect(),
        ),
    }
}

/// Reads a JSON value into an intermediate tree.
///
/// Arrays become sequences; the engine reads `{"key", "value"}` arrays as
/// maps when the declared type is a map.
pub fn json_to_node(json: Json) -> Node {
    match json {
        Json::Null => Node::Null,
        Json::Bool(v) => Node::Bool(v),
        Json::Number(n) => match n.as_i64() {
            Some(v) => Node::Int(v),
            // Integers above i64::MAX and fractional numbers.
            None => Node::Double(n.as_f64().unwrap_or(f64::NAN)),
        },
        Json::String(s) => Node::Text(s),
        Json::Array(items) => Node::Seq(items.into_iter().map(json_to_node).collect()),
        Json::Object(fields) => Node::Object(
            fields
                .into_iter()
                .map(|(name, value)| (name, json_to_node(value)))
                .collect(),
        ),
    }
}

// =============================================================================
// STANDALONE HELPERS
// =============================================================================

/// Encodes a record as its JSON payload object, without envelope or framing.
pub fn struct_to_json(record: &Record) -> Result<Json, EncodeError> {
    TreeCodec::new(JsonLeaves).encode_struct(record).map(node_to_json)
}

/// Decodes a JSON payload object into a record of `spec`.
pub fn json_to_struct(json: Json, spec: &StructRef, options: &DecodeOptions) -> Result<Record, DecodeError> {
    TreeCodec::with_options(JsonLeaves, *options).decode_struct(json_to_node(json), spec)
}

/// Encodes list or set elements as a JSON array.
pub fn list_to_json(items: &[Value], elem: &TypeSpec) -> Result<Json, EncodeError> {
    TreeCodec::new(JsonLeaves).encode_list(items, elem).map(node_to_json)
}

/// Decodes a JSON array into list elements.
pub fn json_to_list(json: Json, elem: &TypeSpec, options: &DecodeOptions) -> Result<Vec<Value>, DecodeError> {
    TreeCodec::with_options(JsonLeaves, *options).decode_list(json_to_node(json), elem)
}

/// Encodes a map as a JSON array of `{"key": k, "value": v}` objects.
pub fn map_to_json(map: &MapValue, key: &TypeSpec, value: &TypeSpec) -> Result<Json, EncodeError> {
    TreeCodec::new(JsonLeaves).encode_map(map, key, value).map(node_to_json)
}

/// Decodes a JSON array of `{"key": k, "value": v}` objects into a map.
pub fn json_to_map(
    json: Json,
    key: &TypeSpec,
    value: &TypeSpec,
    options: &DecodeOptions,
) -> Result<MapValue, DecodeError> {
    TreeCodec::with_options(JsonLeaves, *options).decode_map(json_to_node(json), key, value)
}

/// Encodes a record as one complete JSON frame.
pub fn encode_json(record: &Record) -> Result<Vec<u8>, EncodeError> {
    let mut protocol = JsonProtocol::new(MemoryBuffer::new());
    protocol.write_struct(record)?;
    Ok(protocol.into_inner().into_inner())
}

/// Decodes one complete JSON frame into a record of `spec`.
pub fn decode_json(bytes: &[u8], spec: &StructRef, options: &DecodeOptions) -> Result<Record, DecodeError> {
    JsonProtocol::with_options(MemoryBuffer::from(bytes), *options).read_struct(spec)
}

// =============================================================================
// ENVELOPE AND FRAMING
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    metadata: Metadata,
    payload: Json,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Metadata {
    version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ttype: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    seqid: Option<i32>,
}

impl Metadata {
    fn for_header(header: Option<&MessageHeader>) -> Self {
        Self {
            version: JSON_PROTOCOL_VERSION,
            name: header.map(|h| h.name.clone()),
            ttype: header.map(|h| i64::from(h.kind as u8)),
            seqid: header.map(|h| h.seqid),
        }
    }

    fn header(&self) -> Result<MessageHeader, DecodeError> {
        let ttype = self
            .ttype
            .ok_or_else(|| DecodeError::MalformedEnvelope("metadata has no message type".to_string()))?;
        Ok(MessageHeader {
            name: self.name.clone().unwrap_or_default(),
            kind: MessageType::from_i64(ttype)?,
            seqid: self.seqid.unwrap_or_default(),
        })
    }
}

/// JSON protocol over a transport.
///
/// `read_message_begin` consumes a whole frame; the following `read_struct`
/// decodes the payload of that frame instead of reading another one.
#[derive(Debug)]
pub struct JsonProtocol<T> {
    transport: T,
    codec: TreeCodec<JsonLeaves>,
    outgoing: Option<MessageHeader>,
    incoming: Option<Json>,
}

impl<T: Transport> JsonProtocol<T> {
    /// Creates a protocol with default decode options.
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, DecodeOptions::default())
    }

    pub fn with_options(transport: T, options: DecodeOptions) -> Self {
        Self {
            transport,
            codec: TreeCodec::with_options(JsonLeaves, options),
            outgoing: None,
            incoming: None,
        }
    }

    pub fn options(&self) -> &DecodeOptions {
        self.codec.options()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    fn write_frame(&mut self, envelope: &Envelope) -> Result<(), EncodeError> {
        let body = serde_json::to_vec(envelope).map_err(|err| EncodeError::Json(err.to_string()))?;
        let len = u32::try_from(body.len()).map_err(|_| EncodeError::FrameTooLarge { len: body.len() })?;

        let mut frame = Vec::with_capacity(FRAME_PREFIX_LEN + body.len());
        frame.extend_from_slice(&len.to_be_bytes());
        frame.extend_from_slice(&body);
        self.transport.write(&frame)?;
        trace!(len, "wrote json frame");
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Envelope, DecodeError> {
        let prefix = self.transport.read(FRAME_PREFIX_LEN)?;
        let prefix: [u8; FRAME_PREFIX_LEN] = prefix.try_into().map_err(|rest: Vec<u8>| TransportError::Eof {
            need: FRAME_PREFIX_LEN,
            available: rest.len(),
        })?;
        let len = u32::from_be_bytes(prefix) as usize;
        let max = self.codec.options().max_frame_len;
        if len > max {
            return Err(DecodeError::FrameTooLarge { len, max });
        }

        let body = self.transport.read(len)?;
        trace!(len, "read json frame");

        // serde_json's own recursion cap is lifted, so nesting is bounded here:
        // each struct or list adds one JSON level, each map two, plus the envelope.
        let max_depth = self.codec.options().max_depth;
        if nesting_exceeds(&body, max_depth.saturating_mul(2).saturating_add(1)) {
            return Err(DecodeError::DepthExceeded { max: max_depth });
        }
        let malformed = |err: serde_json::Error| DecodeError::MalformedJson(err.to_string());
        let mut de = serde_json::Deserializer::from_slice(&body);
        de.disable_recursion_limit();
        let json = Json::deserialize(&mut de).map_err(malformed)?;
        de.end().map_err(malformed)?;
        let envelope: Envelope =
            serde_json::from_value(json).map_err(|err| DecodeError::MalformedEnvelope(err.to_string()))?;
        if envelope.metadata.version != JSON_PROTOCOL_VERSION {
            return Err(DecodeError::UnsupportedVersion {
                version: envelope.metadata.version,
            });
        }
        Ok(envelope)
    }
}

/// Reports whether arrays and objects in `body` nest deeper than `limit`.
/// Brackets inside strings do not count.
fn nesting_exceeds(body: &[u8], limit: usize) -> bool {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for &byte in body {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'[' | b'{' => {
                depth += 1;
                if depth > limit {
                    return true;
                }
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    false
}

impl<T: Transport> Protocol for JsonProtocol<T> {
    fn write_message_begin(&mut self, header: &MessageHeader) -> Result<(), EncodeError> {
        debug!(name = %header.name, kind = ?header.kind, seqid = header.seqid, "json message begin");
        self.outgoing = Some(header.clone());
        Ok(())
    }

    fn write_message_end(&mut self) -> Result<(), EncodeError> {
        self.outgoing = None;
        Ok(())
    }

    fn write_struct(&mut self, record: &Record) -> Result<(), EncodeError> {
        let payload = node_to_json(self.codec.encode_struct(record)?);
        let envelope = Envelope {
            metadata: Metadata::for_header(self.outgoing.as_ref()),
            payload,
        };
        self.write_frame(&envelope)
    }

    fn read_message_begin(&mut self) -> Result<MessageHeader, DecodeError> {
        let envelope = self.read_frame()?;
        let header = envelope.metadata.header()?;
        debug!(name = %header.name, kind = ?header.kind, seqid = header.seqid, "json message read");
        self.incoming = Some(envelope.payload);
        Ok(header)
    }

    fn read_message_end(&mut self) -> Result<(), DecodeError> {
        self.incoming = None;
        Ok(())
    }

    fn read_struct(&mut self, spec: &StructRef) -> Result<Record, DecodeError> {
        let payload = match self.incoming.take() {
            Some(payload) => payload,
            None => self.read_frame()?.payload,
        };
        self.codec.decode_struct(json_to_node(payload), spec)
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.transport.flush()
    }
}
