//! JSON wire format: envelope, framing, helpers and decode policy.

use schema_codec::{
    DecodeError, DecodeOptions, DecodePolicy, EncodeError, JsonProtocol, MapValue, MemoryBuffer, MessageHeader,
    MessageType, Protocol, Record, StructRef, StructSpec, TransportError, TypeSpec, Value,
    decode_json, encode_json, json_to_list, json_to_map, json_to_struct, list_to_json, map_to_json,
    struct_to_json,
};
use serde_json::json;

fn item_spec() -> StructRef {
    StructSpec::builder("Item")
        .optional(1, "id", TypeSpec::I32)
        .optional(2, "phones", TypeSpec::list(TypeSpec::String))
        .optional(3, "binary", TypeSpec::Binary)
        .optional(4, "comment", TypeSpec::String)
        .build()
        .unwrap()
}

fn item(spec: &StructRef) -> Record {
    Record::new(spec)
        .with("id", 13)
        .unwrap()
        .with("phones", Value::List(vec!["5234".into(), "12346456".into()]))
        .unwrap()
        .with("binary", vec![0xffu8])
        .unwrap()
}

fn frame(body: &[u8]) -> Vec<u8> {
    let mut bytes = (body.len() as u32).to_be_bytes().to_vec();
    bytes.extend_from_slice(body);
    bytes
}

#[test]
fn test_map_to_json() {
    let map: MapValue = [("ratio", 0.618)].into_iter().collect();
    let json = map_to_json(&map, &TypeSpec::String, &TypeSpec::Double).unwrap();
    assert_eq!(json, json!([{"key": "ratio", "value": 0.618}]));

    let decoded = json_to_map(json, &TypeSpec::String, &TypeSpec::Double, &DecodeOptions::default()).unwrap();
    assert_eq!(decoded, map);
}

#[test]
fn test_json_to_map_numeric_string() {
    let json = json!([{"key": "ratio", "value": "0.618"}]);
    let map = json_to_map(json, &TypeSpec::String, &TypeSpec::Double, &DecodeOptions::default()).unwrap();
    assert_eq!(map.get(&"ratio".into()), Some(&Value::Double(0.618)));
}

#[test]
fn test_list_identity() {
    let items: Vec<Value> = [4, 8, 4, 12, 67].into_iter().map(Value::I32).collect();
    let json = list_to_json(&items, &TypeSpec::I32).unwrap();
    assert_eq!(json, json!([4, 8, 4, 12, 67]));
    assert_eq!(json_to_list(json, &TypeSpec::I32, &DecodeOptions::default()).unwrap(), items);
}

#[test]
fn test_struct_to_json_is_sparse() {
    let spec = item_spec();
    let json = struct_to_json(&item(&spec)).unwrap();
    assert_eq!(
        json,
        json!({"id": 13, "phones": ["5234", "12346456"], "binary": "/w=="})
    );
}

#[test]
fn test_binary_padding_tolerance() {
    let spec = item_spec();
    for encoded in ["/w==", "/w"] {
        let record = json_to_struct(json!({"binary": encoded}), &spec, &DecodeOptions::default()).unwrap();
        assert_eq!(record.get("binary"), Some(&Value::Binary(vec![0xff])));
    }
}

#[test]
fn test_invalid_base64_names_field() {
    let spec = item_spec();
    let err = json_to_struct(json!({"binary": "*!"}), &spec, &DecodeOptions::default()).unwrap_err();
    assert!(matches!(err, DecodeError::InvalidBase64 { ref path, .. } if path == "Item.binary"));
}

#[test]
fn test_write_framing() {
    let spec = item_spec();
    let bytes = encode_json(&item(&spec)).unwrap();

    let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    assert_eq!(len, bytes.len() - 4);

    let body = std::str::from_utf8(&bytes[4..]).unwrap();
    assert_eq!(
        body,
        r#"{"metadata":{"version":1},"payload":{"id":13,"phones":["5234","12346456"],"binary":"/w=="}}"#
    );
}

#[test]
fn test_write_then_read() {
    let spec = item_spec();
    let record = item(&spec);

    let mut protocol = JsonProtocol::new(MemoryBuffer::new());
    protocol.write_struct(&record).unwrap();
    let mut buf = protocol.into_inner();
    buf.reset();

    let mut protocol = JsonProtocol::new(buf);
    assert_eq!(protocol.read_struct(&spec).unwrap(), record);
}

#[test]
fn test_unicode_roundtrip() {
    let spec = item_spec();
    for text in ["p\u{e3}o de a\u{e7}\u{fa}car", "\u{65e5}\u{672c}\u{8a9e} \u{442}\u{435}\u{43a}\u{441}\u{442}"] {
        let record = Record::new(&spec).with("comment", text).unwrap();
        let bytes = encode_json(&record).unwrap();

        let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        assert_eq!(len, bytes.len() - 4);

        let decoded = decode_json(&bytes, &spec, &DecodeOptions::default()).unwrap();
        assert_eq!(decoded.get("comment"), Some(&Value::String(text.to_string())));
    }
}

#[test]
fn test_unknown_field_ignored() {
    let spec = item_spec();
    let body = br#"{"metadata":{"version":1},"payload":{"id":1,"color":"red","nested":{"a":[1,2]}}}"#;
    let record = decode_json(&frame(body), &spec, &DecodeOptions::default()).unwrap();
    assert_eq!(record.get("id"), Some(&Value::I32(1)));
    assert_eq!(record.iter().count(), 1);
}

#[test]
fn test_null_leaves_field_unset() {
    let spec = item_spec();
    let record = json_to_struct(json!({"id": null}), &spec, &DecodeOptions::default()).unwrap();
    assert!(!record.is_set("id"));
}

#[test]
fn test_schema_mismatch() {
    let spec = item_spec();
    let err = json_to_struct(json!({"phones": {"a": 1}}), &spec, &DecodeOptions::default()).unwrap_err();
    assert_eq!(
        err,
        DecodeError::SchemaMismatch {
            path: "Item.phones".to_string(),
            expected: schema_codec::TType::List,
            found: "object".to_string(),
        }
    );
}

#[test]
fn test_decode_policy_on_binary_field() {
    let spec = item_spec();
    // "/w==" is 0xff, which is not UTF-8.
    let options = |policy| DecodeOptions::default().with_policy(policy);

    let auto = json_to_struct(json!({"binary": "/w=="}), &spec, &options(DecodePolicy::Auto)).unwrap();
    assert_eq!(auto.get("binary"), Some(&Value::Binary(vec![0xff])));

    let forced = json_to_struct(json!({"binary": "/w=="}), &spec, &options(DecodePolicy::Always));
    assert!(matches!(forced, Err(DecodeError::InvalidUtf8 { .. })));

    let tried = json_to_struct(json!({"binary": "/w=="}), &spec, &options(DecodePolicy::TryDecode)).unwrap();
    assert_eq!(tried.get("binary"), Some(&Value::Binary(vec![0xff])));

    // "aGk=" is "hi".
    let text = json_to_struct(json!({"binary": "aGk="}), &spec, &options(DecodePolicy::Always)).unwrap();
    assert_eq!(text.get("binary"), Some(&Value::String("hi".to_string())));
}

#[test]
fn test_decode_policy_on_string_field() {
    let spec = item_spec();
    let never = DecodeOptions::default().with_policy(DecodePolicy::Never);
    let record = json_to_struct(json!({"comment": "hi"}), &spec, &never).unwrap();
    assert_eq!(record.get("comment"), Some(&Value::Binary(b"hi".to_vec())));
}

#[test]
fn test_message_header_in_metadata() {
    let spec = item_spec();
    let record = item(&spec);
    let header = MessageHeader::new("getItem", MessageType::Reply, 7);

    let mut protocol = JsonProtocol::new(MemoryBuffer::new());
    protocol.write_message_begin(&header).unwrap();
    protocol.write_struct(&record).unwrap();
    protocol.write_message_end().unwrap();
    let mut buf = protocol.into_inner();

    let body: serde_json::Value = serde_json::from_slice(&buf.as_bytes()[4..]).unwrap();
    assert_eq!(
        body["metadata"],
        json!({"version": 1, "name": "getItem", "ttype": 2, "seqid": 7})
    );

    buf.reset();
    let mut protocol = JsonProtocol::new(buf);
    assert_eq!(protocol.read_message_begin().unwrap(), header);
    assert_eq!(protocol.read_struct(&spec).unwrap(), record);
    protocol.read_message_end().unwrap();
    assert_eq!(protocol.into_inner().remaining(), 0);
}

#[test]
fn test_unsupported_version() {
    let body = br#"{"metadata":{"version":2},"payload":{}}"#;
    let err = decode_json(&frame(body), &item_spec(), &DecodeOptions::default()).unwrap_err();
    assert_eq!(err, DecodeError::UnsupportedVersion { version: 2 });
}

#[test]
fn test_malformed_frames() {
    let spec = item_spec();
    let options = DecodeOptions::default();

    let err = decode_json(&frame(b"{not json"), &spec, &options).unwrap_err();
    assert!(matches!(err, DecodeError::MalformedJson(_)));

    let err = decode_json(&frame(br#"{"payload":{}}"#), &spec, &options).unwrap_err();
    assert!(matches!(err, DecodeError::MalformedEnvelope(_)));
}

#[test]
fn test_short_reads() {
    let spec = item_spec();
    let options = DecodeOptions::default();

    let err = decode_json(&[0, 0], &spec, &options).unwrap_err();
    assert!(matches!(err, DecodeError::Transport(TransportError::Eof { need: 4, .. })));

    let mut truncated = 100u32.to_be_bytes().to_vec();
    truncated.extend_from_slice(b"{\"metadata\"");
    let err = decode_json(&truncated, &spec, &options).unwrap_err();
    assert!(matches!(err, DecodeError::Transport(TransportError::Eof { need: 100, .. })));
}

#[test]
fn test_frame_limit() {
    let spec = item_spec();
    let bytes = encode_json(&item(&spec)).unwrap();
    let options = DecodeOptions {
        max_frame_len: 16,
        ..DecodeOptions::default()
    };
    assert!(matches!(
        decode_json(&bytes, &spec, &options),
        Err(DecodeError::FrameTooLarge { max: 16, .. })
    ));
}

#[test]
fn test_integer_width_enforced() {
    let spec = item_spec();
    let err = json_to_struct(json!({"id": 4_294_967_296i64}), &spec, &DecodeOptions::default()).unwrap_err();
    assert!(matches!(err, DecodeError::IntegerOutOfRange { .. }));

    let record = json_to_struct(json!({"id": "13"}), &spec, &DecodeOptions::default()).unwrap();
    assert_eq!(record.get("id"), Some(&Value::I32(13)));
}

#[test]
fn test_nested_structs_and_maps() {
    let phone = StructSpec::builder("Phone")
        .required(1, "number", TypeSpec::String)
        .build()
        .unwrap();
    let book = StructSpec::builder("Book")
        .optional(1, "by_owner", TypeSpec::map(TypeSpec::structure(&phone), TypeSpec::set(TypeSpec::I64)))
        .build()
        .unwrap();

    let key = Record::new(&phone).with("number", "555").unwrap();
    let map: MapValue = [(key, Value::Set(vec![Value::I64(1), Value::I64(1)]))].into_iter().collect();
    let record = Record::new(&book).with("by_owner", map).unwrap();

    let json = struct_to_json(&record).unwrap();
    assert_eq!(
        json,
        json!({"by_owner": [{"key": {"number": "555"}, "value": [1, 1]}]})
    );
    let decoded = json_to_struct(json, &book, &DecodeOptions::default()).unwrap();
    assert_eq!(decoded, record);
}

fn node_spec() -> StructRef {
    let node = StructRef::declare("Node");
    StructSpec::builder("Node")
        .optional(1, "label", TypeSpec::String)
        .optional(2, "next", TypeSpec::structure(&node))
        .build_into(&node)
        .unwrap();
    node
}

fn chain(spec: &StructRef, len: usize) -> Record {
    let mut record = Record::new(spec);
    for _ in 1..len {
        record = Record::new(spec).with("next", record).unwrap();
    }
    record
}

#[test]
fn test_encode_refuses_records_too_deep_to_decode() {
    let spec = node_spec();
    let err = encode_json(&chain(&spec, 70)).unwrap_err();
    assert_eq!(err, EncodeError::DepthExceeded { max: 64 });

    let deepest = chain(&spec, 64);
    let bytes = encode_json(&deepest).unwrap();
    assert_eq!(decode_json(&bytes, &spec, &DecodeOptions::default()).unwrap(), deepest);
}

#[test]
fn test_max_depth_beyond_parser_default() {
    let spec = node_spec();
    let record = chain(&spec, 200);
    let options = DecodeOptions {
        max_depth: 1000,
        ..DecodeOptions::default()
    };

    let mut protocol = JsonProtocol::with_options(MemoryBuffer::new(), options);
    protocol.write_struct(&record).unwrap();
    let bytes = protocol.into_inner().into_inner();

    assert_eq!(decode_json(&bytes, &spec, &options).unwrap(), record);
    assert_eq!(
        decode_json(&bytes, &spec, &DecodeOptions::default()),
        Err(DecodeError::DepthExceeded { max: 64 })
    );
}

#[test]
fn test_deep_unknown_field_rejected_before_parse() {
    let spec = item_spec();
    let nested = format!("{}{}", "[".repeat(500), "]".repeat(500));
    let body = format!(r#"{{"metadata":{{"version":1}},"payload":{{"extra":{nested}}}}}"#);
    let err = decode_json(&frame(body.as_bytes()), &spec, &DecodeOptions::default()).unwrap_err();
    assert_eq!(err, DecodeError::DepthExceeded { max: 64 });

    let text = "[".repeat(500);
    let body = format!(r#"{{"metadata":{{"version":1}},"payload":{{"comment":"{text}"}}}}"#);
    let record = decode_json(&frame(body.as_bytes()), &spec, &DecodeOptions::default()).unwrap();
    assert_eq!(record.get("comment"), Some(&Value::String(text)));
}

#[test]
fn test_base64_with_trailing_bits() {
    let spec = item_spec();
    let record = json_to_struct(json!({"binary": "/x"}), &spec, &DecodeOptions::default()).unwrap();
    assert_eq!(record.get("binary"), Some(&Value::Binary(vec![0xff])));
    assert_eq!(struct_to_json(&record).unwrap(), json!({"binary": "/w=="}));
}
