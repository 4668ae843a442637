//! Semantic validation of records.
//!
//! Encoding and decoding only check what they need to produce or consume a
//! wire tree. Validation checks a whole record against its descriptor:
//! - Required fields are set, at every nesting level
//! - Every present value conforms to its declared type
//!
//! String and binary fields accept either `Value::String` or `Value::Binary`,
//! since the decode policy decides which one a decoded field holds. Bytes in
//! a string field must still be UTF-8, or the record could not be encoded.

use crate::error::ValidationError;
use crate::model::{Record, TypeSpec, Value};

/// Validates a record against its descriptor.
pub fn validate_record(record: &Record) -> Result<(), ValidationError> {
    walk_record(record, record.type_name(), true)
}

/// Checks that `value` conforms to `ty` without checking required fields.
pub fn check_value(value: &Value, ty: &TypeSpec, path: &str) -> Result<(), ValidationError> {
    walk_value(value, ty, path, false)
}

fn walk_record(record: &Record, path: &str, require: bool) -> Result<(), ValidationError> {
    let spec = record.spec().ok_or_else(|| ValidationError::UndefinedStruct {
        name: record.type_name().to_string(),
    })?;

    for field in spec.fields() {
        match record.get_by_id(field.id) {
            Some(value) => {
                let field_path = format!("{path}.{}", field.name);
                walk_value(value, &field.ty, &field_path, require)?;
            }
            None if require && field.required => {
                return Err(ValidationError::MissingRequired {
                    struct_name: spec.name().to_string(),
                    field: field.name.to_string(),
                });
            }
            None => {}
        }
    }
    Ok(())
}

fn walk_value(value: &Value, ty: &TypeSpec, path: &str, require: bool) -> Result<(), ValidationError> {
    let mismatch = || ValidationError::TypeMismatch {
        path: path.to_string(),
        expected: ty.ttype(),
        found: value.kind(),
    };

    match (ty, value) {
        (TypeSpec::Bool, Value::Bool(_))
        | (TypeSpec::Byte, Value::Byte(_))
        | (TypeSpec::I16, Value::I16(_))
        | (TypeSpec::I32, Value::I32(_))
        | (TypeSpec::I64, Value::I64(_))
        | (TypeSpec::Double, Value::Double(_))
        | (TypeSpec::String, Value::String(_))
        | (TypeSpec::Binary, Value::String(_) | Value::Binary(_)) => Ok(()),
        (TypeSpec::String, Value::Binary(bytes)) => match std::str::from_utf8(bytes) {
            Ok(_) => Ok(()),
            Err(_) => Err(ValidationError::InvalidUtf8 {
                path: path.to_string(),
            }),
        },
        (TypeSpec::Struct(expected), Value::Struct(record)) => {
            if !record.spec_ref().ptr_eq(expected) {
                return Err(mismatch());
            }
            walk_record(record, path, require)
        }
        (TypeSpec::List(elem), Value::List(items)) | (TypeSpec::Set(elem), Value::Set(items)) => {
            for (i, item) in items.iter().enumerate() {
                walk_value(item, elem, &format!("{path}[{i}]"), require)?;
            }
            Ok(())
        }
        (TypeSpec::Map(key_ty, value_ty), Value::Map(map)) => {
            for (i, (k, v)) in map.iter().enumerate() {
                walk_value(k, key_ty, &format!("{path}[{i}].key"), require)?;
                walk_value(v, value_ty, &format!("{path}[{i}].value"), require)?;
            }
            Ok(())
        }
        _ => Err(mismatch()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MapValue, StructRef, StructSpec, TType};

    fn person() -> StructRef {
        StructSpec::builder("Person")
            .required(1, "name", TypeSpec::String)
            .optional(2, "tags", TypeSpec::set(TypeSpec::String))
            .optional(3, "scores", TypeSpec::map(TypeSpec::String, TypeSpec::Double))
            .build()
            .unwrap()
    }

    #[test]
    fn test_valid_record() {
        let spec = person();
        let scores: MapValue = [("math", 0.9)].into_iter().collect();
        let record = Record::new(&spec)
            .with("name", "Ana")
            .unwrap()
            .with("tags", Value::Set(vec!["a".into(), "a".into()]))
            .unwrap()
            .with("scores", scores)
            .unwrap();
        assert_eq!(validate_record(&record), Ok(()));
    }

    #[test]
    fn test_missing_required() {
        let spec = person();
        let record = Record::new(&spec);
        assert_eq!(
            validate_record(&record),
            Err(ValidationError::MissingRequired {
                struct_name: "Person".to_string(),
                field: "name".to_string(),
            })
        );
    }

    #[test]
    fn test_nested_missing_required() {
        let person = person();
        let team = StructSpec::builder("Team")
            .optional(1, "members", TypeSpec::list(TypeSpec::structure(&person)))
            .build()
            .unwrap();
        let record = Record::new(&team)
            .with("members", Value::List(vec![Record::new(&person).into()]))
            .unwrap();
        assert!(matches!(
            validate_record(&record),
            Err(ValidationError::MissingRequired { .. })
        ));
    }

    #[test]
    fn test_type_mismatch_reports_path() {
        let spec = person();
        let record = Record::new(&spec)
            .with("name", "Ana")
            .unwrap()
            .with("tags", Value::Set(vec![Value::I32(1)]))
            .unwrap();
        assert_eq!(
            validate_record(&record),
            Err(ValidationError::TypeMismatch {
                path: "Person.tags[0]".to_string(),
                expected: TType::String,
                found: "i32",
            })
        );
    }

    #[test]
    fn test_bytes_accepted_for_string_field() {
        assert_eq!(
            check_value(&Value::Binary(b"hi".to_vec()), &TypeSpec::String, "x"),
            Ok(())
        );
        assert_eq!(
            check_value(&Value::String("hi".to_string()), &TypeSpec::Binary, "x"),
            Ok(())
        );
        assert!(check_value(&Value::List(vec![]), &TypeSpec::Set(Box::new(TypeSpec::I32)), "x").is_err());
    }

    #[test]
    fn test_invalid_utf8_in_string_field() {
        let spec = person();
        let record = Record::new(&spec).with("name", vec![0xffu8, 0xfe]).unwrap();
        assert_eq!(
            validate_record(&record),
            Err(ValidationError::InvalidUtf8 {
                path: "Person.name".to_string()
            })
        );
        assert_eq!(check_value(&Value::Binary(vec![0xff]), &TypeSpec::Binary, "x"), Ok(()));
    }

    #[test]
    fn test_map_paths_match_codec_notation() {
        let spec = person();
        let scores: MapValue = [("math", Value::Double(0.9)), ("art", Value::from("high"))]
            .into_iter()
            .collect();
        let record = Record::new(&spec)
            .with("name", "Ana")
            .unwrap()
            .with("scores", scores)
            .unwrap();
        assert_eq!(
            validate_record(&record),
            Err(ValidationError::TypeMismatch {
                path: "Person.scores[1].value".to_string(),
                expected: TType::Double,
                found: "string",
            })
        );

        let keyed: MapValue = [(Value::I32(1), Value::Double(0.5))].into_iter().collect();
        let err = check_value(
            &Value::Map(keyed),
            &TypeSpec::map(TypeSpec::String, TypeSpec::Double),
            "m",
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { ref path, .. } if path == "m[0].key"));
    }
}
