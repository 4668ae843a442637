//! Builder API for struct descriptors.
//!
//! # Example
//!
//! ```rust
//! use schema_codec::{StructSpec, TypeSpec, Value};
//!
//! let item = StructSpec::builder("Item")
//!     .optional(1, "id", TypeSpec::I32)
//!     .optional(2, "phones", TypeSpec::list(TypeSpec::String))
//!     .optional(3, "binary", TypeSpec::Binary)
//!     .default_value("id", Value::I32(0))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(item.name(), "Item");
//! ```

use crate::error::SpecError;
use crate::model::{FieldSpec, StructRef, StructSpec, TypeSpec, Value};
use crate::validate::check_value;

/// Builder for a [`StructSpec`].
///
/// Every field starts with an unset default; [`default_value`](Self::default_value)
/// overrides it. Validation happens in [`finish`](Self::finish).
#[derive(Debug, Clone)]
pub struct StructSpecBuilder {
    name: Box<str>,
    fields: Vec<FieldSpec>,
    defaults: Vec<(Box<str>, Value)>,
}

impl StructSpecBuilder {
    /// Creates a builder for a descriptor named `name`.
    pub fn new(name: impl Into<Box<str>>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            defaults: Vec::new(),
        }
    }

    /// Adds a field.
    pub fn field(mut self, id: i16, name: impl Into<Box<str>>, ty: TypeSpec, required: bool) -> Self {
        self.fields.push(FieldSpec {
            id,
            name: name.into(),
            ty,
            required,
        });
        self
    }

    /// Adds an optional field.
    pub fn optional(self, id: i16, name: impl Into<Box<str>>, ty: TypeSpec) -> Self {
        self.field(id, name, ty, false)
    }

    /// Adds a required field.
    pub fn required(self, id: i16, name: impl Into<Box<str>>, ty: TypeSpec) -> Self {
        self.field(id, name, ty, true)
    }

    /// Sets the value a fresh record starts with for `name`.
    pub fn default_value(mut self, name: impl Into<Box<str>>, value: impl Into<Value>) -> Self {
        self.defaults.push((name.into(), value.into()));
        self
    }

    /// Validates the fields and produces the descriptor.
    pub fn finish(self) -> Result<StructSpec, SpecError> {
        let struct_name = self.name.to_string();
        let mut fields = self.fields;
        fields.sort_by_key(|f| f.id);

        for (i, field) in fields.iter().enumerate() {
            if field.id <= 0 {
                return Err(SpecError::InvalidFieldId {
                    struct_name,
                    id: field.id,
                });
            }
            if i > 0 && fields[i - 1].id == field.id {
                return Err(SpecError::DuplicateFieldId {
                    struct_name,
                    id: field.id,
                });
            }
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SpecError::DuplicateFieldName {
                    struct_name,
                    name: field.name.to_string(),
                });
            }
        }

        let mut defaults: Vec<(Box<str>, Option<Value>)> =
            fields.iter().map(|f| (f.name.clone(), None)).collect();
        for (name, value) in self.defaults {
            let Some(slot) = fields.iter().position(|f| f.name == name) else {
                return Err(SpecError::UnknownDefault {
                    struct_name,
                    name: name.to_string(),
                });
            };
            let field = &fields[slot];
            if check_value(&value, &field.ty, &field.name).is_err() {
                return Err(SpecError::DefaultTypeMismatch {
                    struct_name,
                    field: name.to_string(),
                    expected: field.ty.ttype(),
                });
            }
            defaults[slot].1 = Some(value);
        }

        Ok(StructSpec::from_parts(self.name, fields, defaults))
    }

    /// Validates and wraps the descriptor in a new [`StructRef`].
    pub fn build(self) -> Result<StructRef, SpecError> {
        self.finish().map(StructRef::from)
    }

    /// Validates and defines a previously declared [`StructRef`].
    pub fn build_into(self, target: &StructRef) -> Result<(), SpecError> {
        target.define(self.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_field_order() {
        let spec = StructSpec::builder("Item")
            .optional(2, "phones", TypeSpec::list(TypeSpec::String))
            .optional(1, "id", TypeSpec::I32)
            .default_value("id", 7)
            .finish()
            .unwrap();

        let names: Vec<&str> = spec.defaults().iter().map(|(n, _)| n.as_ref()).collect();
        assert_eq!(names, ["id", "phones"]);
        assert_eq!(spec.defaults()[0].1, Some(Value::I32(7)));
        assert_eq!(spec.defaults()[1].1, None);
    }

    #[test]
    fn test_rejects_non_positive_id() {
        let err = StructSpec::builder("Item")
            .optional(0, "id", TypeSpec::I32)
            .finish()
            .unwrap_err();
        assert!(matches!(err, SpecError::InvalidFieldId { id: 0, .. }));
    }

    #[test]
    fn test_rejects_duplicate_id() {
        let err = StructSpec::builder("Item")
            .optional(1, "id", TypeSpec::I32)
            .optional(1, "other", TypeSpec::I32)
            .finish()
            .unwrap_err();
        assert!(matches!(err, SpecError::DuplicateFieldId { id: 1, .. }));
    }

    #[test]
    fn test_rejects_duplicate_name() {
        let err = StructSpec::builder("Item")
            .optional(1, "id", TypeSpec::I32)
            .optional(2, "id", TypeSpec::I64)
            .finish()
            .unwrap_err();
        assert!(matches!(err, SpecError::DuplicateFieldName { .. }));
    }

    #[test]
    fn test_rejects_unknown_default() {
        let err = StructSpec::builder("Item")
            .optional(1, "id", TypeSpec::I32)
            .default_value("missing", 1)
            .finish()
            .unwrap_err();
        assert!(matches!(err, SpecError::UnknownDefault { .. }));
    }

    #[test]
    fn test_rejects_mistyped_default() {
        let err = StructSpec::builder("Item")
            .optional(1, "id", TypeSpec::I32)
            .default_value("id", "thirteen")
            .finish()
            .unwrap_err();
        assert_eq!(
            err,
            SpecError::DefaultTypeMismatch {
                struct_name: "Item".to_string(),
                field: "id".to_string(),
                expected: crate::model::TType::I32,
            }
        );
    }
}
