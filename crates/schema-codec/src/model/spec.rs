//! Declarative type descriptors.
//!
//! A record type is described at runtime by a [`StructSpec`]: its fields
//! (id, name, [`TypeSpec`], required flag) and the ordered defaults used to
//! initialize a fresh [`Record`](crate::model::Record). Struct references go
//! through [`StructRef`], which can be declared before it is defined so that a
//! descriptor may refer to itself or to a descriptor defined later.

use std::fmt;
use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashMap;

use crate::error::SpecError;
use crate::model::builder::StructSpecBuilder;
use crate::model::{TType, Value};

/// Type of a field or container element.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpec {
    Void,
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    String,
    Binary,
    Struct(StructRef),
    List(Box<TypeSpec>),
    Set(Box<TypeSpec>),
    Map(Box<TypeSpec>, Box<TypeSpec>),
}

impl TypeSpec {
    /// List of `element`.
    pub fn list(element: TypeSpec) -> Self {
        TypeSpec::List(Box::new(element))
    }

    /// Set of `element`.
    pub fn set(element: TypeSpec) -> Self {
        TypeSpec::Set(Box::new(element))
    }

    /// Map from `key` to `value`.
    pub fn map(key: TypeSpec, value: TypeSpec) -> Self {
        TypeSpec::Map(Box::new(key), Box::new(value))
    }

    /// Nested struct.
    pub fn structure(spec: &StructRef) -> Self {
        TypeSpec::Struct(spec.clone())
    }

    /// Returns the type tag of this spec.
    pub fn ttype(&self) -> TType {
        match self {
            TypeSpec::Void => TType::Void,
            TypeSpec::Bool => TType::Bool,
            TypeSpec::Byte => TType::Byte,
            TypeSpec::I16 => TType::I16,
            TypeSpec::I32 => TType::I32,
            TypeSpec::I64 => TType::I64,
            TypeSpec::Double => TType::Double,
            TypeSpec::String => TType::String,
            TypeSpec::Binary => TType::Binary,
            TypeSpec::Struct(_) => TType::Struct,
            TypeSpec::List(_) => TType::List,
            TypeSpec::Set(_) => TType::Set,
            TypeSpec::Map(_, _) => TType::Map,
        }
    }
}

/// One field of a struct descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Positive field identifier, unique within the struct.
    pub id: i16,
    /// Field name, unique within the struct.
    pub name: Box<str>,
    /// Declared type, including element specs for containers.
    pub ty: TypeSpec,
    /// Whether the field must be present in a valid record.
    pub required: bool,
}

/// Runtime descriptor of a record type.
///
/// Built with [`StructSpec::builder`]. Fields are kept in ascending id order
/// and the defaults list runs parallel to them.
#[derive(Debug, Clone)]
pub struct StructSpec {
    name: Box<str>,
    fields: Vec<FieldSpec>,
    defaults: Vec<(Box<str>, Option<Value>)>,
    by_id: FxHashMap<i16, usize>,
    by_name: FxHashMap<Box<str>, usize>,
}

impl StructSpec {
    /// Starts a builder for a descriptor named `name`.
    pub fn builder(name: impl Into<Box<str>>) -> StructSpecBuilder {
        StructSpecBuilder::new(name)
    }

    pub(crate) fn from_parts(
        name: Box<str>,
        fields: Vec<FieldSpec>,
        defaults: Vec<(Box<str>, Option<Value>)>,
    ) -> Self {
        let by_id = fields.iter().enumerate().map(|(i, f)| (f.id, i)).collect();
        let by_name = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
        Self {
            name,
            fields,
            defaults,
            by_id,
            by_name,
        }
    }

    /// Returns the descriptor name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the fields in ascending id order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Returns the `(field name, default)` pairs; `None` means unset.
    pub fn defaults(&self) -> &[(Box<str>, Option<Value>)] {
        &self.defaults
    }

    /// Looks up a field by id.
    pub fn field_by_id(&self, id: i16) -> Option<&FieldSpec> {
        self.by_id.get(&id).map(|&i| &self.fields[i])
    }

    /// Looks up a field by name.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldSpec> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// Returns the slot index of a field name.
    pub(crate) fn slot_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Returns the slot index of a field id.
    pub(crate) fn slot_of_id(&self, id: i16) -> Option<usize> {
        self.by_id.get(&id).copied()
    }
}

struct StructSlot {
    name: Box<str>,
    spec: OnceLock<StructSpec>,
}

/// Shared handle to a struct descriptor.
///
/// A handle is either created from a finished [`StructSpec`] or declared by
/// name first and defined once later, which is how self-referential and
/// mutually recursive descriptors are expressed. Handles compare by identity.
/// A recursive descriptor holds a reference to itself and is never freed,
/// which suits descriptors living for the whole program.
#[derive(Clone)]
pub struct StructRef {
    inner: Arc<StructSlot>,
}

impl StructRef {
    /// Declares a descriptor that will be defined later.
    pub fn declare(name: impl Into<Box<str>>) -> Self {
        Self {
            inner: Arc::new(StructSlot {
                name: name.into(),
                spec: OnceLock::new(),
            }),
        }
    }

    /// Defines a previously declared descriptor.
    pub fn define(&self, spec: StructSpec) -> Result<(), SpecError> {
        if spec.name() != self.name() {
            return Err(SpecError::NameMismatch {
                declared: self.name().to_string(),
                defined: spec.name().to_string(),
            });
        }
        self.inner
            .spec
            .set(spec)
            .map_err(|_| SpecError::AlreadyDefined {
                name: self.name().to_string(),
            })
    }

    /// Returns the descriptor name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the descriptor, or `None` if it was declared but not defined.
    pub fn get(&self) -> Option<&StructSpec> {
        self.inner.spec.get()
    }

    /// Returns true if both handles refer to the same descriptor.
    pub fn ptr_eq(&self, other: &StructRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<StructSpec> for StructRef {
    fn from(spec: StructSpec) -> Self {
        let handle = StructRef::declare(spec.name.clone());
        // A fresh cell cannot already be set.
        let _ = handle.inner.spec.set(spec);
        handle
    }
}

impl PartialEq for StructRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

// Prints the name only; a recursive descriptor would otherwise recurse forever.
impl fmt::Debug for StructRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StructRef").field(&self.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_spec_ttype() {
        assert_eq!(TypeSpec::list(TypeSpec::I32).ttype(), TType::List);
        assert_eq!(
            TypeSpec::map(TypeSpec::String, TypeSpec::Double).ttype(),
            TType::Map
        );
        assert_eq!(TypeSpec::Binary.ttype(), TType::Binary);
    }

    #[test]
    fn test_declare_then_define() {
        let node = StructRef::declare("Node");
        assert!(node.get().is_none());

        let spec = StructSpec::builder("Node")
            .optional(1, "value", TypeSpec::I32)
            .optional(2, "next", TypeSpec::structure(&node))
            .finish()
            .unwrap();
        node.define(spec).unwrap();

        let defined = node.get().unwrap();
        let next = defined.field_by_name("next").unwrap();
        match &next.ty {
            TypeSpec::Struct(inner) => assert!(inner.ptr_eq(&node)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(format!("{:?}", next.ty), "Struct(StructRef(\"Node\"))");
    }

    #[test]
    fn test_define_twice_rejected() {
        let node = StructRef::declare("Node");
        let spec = StructSpec::builder("Node").finish().unwrap();
        node.define(spec.clone()).unwrap();
        assert_eq!(
            node.define(spec),
            Err(SpecError::AlreadyDefined {
                name: "Node".to_string()
            })
        );
    }

    #[test]
    fn test_define_name_mismatch() {
        let node = StructRef::declare("Node");
        let spec = StructSpec::builder("Other").finish().unwrap();
        assert!(matches!(
            node.define(spec),
            Err(SpecError::NameMismatch { .. })
        ));
    }

    #[test]
    fn test_lookup_by_id_and_name() {
        let item = StructSpec::builder("Item")
            .optional(3, "binary", TypeSpec::Binary)
            .optional(1, "id", TypeSpec::I32)
            .finish()
            .unwrap();
        assert_eq!(item.fields()[0].name.as_ref(), "id");
        assert_eq!(item.field_by_id(3).unwrap().name.as_ref(), "binary");
        assert_eq!(item.field_by_name("id").unwrap().id, 1);
        assert!(item.field_by_id(2).is_none());
        assert_eq!(item.defaults()[1].0.as_ref(), "binary");
    }
}
