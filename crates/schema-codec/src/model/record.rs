//! Generic record instances.

use crate::error::FieldError;
use crate::model::{StructRef, StructSpec, Value};

/// A record conforming to a struct descriptor.
///
/// Each field slot is `None` while unset and `Some` once it holds a value,
/// so encoders can tell "not sent" apart from "sent the zero value".
/// Two records are equal when they share a descriptor and every slot
/// compares equal.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    spec: StructRef,
    slots: Vec<Option<Value>>,
}

impl Record {
    /// Creates a record with every field at its declared default.
    ///
    /// A descriptor that was declared but never defined yields a record
    /// without fields.
    pub fn new(spec: &StructRef) -> Self {
        let slots = spec
            .get()
            .map(|s| s.defaults().iter().map(|(_, v)| v.clone()).collect())
            .unwrap_or_default();
        Self {
            spec: spec.clone(),
            slots,
        }
    }

    /// Returns the handle of this record's descriptor.
    pub fn spec_ref(&self) -> &StructRef {
        &self.spec
    }

    /// Returns this record's descriptor, if defined.
    pub fn spec(&self) -> Option<&StructSpec> {
        self.spec.get()
    }

    /// Returns the descriptor name.
    pub fn type_name(&self) -> &str {
        self.spec.name()
    }

    /// Returns the current value of a field, or `None` if unset or unknown.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let slot = self.spec()?.slot_of(name)?;
        self.slots.get(slot)?.as_ref()
    }

    /// Returns the current value of a field by id.
    pub fn get_by_id(&self, id: i16) -> Option<&Value> {
        let slot = self.spec()?.slot_of_id(id)?;
        self.slots.get(slot)?.as_ref()
    }

    /// Returns true if the field currently holds a value.
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Sets a field, returning its previous value.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<Option<Value>, FieldError> {
        let slot = self.slot(name)?;
        Ok(self.slots[slot].replace(value.into()))
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self, FieldError> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Clears a field back to unset, returning its previous value.
    pub fn unset(&mut self, name: &str) -> Result<Option<Value>, FieldError> {
        let slot = self.slot(name)?;
        Ok(self.slots[slot].take())
    }

    /// Iterates `(field name, value)` over the fields that are set, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        let names = self.spec().map(|s| s.defaults()).unwrap_or_default();
        names
            .iter()
            .zip(&self.slots)
            .filter_map(|((name, _), slot)| slot.as_ref().map(|v| (name.as_ref(), v)))
    }

    pub(crate) fn set_slot(&mut self, slot: usize, value: Value) {
        if let Some(cell) = self.slots.get_mut(slot) {
            *cell = Some(value);
        }
    }

    pub(crate) fn slot_value(&self, slot: usize) -> Option<&Value> {
        self.slots.get(slot)?.as_ref()
    }

    fn slot(&self, name: &str) -> Result<usize, FieldError> {
        self.spec()
            .and_then(|s| s.slot_of(name))
            .ok_or_else(|| FieldError::UnknownField {
                struct_name: self.type_name().to_string(),
                field: name.to_string(),
            })
    }
}
