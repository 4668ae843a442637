//! Data model types.
//!
//! This module contains the schema and instance types the codec operates on:
//! - Type tags (`TType`)
//! - Descriptors (`TypeSpec`, `FieldSpec`, `StructSpec`, `StructRef`)
//! - Values (`Value`, `MapValue`)
//! - Records (`Record`)
//! - Builders (descriptor construction)

pub mod builder;
pub mod record;
pub mod spec;
pub mod ttype;
pub mod value;

pub use builder::StructSpecBuilder;
pub use record::Record;
pub use spec::{FieldSpec, StructRef, StructSpec, TypeSpec};
pub use ttype::TType;
pub use value::{MapValue, Value};
