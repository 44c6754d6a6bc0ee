//! Runtime field and tag introspection for Rust structs.
//!
//! The pieces, leaves first:
//!
//! - [`parse_tags`] turns a raw field tag such as `json:"id,omitempty"` into
//!   [`TagEntry`] values.
//! - [`Field`] describes one declared field together with its tags.
//! - [`Metadata`] is the derived field table of a type.
//! - [`MetadataCache`] derives metadata once per type and shares it.
//! - [`StructValue`] and [`FieldValue`] bind metadata to a live instance for
//!   reading, writing and nil initialisation.
//!
//! Types take part by implementing [`Reflect`], usually through
//! `#[derive(Reflect)]` from the `refract` facade crate.

pub mod cache;
pub mod error;
pub mod field;
pub mod field_value;
mod impls;
pub mod metadata;
pub mod reflect;
pub mod struct_value;
pub mod tag;

use std::sync::Arc;

pub use cache::{CacheConfig, LookupStats, MetadataCache, MissStrategy};
pub use error::{Error, Result};
pub use field::Field;
pub use field_value::FieldValue;
pub use impls::DynValue;
pub use metadata::Metadata;
pub use reflect::{FieldDecl, Reflect, TypeDescriptor, TypeInfo, TypeKey, TypeRef, Value};
pub use struct_value::StructValue;
pub use tag::{TagEntry, TagSyntaxError, TagSyntaxReason, parse_tags};

pub use refract_types::{
    FieldSummary, Kind, Shape, TagSummary, TypeSummary, Visibility, split_item_path,
};

/// Metadata for `T` from the global cache.
pub fn metadata_of<T: Reflect>() -> Result<Arc<Metadata>> {
    MetadataCache::global().get_of::<T>()
}

/// Metadata for the type of `value` from the global cache.
pub fn metadata_for(value: &dyn Reflect) -> Result<Arc<Metadata>> {
    MetadataCache::global().get(&value.type_ref())
}

/// Metadata for an arbitrary type description from the global cache.
pub fn type_metadata(ty: &TypeRef) -> Result<Arc<Metadata>> {
    MetadataCache::global().get(ty)
}
