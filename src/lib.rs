//! # Refract - Runtime Field and Tag Introspection for Rust
//!
//! Refract derives a description of a struct's fields (name, declared type,
//! visibility, container shape) together with the key scoped tags attached to
//! each field, caches that description once per type, and binds it to live
//! values for generic reads, writes and nil initialisation. It is a building
//! block for serializers, validators and mappers that want type driven
//! behaviour without per-type code.
//!
//! ## Quick Start
//!
//! ```
//! use refract::{Reflect, StructValue, Value};
//! use std::collections::HashMap;
//!
//! #[derive(Default, Reflect)]
//! struct User {
//!     #[refract(tag = r#"json:"id,string" db:"user_id""#)]
//!     pub id: u64,
//!     #[refract(tag = r#"json:",omitempty""#)]
//!     pub name: String,
//!     pub labels: Option<HashMap<String, String>>,
//!     password: String,
//! }
//!
//! let meta = refract::metadata_of::<User>().unwrap();
//! assert_eq!(meta.num_field(), 4);
//!
//! let id = meta.field_by_name("id").unwrap();
//! assert_eq!(id.tag("db").name(), "user_id");
//! assert!(id.tag("json").contains("string"));
//! assert_eq!(meta.field_by_name("name").unwrap().tag("json").name(), "name");
//!
//! let mut user = User { id: 7, ..User::default() };
//! let mut sv = StructValue::new(&mut user).unwrap().unwrap();
//! assert_eq!(sv.field_by_name("id").unwrap().get().unwrap(), Value::Uint(7));
//! assert!(sv.field_by_name("password").unwrap().get().is_err());
//!
//! sv.field_by_name("labels").unwrap().new_if_nil();
//! assert!(user.labels.is_some());
//! ```
//!
//! ## Architecture
//!
//! - **[`refract_core`]**: tag parser, field descriptors, type metadata, the
//!   metadata cache and value accessors
//! - **[`refract_macros`]**: `#[derive(Reflect)]`
//! - **[`refract_types`]**: kinds, shapes and serialisable summaries
//!
//! ## Tag Syntax
//!
//! A tag is a sequence of `key:"value"` pairs separated by spaces. The value
//! is a quoted string with backslash escapes; it splits on commas into a name
//! and options. An empty name falls back to the field name. A repeated key
//! replaces the earlier entry in place.
//!
//! ## Configuration
//!
//! The global cache reads two environment variables on first use:
//!
//! - `REFRACT_CACHE_CAPACITY`: entries reserved up front (default 64)
//! - `REFRACT_CACHE_STRATEGY`: `derive-outside-lock` (default) or
//!   `single-flight`

// Re-export the engine
pub use refract_core::*;

// Re-export the derive
pub use refract_macros::Reflect;

// Re-export the shared data types as a module for summary consumers
pub use refract_types;
