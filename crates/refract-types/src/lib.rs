//! Shared types for refract type metadata.
//!
//! This crate defines the kinds, shapes and serialisable summaries exchanged
//! between the metadata engine (`refract-core`) and anything that wants to
//! store or display a derived field table.

use serde::{Deserialize, Serialize};

// ============================================================================
// Kinds and Shapes
// ============================================================================

/// The concrete kind of a reflected type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    Char,
    String,
    /// A nil-able indirection (`Option<T>`).
    Pointer,
    Slice,
    Array,
    Map,
    /// A dynamically typed value slot.
    Interface,
    Struct,
    Func,
}

impl Kind {
    /// Structural category of this kind.
    pub fn shape(self) -> Shape {
        match self {
            Kind::Pointer => Shape::Pointer,
            Kind::Slice => Shape::Slice,
            Kind::Array => Shape::Array,
            Kind::Map => Shape::Map,
            Kind::Interface => Shape::Interface,
            Kind::Struct => Shape::Struct,
            _ => Shape::Scalar,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Kind::I8 | Kind::I16 | Kind::I32 | Kind::I64 | Kind::Isize
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Kind::U8 | Kind::U16 | Kind::U32 | Kind::U64 | Kind::Usize
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, Kind::F32 | Kind::F64)
    }

    /// Lower-case name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::I8 => "i8",
            Kind::I16 => "i16",
            Kind::I32 => "i32",
            Kind::I64 => "i64",
            Kind::Isize => "isize",
            Kind::U8 => "u8",
            Kind::U16 => "u16",
            Kind::U32 => "u32",
            Kind::U64 => "u64",
            Kind::Usize => "usize",
            Kind::F32 => "f32",
            Kind::F64 => "f64",
            Kind::Char => "char",
            Kind::String => "string",
            Kind::Pointer => "pointer",
            Kind::Slice => "slice",
            Kind::Array => "array",
            Kind::Map => "map",
            Kind::Interface => "interface",
            Kind::Struct => "struct",
            Kind::Func => "func",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The structural category of a field's declared type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Scalar,
    Pointer,
    Slice,
    Array,
    Map,
    Interface,
    Struct,
}

/// Visibility of a field declaration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Crate,
    Restricted {
        path: String,
    },
    #[default]
    Private,
}

impl Visibility {
    /// Only fully public fields count as exported.
    pub fn is_public(&self) -> bool {
        matches!(self, Visibility::Public)
    }
}

// ============================================================================
// Summaries
// ============================================================================

/// Serialisable snapshot of a type's derived metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypeSummary {
    /// Short type name (empty for anonymous types)
    pub name: String,
    /// Module path the type was declared in (may be empty)
    pub origin: String,
    /// Full type name as reported by the host
    pub type_name: String,
    pub kind: Kind,
    /// For structs: fields in declaration order
    pub fields: Option<Vec<FieldSummary>>,
}

/// Serialisable snapshot of one field descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldSummary {
    pub name: String,
    /// Declared type as a string
    pub ty: String,
    pub kind: Kind,
    pub shape: Shape,
    pub index: Vec<usize>,
    pub visibility: Visibility,
    pub embedded: bool,
    /// Parsed tags in declaration order
    pub tags: Vec<TagSummary>,
}

/// Serialisable snapshot of one parsed tag entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagSummary {
    pub key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

// ============================================================================
// Path Helpers
// ============================================================================

/// Split a fully qualified item path into `(origin, name)`.
///
/// Returns empty strings for paths that do not name an item, such as closure
/// types or fn pointer signatures.
///
/// ```
/// use refract_types::split_item_path;
///
/// assert_eq!(split_item_path("app::models::User"), ("app::models", "User"));
/// assert_eq!(split_item_path("app::main::{{closure}}"), ("", ""));
/// ```
pub fn split_item_path(path: &str) -> (&str, &str) {
    let path = path.trim();
    if path.is_empty() || !is_item_path(path) {
        return ("", "");
    }

    // Generic arguments are not part of the item name.
    let base = match path.find('<') {
        Some(pos) => &path[..pos],
        None => path,
    };

    match base.rsplit_once("::") {
        Some((origin, name)) => (origin, name),
        None => ("", base),
    }
}

fn is_item_path(path: &str) -> bool {
    !path.contains("{{")
        && !path.starts_with("fn(")
        && !path.starts_with("fn (")
        && !path.starts_with('&')
        && !path.starts_with('*')
        && !path.starts_with('(')
        && !path.starts_with('[')
        && !path.starts_with("dyn ")
}
