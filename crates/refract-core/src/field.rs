//! Field descriptors: one declared field plus its parsed tags.

use std::sync::Arc;

use refract_types::{FieldSummary, Kind, Shape, Visibility};

use crate::cache::MetadataCache;
use crate::error::Result;
use crate::metadata::Metadata;
use crate::reflect::{FieldDecl, TypeRef};
use crate::tag::{TagEntry, TagSyntaxError, parse_tags};

/// An immutable description of one struct field.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    ty: TypeRef,
    kind: Kind,
    shape: Shape,
    index: Vec<usize>,
    visibility: Visibility,
    embedded: bool,
    slice_of_ptr: bool,
    raw_tag: String,
    tags: Vec<TagEntry>,
}

impl Field {
    /// Build a descriptor from a field declaration, parsing its tag with the
    /// field name as fallback.
    pub fn new(decl: FieldDecl) -> std::result::Result<Self, TagSyntaxError> {
        let tags = parse_tags(&decl.name, &decl.tag)?;
        let kind = decl.ty.kind();
        let slice_of_ptr = matches!(kind, Kind::Slice | Kind::Array)
            && decl
                .ty
                .elem()
                .is_some_and(|elem| elem.kind() == Kind::Pointer);
        let index = if decl.index.is_empty() {
            vec![0]
        } else {
            decl.index
        };

        Ok(Self {
            name: decl.name,
            ty: decl.ty,
            kind,
            shape: kind.shape(),
            index,
            visibility: decl.visibility,
            embedded: decl.embedded,
            slice_of_ptr,
            raw_tag: decl.tag,
            tags,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type of the field.
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Position of the field; longer than one element for promoted fields.
    pub fn index(&self) -> &[usize] {
        &self.index
    }

    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    pub fn raw_tag(&self) -> &str {
        &self.raw_tag
    }

    /// Parsed tags in declaration order, one per key.
    pub fn tags(&self) -> &[TagEntry] {
        &self.tags
    }

    pub fn get_tag(&self, key: &str) -> Option<&TagEntry> {
        self.tags.iter().find(|tag| tag.key() == key)
    }

    /// The tag for `key`, or a zero entry carrying this field's name.
    pub fn tag(&self, key: &str) -> TagEntry {
        self.get_tag(key)
            .cloned()
            .unwrap_or_else(|| TagEntry::absent(self.name.as_str()))
    }

    /// Embedded and interface fields cannot be bound as plain named fields.
    pub fn is_valid(&self) -> bool {
        !self.embedded && self.shape != Shape::Interface
    }

    pub fn is_exported(&self) -> bool {
        self.visibility.is_public()
    }

    pub fn is_embedded(&self) -> bool {
        self.embedded
    }

    pub fn is_pointer(&self) -> bool {
        self.shape == Shape::Pointer
    }

    pub fn is_slice(&self) -> bool {
        self.shape == Shape::Slice
    }

    pub fn is_array(&self) -> bool {
        self.shape == Shape::Array
    }

    pub fn is_slice_or_array(&self) -> bool {
        self.is_slice() || self.is_array()
    }

    pub fn is_map(&self) -> bool {
        self.shape == Shape::Map
    }

    pub fn is_interface(&self) -> bool {
        self.shape == Shape::Interface
    }

    /// True for struct fields and pointers to structs.
    pub fn is_struct(&self) -> bool {
        self.indirect_type().kind() == Kind::Struct
    }

    /// True for slices and arrays whose element is a pointer.
    pub fn is_slice_of_ptr(&self) -> bool {
        self.slice_of_ptr
    }

    /// The pointee for pointer fields, otherwise the declared type.
    pub fn indirect_type(&self) -> TypeRef {
        self.ty.indirect()
    }

    /// Metadata of the declared type, resolved through the global cache.
    pub fn type_metadata(&self) -> Result<Arc<Metadata>> {
        MetadataCache::global().get(&self.ty)
    }

    pub fn summary(&self) -> FieldSummary {
        FieldSummary {
            name: self.name.clone(),
            ty: self.ty.type_name().to_string(),
            kind: self.kind,
            shape: self.shape,
            index: self.index.clone(),
            visibility: self.visibility.clone(),
            embedded: self.embedded,
            tags: self.tags.iter().map(TagEntry::summary).collect(),
        }
    }
}
