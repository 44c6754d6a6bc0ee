//! Type metadata: the derived field table of one type.

use std::any::type_name;

use log::debug;
use refract_types::{Kind, TypeSummary, split_item_path};

use crate::error::{Error, Result};
use crate::field::Field;
use crate::reflect::{Reflect, TypeDescriptor, TypeRef};

/// Derived description of a type.
///
/// Pointer types are normalised to their pointee, so a `Metadata` always
/// describes the underlying type. Non-struct types carry no fields and every
/// lookup on them misses.
#[derive(Debug, Clone)]
pub struct Metadata {
    ty: TypeRef,
    kind: Kind,
    name: String,
    origin: String,
    fields: Option<Vec<Field>>,
}

impl Metadata {
    /// Derive metadata for `ty`, removing one level of pointer indirection.
    ///
    /// Fails on the first field whose tag does not parse; no partial
    /// metadata is produced.
    pub fn new(ty: &TypeRef) -> Result<Self> {
        let ty = ty.indirect();
        let kind = ty.kind();

        let fields = if kind == Kind::Struct {
            let decls = ty.fields();
            let mut fields = Vec::with_capacity(decls.len());
            for decl in decls {
                let name = decl.name.clone();
                let field = Field::new(decl).map_err(|source| {
                    debug!("tag of {}.{} rejected: {}", ty.type_name(), name, source);
                    Error::TagSyntax {
                        field: name,
                        source,
                    }
                })?;
                fields.push(field);
            }
            Some(fields)
        } else {
            None
        };

        debug!(
            "derived metadata for {} ({}, {} fields)",
            ty.type_name(),
            kind,
            fields.as_ref().map_or(0, Vec::len)
        );

        Ok(Self {
            name: ty.name().to_owned(),
            origin: ty.origin().to_owned(),
            kind,
            ty,
            fields,
        })
    }

    pub fn of<T: Reflect>() -> Result<Self> {
        Self::new(&T::type_of())
    }

    pub fn for_value(value: &dyn Reflect) -> Result<Self> {
        Self::new(&value.type_ref())
    }

    /// Metadata for a function-shaped value.
    ///
    /// Name and origin come from the fn item path and are empty for closures
    /// and fn pointers. Never has fields.
    pub fn for_fn<F: 'static>(_f: &F) -> Self {
        let (origin, name) = split_item_path(type_name::<F>());
        let ty = TypeDescriptor::new::<F>(Kind::Func)
            .named(name, origin)
            .into_ref();
        Self {
            name: name.to_owned(),
            origin: origin.to_owned(),
            kind: Kind::Func,
            ty,
            fields: None,
        }
    }

    /// The underlying (non-pointer) type.
    pub fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn is_struct(&self) -> bool {
        self.kind == Kind::Struct
    }

    /// Short type name, empty for anonymous types.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Module path the type was declared in.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn type_name(&self) -> &str {
        self.ty.type_name()
    }

    /// Fields in declaration order. Empty for non-struct types.
    pub fn fields(&self) -> &[Field] {
        self.fields.as_deref().unwrap_or_default()
    }

    pub fn num_field(&self) -> usize {
        self.fields().len()
    }

    /// First field declared with `name`.
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields().iter().find(|field| field.name() == name)
    }

    pub fn field_by_index(&self, index: usize) -> Option<&Field> {
        self.fields().get(index)
    }

    pub fn summary(&self) -> TypeSummary {
        TypeSummary {
            name: self.name.clone(),
            origin: self.origin.clone(),
            type_name: self.type_name().to_string(),
            kind: self.kind,
            fields: self
                .fields
                .as_ref()
                .map(|fields| fields.iter().map(Field::summary).collect()),
        }
    }
}
