//! The reflection capability consumed by the metadata engine.
//!
//! Rust has no runtime reflection, so type information is supplied by the
//! host through two traits:
//!
//! - [`TypeInfo`] describes a type: its kind, identity, element types and
//!   declared fields. [`TypeRef`] is a cheap shared handle to one.
//! - [`Reflect`] is implemented by values and gives typed access to their
//!   fields. `#[derive(Reflect)]` implements it for structs; the std impls
//!   live in `impls.rs`.
//!
//! Anything implementing [`TypeInfo`] can be fed to the metadata engine, which
//! makes it easy to test against synthetic types.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use refract_types::{Kind, Visibility};

// ============================================================================
// Type Identity
// ============================================================================

/// Identity of a type, used as the metadata cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKey {
    /// A real Rust type.
    Native(TypeId),
    /// A type that only exists as a description (fakes, foreign schemas).
    Synthetic(&'static str),
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeKey::Native(TypeId::of::<T>())
    }
}

// ============================================================================
// Type Capability
// ============================================================================

/// Describes one type to the metadata engine.
pub trait TypeInfo: Send + Sync + 'static {
    fn key(&self) -> TypeKey;

    fn kind(&self) -> Kind;

    /// Short type name, empty for anonymous types.
    fn name(&self) -> &str;

    /// Module path the type was declared in, may be empty.
    fn origin(&self) -> &str;

    /// Full type name for display.
    fn type_name(&self) -> &str;

    /// Pointee, slice/array element or map value type.
    fn elem(&self) -> Option<TypeRef> {
        None
    }

    /// Map key type.
    fn key_type(&self) -> Option<TypeRef> {
        None
    }

    /// Array length.
    fn len(&self) -> Option<usize> {
        None
    }

    /// Declared fields in declaration order. Empty for non-struct types.
    fn fields(&self) -> Vec<FieldDecl> {
        Vec::new()
    }
}

/// Shared handle to a [`TypeInfo`], compared and hashed by [`TypeKey`].
#[derive(Clone)]
pub struct TypeRef(Arc<dyn TypeInfo>);

impl TypeRef {
    pub fn new(info: impl TypeInfo) -> Self {
        Self(Arc::new(info))
    }

    pub fn of<T: Reflect>() -> Self {
        T::type_of()
    }

    pub fn info(&self) -> &dyn TypeInfo {
        &*self.0
    }

    pub fn key(&self) -> TypeKey {
        self.0.key()
    }

    pub fn kind(&self) -> Kind {
        self.0.kind()
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn origin(&self) -> &str {
        self.0.origin()
    }

    pub fn type_name(&self) -> &str {
        self.0.type_name()
    }

    pub fn elem(&self) -> Option<TypeRef> {
        self.0.elem()
    }

    pub fn key_type(&self) -> Option<TypeRef> {
        self.0.key_type()
    }

    pub fn len(&self) -> Option<usize> {
        self.0.len()
    }

    pub fn fields(&self) -> Vec<FieldDecl> {
        self.0.fields()
    }

    pub fn is_pointer(&self) -> bool {
        self.kind() == Kind::Pointer
    }

    /// The pointee for pointer types, otherwise the type itself.
    pub fn indirect(&self) -> TypeRef {
        if self.is_pointer() {
            if let Some(elem) = self.elem() {
                return elem;
            }
        }
        self.clone()
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRef")
            .field("type_name", &self.type_name())
            .field("kind", &self.kind())
            .finish()
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

// ============================================================================
// Field Declarations
// ============================================================================

/// One field declaration as reported by the host.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeRef,
    /// Raw tag string, empty when the field carries no tag.
    pub tag: String,
    pub visibility: Visibility,
    pub embedded: bool,
    /// Position of the field, one element per level of embedding.
    pub index: Vec<usize>,
}

impl FieldDecl {
    /// A private, untagged field at position `index`.
    pub fn new(name: impl Into<String>, ty: TypeRef, index: usize) -> Self {
        Self {
            name: name.into(),
            ty,
            tag: String::new(),
            visibility: Visibility::Private,
            embedded: false,
            index: vec![index],
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn public(self) -> Self {
        self.with_visibility(Visibility::Public)
    }

    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    /// Replace the index with a multi level path for promoted fields.
    pub fn with_index_path(mut self, path: Vec<usize>) -> Self {
        if !path.is_empty() {
            self.index = path;
        }
        self
    }

    pub fn is_exported(&self) -> bool {
        self.visibility.is_public()
    }
}

// ============================================================================
// Stock Type Descriptor
// ============================================================================

/// Plain [`TypeInfo`] implementation used by the built-in impls, the derive
/// macro and test fakes.
///
/// Related types are stored as constructors so that recursive types do not
/// recurse until asked.
#[derive(Clone)]
pub struct TypeDescriptor {
    key: TypeKey,
    kind: Kind,
    name: String,
    origin: String,
    type_name: String,
    elem: Option<fn() -> TypeRef>,
    key_type: Option<fn() -> TypeRef>,
    len: Option<usize>,
    fields: Option<fn() -> Vec<FieldDecl>>,
}

impl TypeDescriptor {
    /// Describe the Rust type `T`. The type is anonymous until
    /// [`named`](Self::named) is called.
    pub fn new<T: ?Sized + 'static>(kind: Kind) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            kind,
            name: String::new(),
            origin: String::new(),
            type_name: std::any::type_name::<T>().to_owned(),
            elem: None,
            key_type: None,
            len: None,
            fields: None,
        }
    }

    /// Describe a type that has no Rust counterpart.
    pub fn synthetic(key: &'static str, kind: Kind) -> Self {
        Self {
            key: TypeKey::Synthetic(key),
            kind,
            name: String::new(),
            origin: String::new(),
            type_name: key.to_owned(),
            elem: None,
            key_type: None,
            len: None,
            fields: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>, origin: impl Into<String>) -> Self {
        self.name = name.into();
        self.origin = origin.into();
        self
    }

    pub fn with_elem(mut self, elem: fn() -> TypeRef) -> Self {
        self.elem = Some(elem);
        self
    }

    pub fn with_key_type(mut self, key_type: fn() -> TypeRef) -> Self {
        self.key_type = Some(key_type);
        self
    }

    pub fn with_len(mut self, len: usize) -> Self {
        self.len = Some(len);
        self
    }

    pub fn with_fields(mut self, fields: fn() -> Vec<FieldDecl>) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn into_ref(self) -> TypeRef {
        TypeRef::new(self)
    }
}

impl TypeInfo for TypeDescriptor {
    fn key(&self) -> TypeKey {
        self.key
    }

    fn kind(&self) -> Kind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn origin(&self) -> &str {
        &self.origin
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn elem(&self) -> Option<TypeRef> {
        self.elem.map(|elem| elem())
    }

    fn key_type(&self) -> Option<TypeRef> {
        self.key_type.map(|key_type| key_type())
    }

    fn len(&self) -> Option<usize> {
        self.len
    }

    fn fields(&self) -> Vec<FieldDecl> {
        self.fields.map(|fields| fields()).unwrap_or_default()
    }
}

// ============================================================================
// Value Capability
// ============================================================================

/// A borrowed view of a reflected value.
///
/// Scalars are unpacked; composite values are handed back as an opaque
/// [`Reflect`] reference that can be downcast.
#[derive(Clone, Copy)]
pub enum Value<'a> {
    Nil,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Char(char),
    Str(&'a str),
    Ref(&'a dyn Reflect),
}

impl<'a> Value<'a> {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            Value::Str(v) => Some(*v),
            _ => None,
        }
    }

    /// Downcast a composite value to its concrete type.
    pub fn downcast_ref<T: Reflect>(&self) -> Option<&'a T> {
        match *self {
            Value::Ref(v) => v.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Ref(a), Value::Ref(b)) => std::ptr::addr_eq(*a, *b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("Nil"),
            Value::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Value::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Value::Uint(v) => f.debug_tuple("Uint").field(v).finish(),
            Value::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Value::Char(v) => f.debug_tuple("Char").field(v).finish(),
            Value::Str(v) => f.debug_tuple("Str").field(v).finish(),
            Value::Ref(v) => f
                .debug_tuple("Ref")
                .field(&v.type_ref().type_name())
                .finish(),
        }
    }
}

/// Runtime access to a value's type and fields.
///
/// Implemented by `#[derive(Reflect)]` for structs and by this crate for the
/// std types that can appear in reflected fields.
pub trait Reflect: Any {
    /// Type information for `Self`.
    fn type_of() -> TypeRef
    where
        Self: Sized;

    /// Kind of `Self`, without building a [`TypeRef`].
    fn static_kind() -> Kind
    where
        Self: Sized;

    /// A zero value: empty containers, `None`, zero numbers.
    fn zeroed() -> Self
    where
        Self: Sized;

    /// The value stored into a nil slot by nil initialisation.
    fn allocate() -> Self
    where
        Self: Sized,
    {
        Self::zeroed()
    }

    fn type_ref(&self) -> TypeRef;

    fn kind(&self) -> Kind;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn as_reflect(&self) -> &dyn Reflect;

    fn as_reflect_mut(&mut self) -> &mut dyn Reflect;

    fn value(&self) -> Value<'_>;

    /// Struct field at `index`.
    fn field(&self, _index: usize) -> Option<&dyn Reflect> {
        None
    }

    fn field_mut(&mut self, _index: usize) -> Option<&mut dyn Reflect> {
        None
    }

    /// Target of a pointer, `None` when nil or not a pointer.
    fn pointee(&self) -> Option<&dyn Reflect> {
        None
    }

    fn pointee_mut(&mut self) -> Option<&mut dyn Reflect> {
        None
    }

    fn is_nil(&self) -> bool {
        false
    }

    /// Replace a nil value with [`allocate`](Self::allocate). Returns true if
    /// a value was allocated.
    fn init_if_nil(&mut self) -> bool {
        false
    }
}

impl dyn Reflect {
    pub fn is<T: Reflect>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Reflect>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Reflect>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Follow one level of pointer indirection if `self` is a pointer.
    pub fn indirect(&self) -> Option<&dyn Reflect> {
        if self.kind() == Kind::Pointer {
            self.pointee()
        } else {
            Some(self)
        }
    }

    pub fn indirect_mut(&mut self) -> Option<&mut dyn Reflect> {
        if self.kind() == Kind::Pointer {
            self.pointee_mut()
        } else {
            Some(self)
        }
    }

    /// Walk an index path through nested struct fields, dereferencing
    /// pointers between levels.
    pub fn field_path_mut(&mut self, path: &[usize]) -> Option<&mut dyn Reflect> {
        let mut current = self;
        for (level, &index) in path.iter().enumerate() {
            if level > 0 {
                current = current.indirect_mut()?;
            }
            current = current.field_mut(index)?;
        }
        Some(current)
    }
}
