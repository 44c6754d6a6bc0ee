//! [`Reflect`] implementations for std types.
//!
//! Mapping to kinds:
//!
//! | Rust                         | Kind                      |
//! |------------------------------|---------------------------|
//! | integers, floats, bool, char | matching scalar kind      |
//! | `String`, `&'static str`     | `String`                  |
//! | `Option<T>`                  | `Pointer`, nil when `None` |
//! | `Option<Vec<T>>`, `Option<HashMap<K, V>>` | `Slice` / `Map`, nil when `None` |
//! | `Box<T>`                     | same as `T`               |
//! | `Vec<T>`                     | `Slice`                   |
//! | `[T; N]`                     | `Array`                   |
//! | `HashMap`, `BTreeMap`        | `Map`                     |
//! | [`DynValue`]                 | `Interface`               |

use std::any::{Any, type_name};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

use refract_types::{Kind, split_item_path};

use crate::reflect::{FieldDecl, Reflect, TypeDescriptor, TypeInfo, TypeKey, TypeRef, Value};

/// Type info for a named, non-generic std type.
fn native<T: ?Sized + 'static>(kind: Kind) -> TypeRef {
    let (origin, name) = split_item_path(type_name::<T>());
    TypeDescriptor::new::<T>(kind)
        .named(name, origin)
        .into_ref()
}

macro_rules! impl_scalar {
    ($($ty:ty => $kind:ident, |$v:ident| $value:expr;)*) => {$(
        impl Reflect for $ty {
            fn type_of() -> TypeRef {
                native::<$ty>(Kind::$kind)
            }

            fn static_kind() -> Kind {
                Kind::$kind
            }

            fn zeroed() -> Self {
                Default::default()
            }

            fn type_ref(&self) -> TypeRef {
                Self::type_of()
            }

            fn kind(&self) -> Kind {
                Kind::$kind
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }

            fn as_reflect(&self) -> &dyn Reflect {
                self
            }

            fn as_reflect_mut(&mut self) -> &mut dyn Reflect {
                self
            }

            fn value(&self) -> Value<'_> {
                let $v = self;
                $value
            }
        }
    )*};
}

impl_scalar! {
    bool => Bool, |v| Value::Bool(*v);
    i8 => I8, |v| Value::Int(*v as i64);
    i16 => I16, |v| Value::Int(*v as i64);
    i32 => I32, |v| Value::Int(*v as i64);
    i64 => I64, |v| Value::Int(*v);
    isize => Isize, |v| Value::Int(*v as i64);
    u8 => U8, |v| Value::Uint(*v as u64);
    u16 => U16, |v| Value::Uint(*v as u64);
    u32 => U32, |v| Value::Uint(*v as u64);
    u64 => U64, |v| Value::Uint(*v);
    usize => Usize, |v| Value::Uint(*v as u64);
    f32 => F32, |v| Value::Float(*v as f64);
    f64 => F64, |v| Value::Float(*v);
    char => Char, |v| Value::Char(*v);
    String => String, |v| Value::Str(v.as_str());
    &'static str => String, |v| Value::Str(v);
}

// ============================================================================
// Containers
// ============================================================================

impl<T: Reflect> Reflect for Vec<T> {
    fn type_of() -> TypeRef {
        TypeDescriptor::new::<Self>(Kind::Slice)
            .with_elem(T::type_of)
            .into_ref()
    }

    fn static_kind() -> Kind {
        Kind::Slice
    }

    fn zeroed() -> Self {
        Vec::new()
    }

    fn type_ref(&self) -> TypeRef {
        Self::type_of()
    }

    fn kind(&self) -> Kind {
        Kind::Slice
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_reflect(&self) -> &dyn Reflect {
        self
    }

    fn as_reflect_mut(&mut self) -> &mut dyn Reflect {
        self
    }

    fn value(&self) -> Value<'_> {
        Value::Ref(self)
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn type_of() -> TypeRef {
        TypeDescriptor::new::<Self>(Kind::Array)
            .with_elem(T::type_of)
            .with_len(N)
            .into_ref()
    }

    fn static_kind() -> Kind {
        Kind::Array
    }

    fn zeroed() -> Self {
        std::array::from_fn(|_| T::zeroed())
    }

    fn type_ref(&self) -> TypeRef {
        Self::type_of()
    }

    fn kind(&self) -> Kind {
        Kind::Array
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_reflect(&self) -> &dyn Reflect {
        self
    }

    fn as_reflect_mut(&mut self) -> &mut dyn Reflect {
        self
    }

    fn value(&self) -> Value<'_> {
        Value::Ref(self)
    }
}

macro_rules! impl_map {
    ($map:ident, $($key_bound:path),+; $alloc:expr) => {
        impl<K, V> Reflect for $map<K, V>
        where
            K: Reflect $(+ $key_bound)+,
            V: Reflect,
        {
            fn type_of() -> TypeRef {
                TypeDescriptor::new::<Self>(Kind::Map)
                    .with_key_type(K::type_of)
                    .with_elem(V::type_of)
                    .into_ref()
            }

            fn static_kind() -> Kind {
                Kind::Map
            }

            fn zeroed() -> Self {
                $map::new()
            }

            fn allocate() -> Self {
                $alloc
            }

            fn type_ref(&self) -> TypeRef {
                Self::type_of()
            }

            fn kind(&self) -> Kind {
                Kind::Map
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }

            fn as_reflect(&self) -> &dyn Reflect {
                self
            }

            fn as_reflect_mut(&mut self) -> &mut dyn Reflect {
                self
            }

            fn value(&self) -> Value<'_> {
                Value::Ref(self)
            }
        }
    };
}

impl_map!(HashMap, Eq, Hash; HashMap::with_capacity(1));
impl_map!(BTreeMap, Ord; BTreeMap::new());

// ============================================================================
// Indirection
// ============================================================================

/// Type info for `Option<C>` where `C` is a slice or map: reported with the
/// container's kind and nil when `None`.
struct Nilable {
    key: TypeKey,
    type_name: &'static str,
    inner: TypeRef,
}

impl TypeInfo for Nilable {
    fn key(&self) -> TypeKey {
        self.key
    }

    fn kind(&self) -> Kind {
        self.inner.kind()
    }

    fn name(&self) -> &str {
        ""
    }

    fn origin(&self) -> &str {
        ""
    }

    fn type_name(&self) -> &str {
        self.type_name
    }

    fn elem(&self) -> Option<TypeRef> {
        self.inner.elem()
    }

    fn key_type(&self) -> Option<TypeRef> {
        self.inner.key_type()
    }

    fn len(&self) -> Option<usize> {
        self.inner.len()
    }

    fn fields(&self) -> Vec<FieldDecl> {
        Vec::new()
    }
}

fn is_container(kind: Kind) -> bool {
    matches!(kind, Kind::Map | Kind::Slice)
}

impl<T: Reflect> Reflect for Option<T> {
    fn type_of() -> TypeRef {
        if is_container(T::static_kind()) {
            TypeRef::new(Nilable {
                key: TypeKey::of::<Self>(),
                type_name: type_name::<Self>(),
                inner: T::type_of(),
            })
        } else {
            TypeDescriptor::new::<Self>(Kind::Pointer)
                .with_elem(T::type_of)
                .into_ref()
        }
    }

    fn static_kind() -> Kind {
        match T::static_kind() {
            kind @ (Kind::Map | Kind::Slice) => kind,
            _ => Kind::Pointer,
        }
    }

    fn zeroed() -> Self {
        None
    }

    fn type_ref(&self) -> TypeRef {
        Self::type_of()
    }

    fn kind(&self) -> Kind {
        Self::static_kind()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_reflect(&self) -> &dyn Reflect {
        self
    }

    fn as_reflect_mut(&mut self) -> &mut dyn Reflect {
        self
    }

    fn value(&self) -> Value<'_> {
        match self {
            None => Value::Nil,
            Some(inner) if is_container(T::static_kind()) => inner.value(),
            Some(_) => Value::Ref(self),
        }
    }

    fn pointee(&self) -> Option<&dyn Reflect> {
        if is_container(T::static_kind()) {
            return None;
        }
        self.as_ref().map(|inner| inner.as_reflect())
    }

    fn pointee_mut(&mut self) -> Option<&mut dyn Reflect> {
        if is_container(T::static_kind()) {
            return None;
        }
        self.as_mut().map(|inner| inner.as_reflect_mut())
    }

    fn is_nil(&self) -> bool {
        self.is_none()
    }

    fn init_if_nil(&mut self) -> bool {
        if self.is_some() {
            return false;
        }
        *self = Some(T::allocate());
        true
    }
}

/// `Box<T>` is transparent: it reports the type of `T` and downcasts as `T`.
/// This keeps `Option<Box<Node>>` a single pointer to `Node`.
impl<T: Reflect> Reflect for Box<T> {
    fn type_of() -> TypeRef {
        T::type_of()
    }

    fn static_kind() -> Kind {
        T::static_kind()
    }

    fn zeroed() -> Self {
        Box::new(T::zeroed())
    }

    fn allocate() -> Self {
        Box::new(T::allocate())
    }

    fn type_ref(&self) -> TypeRef {
        (**self).type_ref()
    }

    fn kind(&self) -> Kind {
        (**self).kind()
    }

    fn as_any(&self) -> &dyn Any {
        (**self).as_any()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        (**self).as_any_mut()
    }

    fn as_reflect(&self) -> &dyn Reflect {
        (**self).as_reflect()
    }

    fn as_reflect_mut(&mut self) -> &mut dyn Reflect {
        (**self).as_reflect_mut()
    }

    fn value(&self) -> Value<'_> {
        (**self).value()
    }

    fn field(&self, index: usize) -> Option<&dyn Reflect> {
        (**self).field(index)
    }

    fn field_mut(&mut self, index: usize) -> Option<&mut dyn Reflect> {
        (**self).field_mut(index)
    }

    fn pointee(&self) -> Option<&dyn Reflect> {
        (**self).pointee()
    }

    fn pointee_mut(&mut self) -> Option<&mut dyn Reflect> {
        (**self).pointee_mut()
    }

    fn is_nil(&self) -> bool {
        (**self).is_nil()
    }

    fn init_if_nil(&mut self) -> bool {
        (**self).init_if_nil()
    }
}

// ============================================================================
// Dynamic Values
// ============================================================================

/// A dynamically typed value slot, reported with `Interface` kind.
#[derive(Default)]
pub struct DynValue(pub Option<Box<dyn Reflect>>);

impl DynValue {
    pub fn new(value: impl Reflect) -> Self {
        Self(Some(Box::new(value)))
    }

    pub fn nil() -> Self {
        Self(None)
    }

    pub fn get(&self) -> Option<&dyn Reflect> {
        self.0.as_deref()
    }

    pub fn set(&mut self, value: impl Reflect) {
        self.0 = Some(Box::new(value));
    }

    pub fn take(&mut self) -> Option<Box<dyn Reflect>> {
        self.0.take()
    }
}

impl fmt::Debug for DynValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(inner) => f.debug_tuple("DynValue").field(&inner.value()).finish(),
            None => f.write_str("DynValue(nil)"),
        }
    }
}

impl Reflect for DynValue {
    fn type_of() -> TypeRef {
        native::<DynValue>(Kind::Interface)
    }

    fn static_kind() -> Kind {
        Kind::Interface
    }

    fn zeroed() -> Self {
        Self::nil()
    }

    fn type_ref(&self) -> TypeRef {
        Self::type_of()
    }

    fn kind(&self) -> Kind {
        Kind::Interface
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_reflect(&self) -> &dyn Reflect {
        self
    }

    fn as_reflect_mut(&mut self) -> &mut dyn Reflect {
        self
    }

    fn value(&self) -> Value<'_> {
        match &self.0 {
            Some(inner) => inner.value(),
            None => Value::Nil,
        }
    }

    fn pointee(&self) -> Option<&dyn Reflect> {
        self.0.as_deref()
    }

    fn pointee_mut(&mut self) -> Option<&mut dyn Reflect> {
        self.0.as_deref_mut()
    }

    fn is_nil(&self) -> bool {
        self.0.is_none()
    }
}
