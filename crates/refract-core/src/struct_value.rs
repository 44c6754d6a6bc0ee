//! Type metadata bound to a live struct instance.

use std::fmt;
use std::sync::Arc;

use refract_types::Kind;

use crate::cache::MetadataCache;
use crate::error::Result;
use crate::field::Field;
use crate::field_value::FieldValue;
use crate::metadata::Metadata;
use crate::reflect::Reflect;

/// A struct instance paired with its metadata.
///
/// The referent is either a struct or a pointer (`Option<S>`) to one.
///
/// ```
/// use refract_core::{StructValue, Value};
/// # use refract_core::{FieldDecl, Kind, Reflect, TypeDescriptor, TypeRef};
/// # #[derive(Default)]
/// # struct User { name: String }
/// # impl Reflect for User {
/// #     fn type_of() -> TypeRef {
/// #         fn fields() -> Vec<FieldDecl> {
/// #             vec![FieldDecl::new("name", String::type_of(), 0).public()]
/// #         }
/// #         TypeDescriptor::new::<User>(Kind::Struct).named("User", "doc").with_fields(fields).into_ref()
/// #     }
/// #     fn static_kind() -> Kind { Kind::Struct }
/// #     fn zeroed() -> Self { User::default() }
/// #     fn type_ref(&self) -> TypeRef { Self::type_of() }
/// #     fn kind(&self) -> Kind { Kind::Struct }
/// #     fn as_any(&self) -> &dyn std::any::Any { self }
/// #     fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
/// #     fn as_reflect(&self) -> &dyn Reflect { self }
/// #     fn as_reflect_mut(&mut self) -> &mut dyn Reflect { self }
/// #     fn value(&self) -> Value<'_> { Value::Ref(self) }
/// #     fn field(&self, i: usize) -> Option<&dyn Reflect> {
/// #         if i == 0 { Some(&self.name) } else { None }
/// #     }
/// #     fn field_mut(&mut self, i: usize) -> Option<&mut dyn Reflect> {
/// #         if i == 0 { Some(&mut self.name) } else { None }
/// #     }
/// # }
///
/// let mut user = User { name: "ann".to_string() };
/// let mut sv = StructValue::new(&mut user).unwrap().unwrap();
/// let name = sv.field_by_name("name").unwrap();
/// assert_eq!(name.get().unwrap(), Value::Str("ann"));
/// ```
pub struct StructValue<'a> {
    metadata: Arc<Metadata>,
    value: &'a mut dyn Reflect,
    is_ptr: bool,
}

impl<'a> StructValue<'a> {
    /// Bind `value` using metadata from the global cache.
    ///
    /// Returns `Ok(None)` when the referent is neither a struct nor a pointer
    /// to one, and an error only when the struct's tags do not parse.
    pub fn new(value: &'a mut dyn Reflect) -> Result<Option<Self>> {
        let ty = value.type_ref();
        if ty.indirect().kind() != Kind::Struct {
            return Ok(None);
        }
        let metadata = MetadataCache::global().get(&ty)?;
        Ok(Self::with_metadata(metadata, value))
    }

    /// Bind `value` to already derived metadata. Returns `None` when the
    /// metadata is not for the value's (pointee) struct type.
    pub fn with_metadata(metadata: Arc<Metadata>, value: &'a mut dyn Reflect) -> Option<Self> {
        let ty = value.type_ref();
        if !metadata.is_struct() || ty.indirect() != *metadata.type_ref() {
            return None;
        }
        Some(Self {
            metadata,
            is_ptr: ty.is_pointer(),
            value,
        })
    }

    pub fn metadata(&self) -> &Arc<Metadata> {
        &self.metadata
    }

    /// True when the bound value is a pointer to the struct.
    pub fn is_ptr(&self) -> bool {
        self.is_ptr
    }

    /// True when the bound value is a nil pointer.
    pub fn is_nil(&self) -> bool {
        self.is_ptr && self.value.is_nil()
    }

    pub fn num_field(&self) -> usize {
        self.metadata.num_field()
    }

    /// The first field declared with `name`, or `None` if there is no such
    /// field or the struct is behind a nil pointer.
    pub fn field_by_name(&mut self, name: &str) -> Option<FieldValue<'_>> {
        let field = self.metadata.field_by_name(name)?;
        Self::bind(field, &mut *self.value)
    }

    pub fn field_by_index(&mut self, index: usize) -> Option<FieldValue<'_>> {
        let field = self.metadata.field_by_index(index)?;
        Self::bind(field, &mut *self.value)
    }

    /// Allocate a zeroed struct behind a nil pointer.
    pub fn new_if_nil(&mut self) -> &mut Self {
        if self.is_ptr {
            self.value.init_if_nil();
        }
        self
    }

    /// Give up the binding and return the underlying value.
    pub fn into_inner(self) -> &'a mut dyn Reflect {
        self.value
    }

    fn bind<'s>(field: &'s Field, value: &'s mut dyn Reflect) -> Option<FieldValue<'s>> {
        let target = value.indirect_mut()?.field_path_mut(field.index())?;
        Some(FieldValue::new(field, target))
    }
}

impl fmt::Debug for StructValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructValue")
            .field("type_name", &self.metadata.type_name())
            .field("is_ptr", &self.is_ptr)
            .field("is_nil", &self.is_nil())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::DynValue;
    use crate::reflect::{FieldDecl, TypeDescriptor, Value};
    use refract_macros::Reflect;
    use std::collections::HashMap;

    #[derive(Debug, Default, PartialEq, Reflect)]
    #[refract(crate = "crate")]
    struct Address {
        pub city: String,
        pub zip: Option<u32>,
    }

    #[derive(Debug, Default, PartialEq, Reflect)]
    #[refract(crate = "crate")]
    struct Person {
        #[refract(tag = r#"json:"name""#)]
        pub name: String,
        age: u8,
        pub home: Address,
        pub work: Option<Address>,
        pub labels: Option<HashMap<i32, String>>,
    }

    #[derive(Default, Reflect)]
    #[refract(crate = "crate")]
    struct Wrapper {
        #[refract(embed)]
        pub person: Person,
        pub extra: DynValue,
    }

    fn person() -> Person {
        Person {
            name: "ann".to_string(),
            age: 30,
            ..Person::default()
        }
    }

    #[test]
    fn test_bind_struct() {
        let mut p = person();
        let mut sv = StructValue::new(&mut p).unwrap().unwrap();
        assert!(!sv.is_ptr());
        assert_eq!(sv.num_field(), 5);
        assert_eq!(sv.metadata().name(), "Person");

        let name = sv.field_by_name("name").unwrap();
        assert_eq!(name.field().tag("json").name(), "name");
        assert_eq!(name.get().unwrap(), Value::Str("ann"));

        let age = sv.field_by_index(1).unwrap();
        assert!(age.get().unwrap_err().is_unexported_field());
        assert_eq!(age.downcast_ref::<u8>(), Some(&30));

        assert!(sv.field_by_name("missing").is_none());
        assert!(sv.field_by_index(5).is_none());
    }

    #[test]
    fn test_bind_rejects_non_struct() {
        let mut n = 5i32;
        assert!(StructValue::new(&mut n).unwrap().is_none());

        let mut list = vec![person()];
        assert!(StructValue::new(&mut list).unwrap().is_none());

        let meta = MetadataCache::global().get_of::<Address>().unwrap();
        let mut p = person();
        assert!(StructValue::with_metadata(meta, &mut p).is_none());
    }

    #[test]
    fn test_set_through_binding() {
        let mut p = person();
        {
            let mut sv = StructValue::new(&mut p).unwrap().unwrap();
            sv.field_by_name("name")
                .unwrap()
                .set("bob".to_string())
                .unwrap();
        }
        assert_eq!(p.name, "bob");
    }

    #[test]
    fn test_pointer_root() {
        let mut slot: Option<Address> = None;
        let mut sv = StructValue::new(&mut slot).unwrap().unwrap();
        assert!(sv.is_ptr());
        assert!(sv.is_nil());
        assert!(sv.field_by_name("city").is_none());

        sv.new_if_nil();
        assert!(!sv.is_nil());
        sv.field_by_name("city")
            .unwrap()
            .set("Oslo".to_string())
            .unwrap();
        assert_eq!(
            slot,
            Some(Address {
                city: "Oslo".to_string(),
                zip: None,
            })
        );
    }

    #[test]
    fn test_nested_struct_value() {
        let mut p = person();
        let mut sv = StructValue::new(&mut p).unwrap().unwrap();

        let home = sv.field_by_name("home").unwrap();
        let mut home = home.struct_value().unwrap().unwrap();
        assert!(!home.is_ptr());
        home.field_by_name("city")
            .unwrap()
            .set("Rome".to_string())
            .unwrap();

        let work = sv.field_by_name("work").unwrap();
        assert!(work.field().is_struct());
        let mut work = work.struct_value().unwrap().unwrap();
        assert!(work.is_nil());
        work.new_if_nil();
        work.field_by_name("zip").unwrap().new_if_nil();

        assert_eq!(p.home.city, "Rome");
        assert_eq!(p.work.map(|w| w.zip), Some(Some(0)));
    }

    #[test]
    fn test_nil_map_field() {
        let mut p = person();
        let mut sv = StructValue::new(&mut p).unwrap().unwrap();
        let mut labels = sv.field_by_name("labels").unwrap();
        assert!(labels.field().is_map());
        assert_eq!(labels.get().unwrap(), Value::Nil);

        labels.new_if_nil();
        assert!(!labels.is_nil());
        let map = labels
            .downcast_ref::<Option<HashMap<i32, String>>>()
            .unwrap()
            .as_ref()
            .unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_embedded_field() {
        let mut w = Wrapper {
            person: person(),
            extra: DynValue::new(1u8),
        };
        let mut sv = StructValue::new(&mut w).unwrap().unwrap();

        let person = sv.field_by_name("person").unwrap();
        assert!(person.field().is_embedded());
        assert!(person.get().unwrap_err().is_invalid_field());
        let mut inner = person.struct_value().unwrap().unwrap();
        assert_eq!(
            inner.field_by_name("name").unwrap().get().unwrap(),
            Value::Str("ann")
        );

        let extra = sv.field_by_name("extra").unwrap();
        assert!(extra.field().is_interface());
        assert!(extra.get().unwrap_err().is_invalid_field());
        assert_eq!(extra.value().value(), Value::Uint(1));
    }

    #[derive(Debug, Default, PartialEq, Reflect)]
    #[refract(crate = "crate")]
    struct Inner {
        pub a: u32,
        pub b: u32,
    }

    #[derive(Debug, Default, Reflect)]
    #[refract(crate = "crate")]
    struct Outer {
        pub inner: Option<Inner>,
    }

    fn promoted_fields() -> Vec<FieldDecl> {
        vec![
            FieldDecl::new("inner", Option::<Inner>::type_of(), 0)
                .public()
                .embedded(),
            FieldDecl::new("b", u32::type_of(), 0)
                .public()
                .with_index_path(vec![0, 1]),
        ]
    }

    fn promoted_metadata() -> Arc<Metadata> {
        let ty = TypeDescriptor::new::<Outer>(Kind::Struct)
            .named("Outer", "struct_value")
            .with_fields(promoted_fields)
            .into_ref();
        Arc::new(Metadata::new(&ty).unwrap())
    }

    #[test]
    fn test_index_path_through_pointer() {
        let meta = promoted_metadata();
        assert_eq!(meta.field_by_name("b").unwrap().index(), [0, 1]);

        let mut outer = Outer::default();
        {
            let mut sv = StructValue::with_metadata(Arc::clone(&meta), &mut outer).unwrap();
            assert!(sv.field_by_name("b").is_none());
            assert!(sv.field_by_name("inner").unwrap().is_nil());
        }

        outer.inner = Some(Inner { a: 1, b: 7 });
        {
            let mut sv = StructValue::with_metadata(Arc::clone(&meta), &mut outer).unwrap();
            let mut b = sv.field_by_name("b").unwrap();
            assert_eq!(b.get().unwrap(), Value::Uint(7));
            b.set(9u32).unwrap();
        }
        assert_eq!(outer.inner, Some(Inner { a: 1, b: 9 }));
    }
}
