//! A field descriptor bound to a live field.

use std::fmt;

use crate::cache::MetadataCache;
use crate::error::{Error, Result};
use crate::field::Field;
use crate::reflect::{Reflect, Value};
use crate::struct_value::StructValue;

/// One field of a live struct, paired with its descriptor.
///
/// Obtained from [`StructValue::field_by_name`] or
/// [`StructValue::field_by_index`]. Borrows the instance mutably for as long
/// as it lives.
pub struct FieldValue<'a> {
    field: &'a Field,
    value: &'a mut dyn Reflect,
}

impl<'a> FieldValue<'a> {
    pub fn new(field: &'a Field, value: &'a mut dyn Reflect) -> Self {
        Self { field, value }
    }

    pub fn field(&self) -> &'a Field {
        self.field
    }

    pub fn name(&self) -> &'a str {
        self.field.name()
    }

    /// The live value, regardless of visibility.
    pub fn value(&self) -> &dyn Reflect {
        &*self.value
    }

    pub fn value_mut(&mut self) -> &mut dyn Reflect {
        &mut *self.value
    }

    pub fn downcast_ref<T: Reflect>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Reflect>(&mut self) -> Option<&mut T> {
        self.value.downcast_mut::<T>()
    }

    pub fn is_nil(&self) -> bool {
        self.value.is_nil()
    }

    /// Allocate a nil field in place: pointers get a zeroed pointee, maps an
    /// empty map, slices an empty slice. Other fields are left alone.
    pub fn new_if_nil(&mut self) -> &mut Self {
        self.value.init_if_nil();
        self
    }

    /// Read the field.
    ///
    /// Fails with [`Error::InvalidField`] for embedded and interface fields
    /// and [`Error::UnexportedField`] for fields that are not public.
    pub fn get(&self) -> Result<Value<'_>> {
        self.check_access()?;
        Ok(self.value.value())
    }

    /// Overwrite the field with `value`, subject to the same checks as
    /// [`get`](Self::get). `T` must be the field's declared type.
    pub fn set<T: Reflect>(&mut self, value: T) -> Result<()> {
        self.check_access()?;
        match self.value.downcast_mut::<T>() {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::TypeMismatch {
                field: self.field.name().to_string(),
                expected: self.field.ty().type_name().to_string(),
            }),
        }
    }

    /// Bind a struct or pointer-to-struct field as a nested [`StructValue`].
    ///
    /// A nil pointer field still binds; call
    /// [`StructValue::new_if_nil`] before reading through it.
    pub fn struct_value(self) -> Result<Option<StructValue<'a>>> {
        if !self.field.is_struct() {
            return Ok(None);
        }
        let metadata = MetadataCache::global().get(self.field.ty())?;
        Ok(StructValue::with_metadata(metadata, self.value))
    }

    fn check_access(&self) -> Result<()> {
        if !self.field.is_valid() {
            return Err(Error::InvalidField(self.field.name().to_string()));
        }
        if !self.field.is_exported() {
            return Err(Error::UnexportedField(self.field.name().to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldValue")
            .field("name", &self.field.name())
            .field("value", &self.value.value())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::DynValue;
    use crate::reflect::FieldDecl;
    use std::collections::HashMap;

    fn field<T: Reflect>(name: &str, public: bool) -> Field {
        let mut decl = FieldDecl::new(name, T::type_of(), 0);
        if public {
            decl = decl.public();
        }
        Field::new(decl).unwrap()
    }

    #[test]
    fn test_get_and_set() {
        let desc = field::<String>("Name", true);
        let mut name = String::from("a");
        let mut fv = FieldValue::new(&desc, &mut name);

        assert_eq!(fv.get().unwrap(), Value::Str("a"));
        fv.set(String::from("b")).unwrap();
        assert_eq!(fv.downcast_ref::<String>().map(String::as_str), Some("b"));

        let err = fv.set(5i32).unwrap_err();
        assert_eq!(
            err,
            Error::TypeMismatch {
                field: "Name".to_string(),
                expected: "alloc::string::String".to_string(),
            }
        );
        assert_eq!(name, "b");
    }

    #[test]
    fn test_access_errors() {
        let desc = field::<i32>("hidden", false);
        let mut hidden = 1i32;
        let mut fv = FieldValue::new(&desc, &mut hidden);
        assert_eq!(
            fv.get().unwrap_err(),
            Error::UnexportedField("hidden".to_string())
        );
        assert!(fv.set(2i32).unwrap_err().is_unexported_field());
        assert_eq!(fv.value().value(), Value::Int(1));

        let desc = field::<DynValue>("Any", true);
        let mut any = DynValue::new(1u8);
        let fv = FieldValue::new(&desc, &mut any);
        assert!(fv.get().unwrap_err().is_invalid_field());

        // Invalid takes precedence over unexported.
        let desc = Field::new(FieldDecl::new("inner", i32::type_of(), 0).embedded()).unwrap();
        let mut inner = 0i32;
        let fv = FieldValue::new(&desc, &mut inner);
        assert_eq!(
            fv.get().unwrap_err(),
            Error::InvalidField("inner".to_string())
        );
    }

    #[test]
    fn test_new_if_nil_pointer() {
        let desc = field::<Option<i64>>("Count", true);
        let mut count: Option<i64> = None;
        let mut fv = FieldValue::new(&desc, &mut count);
        assert!(fv.is_nil());
        assert_eq!(fv.get().unwrap(), Value::Nil);

        fv.new_if_nil();
        assert!(!fv.is_nil());
        assert_eq!(count, Some(0));
    }

    #[test]
    fn test_new_if_nil_map_and_slice() {
        let desc = field::<Option<HashMap<i32, String>>>("M", true);
        let mut map: Option<HashMap<i32, String>> = None;
        FieldValue::new(&desc, &mut map).new_if_nil();
        let map = map.unwrap();
        assert!(map.is_empty());
        assert!(map.capacity() >= 1);

        let desc = field::<Option<Vec<u8>>>("S", true);
        let mut list: Option<Vec<u8>> = None;
        let mut fv = FieldValue::new(&desc, &mut list);
        fv.new_if_nil().new_if_nil();
        assert!(!fv.is_nil());
        assert_eq!(list, Some(Vec::new()));
    }

    #[test]
    fn test_new_if_nil_keeps_values() {
        let desc = field::<Option<i64>>("Count", true);
        let mut count = Some(7i64);
        FieldValue::new(&desc, &mut count).new_if_nil();
        assert_eq!(count, Some(7));

        let desc = field::<u8>("N", true);
        let mut n = 3u8;
        FieldValue::new(&desc, &mut n).new_if_nil();
        assert_eq!(n, 3);
    }

    #[test]
    fn test_struct_value_of_scalar() {
        let desc = field::<u8>("N", true);
        let mut n = 3u8;
        let fv = FieldValue::new(&desc, &mut n);
        assert!(fv.struct_value().unwrap().is_none());
    }
}
