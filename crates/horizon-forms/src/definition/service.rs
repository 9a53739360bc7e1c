//! Static item-to-field mapping for service objects.
//!
//! Every record mirrors its service items into a backing object (the
//! "service pojo") that the persistence layer reads and writes. The mapping
//! from item name to field accessor is declared once, with a typed builder,
//! and resolved by name only when a record is created or copied.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::data::ItemValue;

/// A type-erased backing object owned by a record.
pub type ServicePojo = Box<dyn Any + Send + Sync>;

type PojoFactory = Arc<dyn Fn() -> ServicePojo + Send + Sync>;
type FieldGetter = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Option<ItemValue> + Send + Sync>;
type FieldSetter = Arc<dyn Fn(&mut (dyn Any + Send + Sync), ItemValue) -> bool + Send + Sync>;

#[derive(Clone)]
struct FieldAccessor {
    get: FieldGetter,
    set: FieldSetter,
}

/// Maps item names to accessors on one backing object type.
///
/// # Example
///
/// ```
/// use horizon_forms::definition::ServiceMapping;
/// use horizon_forms::data::ItemValue;
///
/// #[derive(Default)]
/// struct Employee {
///     name: String,
///     salary: i64,
/// }
///
/// let mapping = ServiceMapping::builder::<Employee>()
///     .field(
///         "name",
///         |e| ItemValue::from(e.name.clone()),
///         |e, v| e.name = v.as_string().unwrap_or_default().to_string(),
///     )
///     .field(
///         "salary",
///         |e| ItemValue::from(e.salary),
///         |e, v| e.salary = v.as_int().unwrap_or_default(),
///     )
///     .build();
///
/// let mut pojo = mapping.new_pojo();
/// assert!(mapping.write(&mut pojo, "SALARY", ItemValue::from(10)));
/// assert_eq!(mapping.read(&pojo, "salary"), Some(ItemValue::from(10)));
/// ```
#[derive(Clone)]
pub struct ServiceMapping {
    type_name: &'static str,
    factory: PojoFactory,
    fields: HashMap<String, FieldAccessor>,
}

impl ServiceMapping {
    /// Start a mapping for backing objects of type `P`.
    pub fn builder<P: Default + Send + Sync + 'static>() -> ServiceMappingBuilder<P> {
        ServiceMappingBuilder {
            factory: Arc::new(P::default),
            fields: HashMap::new(),
        }
    }

    /// Name of the backing object type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Construct a fresh backing object.
    pub fn new_pojo(&self) -> ServicePojo {
        (self.factory)()
    }

    /// Returns `true` if `item_name` maps to a field.
    pub fn has_field(&self, item_name: &str) -> bool {
        self.fields.contains_key(&item_name.to_lowercase())
    }

    /// Names of all mapped fields, lowercased.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Read the field mapped to `item_name`.
    ///
    /// Returns `None` if the item is not mapped or the object has the wrong type.
    pub fn read(&self, pojo: &ServicePojo, item_name: &str) -> Option<ItemValue> {
        let accessor = self.fields.get(&item_name.to_lowercase())?;
        (accessor.get)(&**pojo)
    }

    /// Write `value` into the field mapped to `item_name`.
    ///
    /// Returns `false` if the item is not mapped or the object has the wrong type.
    pub fn write(&self, pojo: &mut ServicePojo, item_name: &str, value: ItemValue) -> bool {
        match self.fields.get(&item_name.to_lowercase()) {
            Some(accessor) => (accessor.set)(&mut **pojo, value),
            None => false,
        }
    }
}

impl fmt::Debug for ServiceMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<&str> = self.field_names().collect();
        fields.sort_unstable();
        f.debug_struct("ServiceMapping")
            .field("type_name", &self.type_name)
            .field("fields", &fields)
            .finish()
    }
}

/// Builder for [`ServiceMapping`].
pub struct ServiceMappingBuilder<P> {
    factory: Arc<dyn Fn() -> P + Send + Sync>,
    fields: HashMap<String, FieldAccessor>,
}

impl<P: Send + Sync + 'static> ServiceMappingBuilder<P> {
    /// Use `factory` instead of `P::default` to create backing objects.
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> P + Send + Sync + 'static,
    {
        self.factory = Arc::new(factory);
        self
    }

    /// Map `item_name` to a getter/setter pair on `P`.
    pub fn field<G, S>(mut self, item_name: &str, getter: G, setter: S) -> Self
    where
        G: Fn(&P) -> ItemValue + Send + Sync + 'static,
        S: Fn(&mut P, ItemValue) + Send + Sync + 'static,
    {
        let get: FieldGetter = Arc::new(move |pojo: &(dyn Any + Send + Sync)| {
            pojo.downcast_ref::<P>().map(&getter)
        });
        let set: FieldSetter = Arc::new(move |pojo: &mut (dyn Any + Send + Sync), value: ItemValue| {
            match pojo.downcast_mut::<P>() {
                Some(pojo) => {
                    setter(pojo, value);
                    true
                }
                None => false,
            }
        });
        self.fields
            .insert(item_name.to_lowercase(), FieldAccessor { get, set });
        self
    }

    /// Finish the mapping.
    pub fn build(self) -> ServiceMapping {
        let factory = self.factory;
        ServiceMapping {
            type_name: std::any::type_name::<P>(),
            factory: Arc::new(move || Box::new(factory()) as ServicePojo),
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug, PartialEq)]
    struct Person {
        first_name: String,
        age: i64,
    }

    fn mapping() -> ServiceMapping {
        ServiceMapping::builder::<Person>()
            .field(
                "first_name",
                |p| ItemValue::from(p.first_name.clone()),
                |p, v| p.first_name = v.as_string().unwrap_or_default().to_string(),
            )
            .field(
                "age",
                |p| ItemValue::from(p.age),
                |p, v| p.age = v.as_int().unwrap_or_default(),
            )
            .build()
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mapping = mapping();
        assert!(mapping.has_field("FIRST_NAME"));
        assert!(!mapping.has_field("last_name"));
    }

    #[test]
    fn test_write_then_read() {
        let mapping = mapping();
        let mut pojo = mapping.new_pojo();
        assert!(mapping.write(&mut pojo, "first_name", ItemValue::from("Ada")));
        assert_eq!(mapping.read(&pojo, "First_Name"), Some(ItemValue::from("Ada")));
        assert_eq!(pojo.downcast_ref::<Person>().map(|p| p.age), Some(0));
    }

    #[test]
    fn test_wrong_object_type_is_ignored() {
        let mapping = mapping();
        let mut other: ServicePojo = Box::new(17u32);
        assert!(!mapping.write(&mut other, "age", ItemValue::from(3)));
        assert_eq!(mapping.read(&other, "age"), None);
    }

    #[test]
    fn test_custom_factory() {
        let mapping = ServiceMapping::builder::<Person>()
            .factory(|| Person {
                first_name: "unnamed".into(),
                age: 1,
            })
            .field(
                "age",
                |p| ItemValue::from(p.age),
                |p, v| p.age = v.as_int().unwrap_or_default(),
            )
            .build();
        let pojo = mapping.new_pojo();
        assert_eq!(mapping.read(&pojo, "age"), Some(ItemValue::from(1)));
        assert!(mapping.type_name().ends_with("Person"));
    }
}
