//! A single named, typed value slot of a record.

use std::fmt;
use std::sync::Arc;

use horizon_forms_core::logging::targets;
use horizon_forms_core::Property;
use parking_lot::Mutex;

use super::value::{DataType, ItemValue};
use crate::definition::ItemDefinition;
use crate::error::{Error, Result};

/// Callback invoked with `(item name, new value)` after every successful write.
pub type ItemChangeListener = Arc<dyn Fn(&str, &ItemValue) + Send + Sync>;

/// One item of a [`DataRecord`](super::DataRecord).
///
/// An item type-checks every write and forwards it to at most one change
/// listener, its owning record. It holds no business logic of its own.
pub struct DataItem {
    name: String,
    data_type: DataType,
    service_item: bool,
    value: Property<ItemValue>,
    hint_text: Property<Option<String>>,
    visual_attribute: Property<Option<String>>,
    listener: Mutex<Option<ItemChangeListener>>,
}

impl DataItem {
    /// Create an item from its definition, holding the definition's default value.
    ///
    /// No listener is attached yet, so assigning the default notifies nobody.
    pub fn from_definition(definition: &ItemDefinition) -> Result<Self> {
        let item = Self {
            service_item: definition.service_item,
            hint_text: Property::new(definition.hint_text.clone()),
            visual_attribute: Property::new(definition.visual_attribute.clone()),
            ..Self::new(&definition.name, definition.data_type)
        };
        item.set_value(definition.default_item_value()?)?;
        Ok(item)
    }

    /// Create a null service item.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            service_item: true,
            value: Property::new(ItemValue::Null),
            hint_text: Property::new(None),
            visual_attribute: Property::new(None),
            listener: Mutex::new(None),
        }
    }

    /// The item name as defined.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared data type.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Whether the item is mirrored into the record's service object.
    pub fn is_service_item(&self) -> bool {
        self.service_item
    }

    /// The current value.
    pub fn value(&self) -> ItemValue {
        self.value.get()
    }

    /// Store `value` and notify the attached listener.
    ///
    /// Fails with [`Error::TypeMismatch`] if the declared type does not
    /// accept the value; the item is left unchanged in that case.
    pub fn set_value(&self, value: ItemValue) -> Result<()> {
        self.store(value.clone())?;

        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener(&self.name, &value);
        }
        Ok(())
    }

    /// Store `value` without notifying the listener.
    ///
    /// Used when values are loaded from a service object rather than edited.
    pub(crate) fn load_value(&self, value: ItemValue) -> Result<()> {
        self.store(value)
    }

    fn store(&self, value: ItemValue) -> Result<()> {
        if !self.data_type.accepts(&value) {
            return Err(Error::TypeMismatch {
                item: self.name.clone(),
                expected: self.data_type,
                got: value.type_name(),
            });
        }
        tracing::trace!(target: targets::ITEM, item = %self.name, %value, "item value set");
        self.value.set_silent(value);
        Ok(())
    }

    /// Attach or detach the change listener.
    pub fn set_listener(&self, listener: Option<ItemChangeListener>) {
        *self.listener.lock() = listener;
    }

    /// Whether a change listener is attached.
    pub fn has_listener(&self) -> bool {
        self.listener.lock().is_some()
    }

    /// The hint text shown by renderers.
    pub fn hint_text(&self) -> Option<String> {
        self.hint_text.get()
    }

    /// Replace the hint text.
    pub fn set_hint_text(&self, hint: Option<String>) {
        self.hint_text.set(hint);
    }

    /// The visual attribute currently applied.
    pub fn visual_attribute(&self) -> Option<String> {
        self.visual_attribute.get()
    }

    /// Apply or clear a visual attribute.
    pub fn set_visual_attribute(&self, attribute: Option<String>) {
        self.visual_attribute.set(attribute);
    }
}

impl fmt::Debug for DataItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataItem")
            .field("name", &self.name)
            .field("data_type", &self.data_type)
            .field("value", &self.value())
            .finish()
    }
}
