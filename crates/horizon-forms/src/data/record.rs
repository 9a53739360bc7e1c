//! Records: one row of named item values plus persistence-intent status.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use horizon_forms_core::logging::targets;
use parking_lot::Mutex;

use super::block::DataBlock;
use super::item::DataItem;
use super::value::ItemValue;
use crate::definition::{BlockDefinition, ServiceMapping, ServicePojo};
use crate::error::{Error, Result};

static NEXT_RECORD_ID: AtomicU64 = AtomicU64::new(1);

/// Shared handle to a record. Records are compared by identity.
pub type RecordRef = Arc<DataRecord>;

/// Receives item changes of a record in place of its block.
///
/// A renderer register installs itself while it displays a record, so edits
/// reach the register first and the register decides what the block hears.
pub trait RecordChangeListener: Send + Sync {
    /// `item_name` of `record` was written.
    fn data_item_changed(&self, record: &RecordRef, item_name: &str);
}

/// Persistence-intent flags of a record.
///
/// `marked_for_insert` and `marked_for_update` are never both set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordStatus {
    /// Loaded from the data source (or saved since).
    pub queried: bool,
    /// Created by the user, not yet persisted.
    pub marked_for_insert: bool,
    /// Persisted record edited since the last save.
    pub marked_for_update: bool,
    /// Persisted record awaiting deletion.
    pub marked_for_delete: bool,
    /// A service item was written since creation or the last save.
    pub changed: bool,
}

impl RecordStatus {
    /// Any persistence mark is set.
    pub fn is_dirty(&self) -> bool {
        self.marked_for_insert || self.marked_for_update || self.marked_for_delete
    }
}

/// A record of a block.
///
/// Item lookups ignore case. Every write to a service item is mirrored into
/// the record's backing service object and sets the `changed` flag; the
/// write is then reported exactly once, to the transient listener if one is
/// installed and otherwise to the owning block.
pub struct DataRecord {
    id: u64,
    definition: Arc<BlockDefinition>,
    block: Weak<DataBlock>,
    items: Vec<DataItem>,
    status: Mutex<RecordStatus>,
    base_record: Mutex<Option<RecordRef>>,
    service_pojo: Mutex<Option<ServicePojo>>,
    listener: Mutex<Option<Weak<dyn RecordChangeListener>>>,
    self_ref: Weak<DataRecord>,
}

impl DataRecord {
    /// Create a record that belongs to no block.
    pub fn new(definition: Arc<BlockDefinition>) -> Result<RecordRef> {
        Self::build(definition, Weak::new(), None)
    }

    /// Create a record whose item values are read from an existing service object.
    ///
    /// The record belongs to no block. Query results destined for a block go
    /// through [`DataBlock::add_queried_pojo`] instead.
    pub fn from_service_pojo(
        definition: Arc<BlockDefinition>,
        pojo: ServicePojo,
    ) -> Result<RecordRef> {
        Self::build(definition, Weak::new(), Some(pojo))
    }

    pub(crate) fn build(
        definition: Arc<BlockDefinition>,
        block: Weak<DataBlock>,
        pojo: Option<ServicePojo>,
    ) -> Result<RecordRef> {
        let items = definition
            .items
            .iter()
            .map(DataItem::from_definition)
            .collect::<Result<Vec<_>>>()?;

        let pojo = match (definition.service(), pojo) {
            (Some(mapping), Some(pojo)) => {
                load_from_pojo(mapping, &pojo, &items)?;
                Some(pojo)
            }
            (Some(mapping), None) => {
                let mut pojo = mapping.new_pojo();
                for item in items.iter().filter(|i| i.is_service_item()) {
                    mapping.write(&mut pojo, item.name(), item.value());
                }
                Some(pojo)
            }
            (None, pojo) => pojo,
        };

        let record = Arc::new_cyclic(|self_ref: &Weak<DataRecord>| {
            for item in &items {
                let weak = self_ref.clone();
                item.set_listener(Some(Arc::new(move |name: &str, _value: &ItemValue| {
                    if let Some(record) = weak.upgrade() {
                        record.item_value_changed(name);
                    }
                })));
            }
            DataRecord {
                id: NEXT_RECORD_ID.fetch_add(1, Ordering::Relaxed),
                definition,
                block,
                items,
                status: Mutex::new(RecordStatus::default()),
                base_record: Mutex::new(None),
                service_pojo: Mutex::new(pojo),
                listener: Mutex::new(None),
                self_ref: self_ref.clone(),
            }
        });
        tracing::trace!(target: targets::RECORD, record = record.id, block = %record.definition.name, "record created");
        Ok(record)
    }

    /// Process-unique identifier, for logging and diagnostics.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The definition of the block this record's items come from.
    pub fn definition(&self) -> &Arc<BlockDefinition> {
        &self.definition
    }

    /// Name of the block definition.
    pub fn block_name(&self) -> &str {
        &self.definition.name
    }

    /// The owning block, if the record was created by one that is still alive.
    pub fn block(&self) -> Option<Arc<DataBlock>> {
        self.block.upgrade()
    }

    /// Returns `true` if `block` created this record.
    pub fn belongs_to(&self, block: &DataBlock) -> bool {
        std::ptr::eq(self.block.as_ptr(), block)
    }

    /// Look up an item, ignoring case.
    pub fn item(&self, name: &str) -> Option<&DataItem> {
        self.items
            .iter()
            .find(|item| item.name().eq_ignore_ascii_case(name))
    }

    /// All items in definition order.
    pub fn items(&self) -> impl Iterator<Item = &DataItem> {
        self.items.iter()
    }

    /// Returns `true` if the record has an item with this name.
    pub fn contains_item(&self, name: &str) -> bool {
        self.item(name).is_some()
    }

    /// The value of `item_name`.
    pub fn value(&self, item_name: &str) -> Result<ItemValue> {
        self.item(item_name)
            .map(DataItem::value)
            .ok_or_else(|| Error::unknown_item(self.block_name(), item_name))
    }

    /// Write `value` into `item_name`.
    ///
    /// Fails with [`Error::UnknownItem`] or [`Error::TypeMismatch`]; the
    /// record is unchanged in both cases.
    pub fn set_value(&self, item_name: &str, value: impl Into<ItemValue>) -> Result<()> {
        let item = self
            .item(item_name)
            .ok_or_else(|| Error::unknown_item(self.block_name(), item_name))?;
        item.set_value(value.into())
    }

    fn item_value_changed(&self, item_name: &str) {
        let Some(item) = self.item(item_name) else {
            return;
        };

        if item.is_service_item() {
            if let Some(mapping) = self.definition.service() {
                if let Some(pojo) = self.service_pojo.lock().as_mut() {
                    mapping.write(pojo, item.name(), item.value());
                }
            }
            self.status.lock().changed = true;
        }

        let Some(me) = self.self_ref.upgrade() else {
            return;
        };
        let listener = self.listener.lock().as_ref().and_then(Weak::upgrade);
        match listener {
            Some(listener) => listener.data_item_changed(&me, item.name()),
            None => {
                if let Some(block) = self.block.upgrade() {
                    block.item_value_changed(&me, item.name());
                }
            }
        }
    }

    /// Install or remove the transient change listener.
    pub fn set_listener(&self, listener: Option<Weak<dyn RecordChangeListener>>) {
        *self.listener.lock() = listener;
    }

    /// Whether a live transient listener is installed.
    pub fn has_listener(&self) -> bool {
        self.listener
            .lock()
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Create a copy sharing this record's block and definition.
    ///
    /// The copy gets a fresh service object. Only values that differ from the
    /// copy's defaults are written, then the status flags are copied across.
    pub fn copy(&self) -> Result<RecordRef> {
        let copy = Self::build(self.definition.clone(), self.block.clone(), None)?;
        for item in &self.items {
            let value = item.value();
            if copy.value(item.name())? != value {
                copy.set_value(item.name(), value)?;
            }
        }
        *copy.status.lock() = self.status();
        Ok(copy)
    }

    /// Write every item value of this record into the same-named item of
    /// `target`, skipping items `target` lacks and values that are equal.
    ///
    /// Returns the number of items written.
    pub fn copy_values_to_record(&self, target: &DataRecord) -> Result<usize> {
        let mut written = 0;
        for item in &self.items {
            let Some(target_item) = target.item(item.name()) else {
                continue;
            };
            let value = item.value();
            if target_item.value() != value {
                target_item.set_value(value)?;
                written += 1;
            }
        }
        Ok(written)
    }

    /// Read a snapshot of the backing service object.
    ///
    /// `f` runs on a clone taken after the lock is released, so it may write
    /// to this record. Returns `None` if the record has no service object or
    /// it is not a `T`.
    pub fn with_service_pojo<T: Any + Clone, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let snapshot = self
            .service_pojo
            .lock()
            .as_ref()
            .and_then(|pojo| pojo.downcast_ref::<T>())
            .cloned()?;
        Some(f(&snapshot))
    }

    /// Replace the backing service object and load the service items from it.
    ///
    /// Loading is not an edit: no change is reported and `changed` is untouched.
    pub fn set_service_pojo(&self, pojo: ServicePojo) -> Result<()> {
        *self.service_pojo.lock() = Some(pojo);
        self.copy_values_from_service_pojo()
    }

    /// Reload every service item from the backing service object.
    pub fn copy_values_from_service_pojo(&self) -> Result<()> {
        let Some(mapping) = self.definition.service() else {
            return Ok(());
        };
        let pojo = self.service_pojo.lock();
        match pojo.as_ref() {
            Some(pojo) => load_from_pojo(mapping, pojo, &self.items),
            None => Ok(()),
        }
    }

    /// The record this one wraps, for edit-popup copies.
    pub fn base_record(&self) -> Option<RecordRef> {
        self.base_record.lock().clone()
    }

    /// Set or clear the wrapped base record.
    pub fn set_base_record(&self, base: Option<RecordRef>) {
        *self.base_record.lock() = base;
    }

    /// Returns `true` if `other` is this record or its base record.
    pub fn is_or_wraps(&self, other: &DataRecord) -> bool {
        std::ptr::eq(self, other)
            || self
                .base_record()
                .is_some_and(|base| std::ptr::eq(Arc::as_ptr(&base), other))
    }

    /// Snapshot of the status flags.
    pub fn status(&self) -> RecordStatus {
        *self.status.lock()
    }

    /// Set or clear the insert mark. Setting it clears the update mark.
    pub fn mark_for_insert(&self, insert: bool) {
        let mut status = self.status.lock();
        status.marked_for_insert = insert;
        if insert {
            status.marked_for_update = false;
        }
    }

    /// Set or clear the update mark. Setting it on an insert-marked record is a no-op.
    pub fn mark_for_update(&self, update: bool) {
        let mut status = self.status.lock();
        if update && status.marked_for_insert {
            return;
        }
        status.marked_for_update = update;
    }

    /// Set or clear the delete mark.
    pub fn mark_for_delete(&self, delete: bool) {
        self.status.lock().marked_for_delete = delete;
    }

    /// Set or clear the queried flag.
    pub fn mark_as_queried(&self, queried: bool) {
        self.status.lock().queried = queried;
    }

    /// Clear every mark and the changed flag and mark the record as queried.
    pub fn record_saved(&self) {
        *self.status.lock() = RecordStatus {
            queried: true,
            ..RecordStatus::default()
        };
    }

    /// Returns `true` if any persistence mark is set.
    pub fn is_dirty(&self) -> bool {
        self.status().is_dirty()
    }

    /// Returns `true` if the record was loaded from the data source or saved.
    pub fn is_marked_as_queried(&self) -> bool {
        self.status().queried
    }

    /// Returns `true` if the record awaits insertion.
    pub fn is_marked_for_insert(&self) -> bool {
        self.status().marked_for_insert
    }

    /// Returns `true` if the record awaits an update.
    pub fn is_marked_for_update(&self) -> bool {
        self.status().marked_for_update
    }

    /// Returns `true` if the record awaits deletion.
    pub fn is_marked_for_delete(&self) -> bool {
        self.status().marked_for_delete
    }

    /// Returns `true` if a service item was written since creation or the last save.
    pub fn is_changed(&self) -> bool {
        self.status().changed
    }
}

fn load_from_pojo(mapping: &ServiceMapping, pojo: &ServicePojo, items: &[DataItem]) -> Result<()> {
    for item in items.iter().filter(|i| i.is_service_item()) {
        if let Some(value) = mapping.read(pojo, item.name()) {
            item.load_value(value)?;
        }
    }
    Ok(())
}

impl fmt::Debug for DataRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataRecord")
            .field("id", &self.id)
            .field("block", &self.definition.name)
            .field("status", &self.status())
            .field("items", &self.items)
            .finish()
    }
}

static_assertions::assert_impl_all!(DataRecord: Send, Sync);
