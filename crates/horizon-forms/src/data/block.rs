//! Blocks: the ordered set of records of one data source and their pending changes.

use std::sync::{Arc, Weak};

use horizon_forms_core::logging::{span_names, targets};
use horizon_forms_core::{PerfSpan, Signal};
use parking_lot::RwLock;

use super::record::{DataRecord, RecordRef};
use crate::action::{ActionProcessor, DefaultActionProcessor};
use crate::definition::{BlockDefinition, ServicePojo};
use crate::error::{Error, Result};

/// Signals emitted by a [`DataBlock`].
///
/// Slots run synchronously after the block has released its internal lock,
/// so they may call back into the block.
pub struct BlockSignals {
    /// A live record's item was written. Args: (record, item name).
    pub item_value_changed: Signal<(RecordRef, String)>,
    /// A user-created record was inserted into the live list.
    pub record_created: Signal<RecordRef>,
    /// A record was removed from the live list.
    pub record_deleted: Signal<RecordRef>,
    /// The block's dirty flag flipped.
    pub dirty_changed: Signal<bool>,
    /// The live list was cleared. Arg: whether pending changes were discarded too.
    pub block_cleared: Signal<bool>,
    /// Pending changes were persisted and cleared.
    pub block_saved: Signal<()>,
    /// A renderer of this block gained (`true`) or lost (`false`) focus.
    pub focus_changed: Signal<bool>,
}

impl BlockSignals {
    /// Create a new set of block signals.
    pub fn new() -> Self {
        Self {
            item_value_changed: Signal::new(),
            record_created: Signal::new(),
            record_deleted: Signal::new(),
            dirty_changed: Signal::new(),
            block_cleared: Signal::new(),
            block_saved: Signal::new(),
            focus_changed: Signal::new(),
        }
    }
}

impl Default for BlockSignals {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct BlockState {
    records: Vec<RecordRef>,
    inserted: Vec<RecordRef>,
    updated: Vec<RecordRef>,
    deleted: Vec<RecordRef>,
    dirty: bool,
    has_focus: bool,
}

impl BlockState {
    fn position(list: &[RecordRef], record: &DataRecord) -> Option<usize> {
        list.iter()
            .position(|r| std::ptr::eq(Arc::as_ptr(r), record))
    }

    fn remove(list: &mut Vec<RecordRef>, record: &DataRecord) -> bool {
        match Self::position(list, record) {
            Some(index) => {
                list.remove(index);
                true
            }
            None => false,
        }
    }

    /// Re-derive `dirty`, returning the new value if it flipped.
    fn update_dirty(&mut self) -> Option<bool> {
        let dirty =
            !self.inserted.is_empty() || !self.updated.is_empty() || !self.deleted.is_empty();
        let flipped = dirty != self.dirty;
        self.dirty = dirty;
        self.check_invariants();
        flipped.then_some(dirty)
    }

    fn check_invariants(&self) {
        debug_assert!(
            self.records
                .iter()
                .all(|r| Self::position(&self.deleted, r).is_none()),
            "live record is also in the deleted list"
        );
        debug_assert!(
            self.inserted
                .iter()
                .all(|r| Self::position(&self.updated, r).is_none()),
            "record is both inserted and updated"
        );
        debug_assert!(
            self.inserted
                .iter()
                .chain(&self.updated)
                .all(|r| !(r.is_marked_for_insert() && r.is_marked_for_update())),
            "record marked for insert and update"
        );
    }
}

/// The in-memory record set of one block.
///
/// The block owns the live record list (the current view) and the inserted,
/// updated and deleted lists collected since the last save. The dirty flag is
/// re-derived from the three change lists after every mutation.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use horizon_forms::data::{DataBlock, DataType};
/// use horizon_forms::definition::{BlockDefinition, ItemDefinition};
///
/// let definition = BlockDefinition::new("emp")
///     .with_item(ItemDefinition::new("name", DataType::String));
/// let block = DataBlock::new(Arc::new(definition));
///
/// let record = block.create_record().unwrap();
/// block.record_created(record.clone(), None).unwrap();
/// assert!(block.is_dirty());
///
/// block.record_deleted(&record).unwrap();
/// assert!(!block.is_dirty());
/// ```
pub struct DataBlock {
    definition: Arc<BlockDefinition>,
    processor: Arc<dyn ActionProcessor>,
    state: RwLock<BlockState>,
    signals: BlockSignals,
    self_ref: Weak<DataBlock>,
}

impl DataBlock {
    /// Create an empty block that accepts every lifecycle transition.
    pub fn new(definition: Arc<BlockDefinition>) -> Arc<Self> {
        Self::with_processor(definition, Arc::new(DefaultActionProcessor))
    }

    /// Create an empty block whose lifecycle hooks go to `processor`.
    pub fn with_processor(
        definition: Arc<BlockDefinition>,
        processor: Arc<dyn ActionProcessor>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            definition,
            processor,
            state: RwLock::new(BlockState::default()),
            signals: BlockSignals::new(),
            self_ref: self_ref.clone(),
        })
    }

    /// The block name.
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// The block definition.
    pub fn definition(&self) -> &Arc<BlockDefinition> {
        &self.definition
    }

    /// The action processor shared with this block's registers.
    pub fn processor(&self) -> &Arc<dyn ActionProcessor> {
        &self.processor
    }

    /// The block's signals.
    pub fn signals(&self) -> &BlockSignals {
        &self.signals
    }

    // =========================================================================
    // Record creation
    // =========================================================================

    /// Create a record owned by this block, holding the defined defaults.
    ///
    /// The record is not live until it is passed to
    /// [`record_created`](Self::record_created) or
    /// [`add_queried_record`](Self::add_queried_record).
    pub fn create_record(&self) -> Result<RecordRef> {
        DataRecord::build(self.definition.clone(), self.self_ref.clone(), None)
    }

    /// Append a record loaded from the data source and mark it as queried.
    ///
    /// Does not affect the dirty state. If the `post_query` hook rejects the
    /// record it is removed again and the rejection is returned.
    ///
    /// Fails with [`Error::ForeignRecord`] unless the record was created by
    /// this block.
    #[tracing::instrument(skip_all, target = "horizon_forms::block", level = "trace")]
    pub fn add_queried_record(&self, record: RecordRef) -> Result<()> {
        self.check_owned(&record)?;
        record.mark_as_queried(true);
        self.state.write().records.push(record.clone());

        if let Err(rejection) = self.processor.post_query(self, &record) {
            BlockState::remove(&mut self.state.write().records, &record);
            tracing::debug!(target: targets::BLOCK, block = %self.name(), %rejection, "post-query rejected record");
            return Err(rejection.into());
        }
        tracing::trace!(target: targets::BLOCK, block = %self.name(), record = record.id(), "queried record added");
        Ok(())
    }

    /// Wrap a backing object returned by a query in a new record and append it.
    pub fn add_queried_pojo(&self, pojo: ServicePojo) -> Result<RecordRef> {
        let record = DataRecord::build(self.definition.clone(), self.self_ref.clone(), Some(pojo))?;
        self.add_queried_record(record.clone())?;
        Ok(record)
    }

    /// Insert a user-created record into the live list and mark it for insert.
    ///
    /// Without an anchor, or when the anchor is not live, the record goes to
    /// the front of the list; otherwise immediately after the anchor.
    ///
    /// Fails with [`Error::ForeignRecord`] unless the record was created by
    /// this block.
    #[tracing::instrument(skip_all, target = "horizon_forms::block", level = "trace")]
    pub fn record_created(&self, record: RecordRef, anchor: Option<&RecordRef>) -> Result<()> {
        self.check_owned(&record)?;
        self.processor.when_create_record(self, &record)?;

        record.mark_for_insert(true);
        let (index, dirty) = {
            let mut state = self.state.write();
            let index = anchor
                .and_then(|anchor| BlockState::position(&state.records, anchor))
                .map_or(0, |position| position + 1);
            state.records.insert(index, record.clone());
            state.inserted.push(record.clone());
            (index, state.update_dirty())
        };

        tracing::debug!(target: targets::BLOCK, block = %self.name(), record = record.id(), index, "record created");
        self.signals.record_created.emit(record);
        self.emit_dirty(dirty);
        Ok(())
    }

    // =========================================================================
    // Change tracking
    // =========================================================================

    /// Remove a live record.
    ///
    /// An insert-pending record is discarded outright. A persisted record is
    /// moved to the deleted list and marked for delete, leaving the updated
    /// list if it was there.
    ///
    /// Fails with [`Error::NotInBlock`] if the record is not live, or with
    /// [`Error::ActionRejected`] if the `pre_delete` hook vetoes.
    #[tracing::instrument(skip_all, target = "horizon_forms::block", level = "trace")]
    pub fn record_deleted(&self, record: &RecordRef) -> Result<()> {
        if !self.contains(record) {
            return Err(self.not_in_block(record));
        }
        self.processor.pre_delete(self, record)?;

        let dirty = {
            let mut state = self.state.write();
            if !BlockState::remove(&mut state.records, record) {
                return Err(self.not_in_block(record));
            }
            if record.is_marked_for_insert() {
                BlockState::remove(&mut state.inserted, record);
                record.mark_for_insert(false);
            } else {
                if record.is_marked_for_update() {
                    BlockState::remove(&mut state.updated, record);
                    record.mark_for_update(false);
                }
                record.mark_for_delete(true);
                state.deleted.push(record.clone());
            }
            state.update_dirty()
        };

        tracing::debug!(target: targets::BLOCK, block = %self.name(), record = record.id(), "record deleted");
        self.signals.record_deleted.emit(record.clone());
        self.emit_dirty(dirty);
        Ok(())
    }

    /// Mark a persisted record for update. Insert-pending records are left alone.
    ///
    /// Idempotent: the record is listed at most once.
    pub fn record_updated(&self, record: &RecordRef) {
        if record.is_marked_for_insert() {
            return;
        }
        record.mark_for_update(true);

        let dirty = {
            let mut state = self.state.write();
            if BlockState::position(&state.updated, record).is_none() {
                state.updated.push(record.clone());
            }
            state.update_dirty()
        };

        tracing::trace!(target: targets::BLOCK, block = %self.name(), record = record.id(), "record updated");
        self.emit_dirty(dirty);
    }

    /// Called by records (directly or through a main screen register) after an item write.
    ///
    /// Writes to records that are not live, such as edit-popup copies, are
    /// ignored. A write to a service item marks the record for update.
    pub fn item_value_changed(&self, record: &RecordRef, item_name: &str) {
        if !self.contains(record) {
            tracing::trace!(target: targets::BLOCK, block = %self.name(), record = record.id(), item = item_name, "ignoring change of non-live record");
            return;
        }

        if record.item(item_name).is_some_and(|item| item.is_service_item()) {
            self.record_updated(record);
        }
        self.signals
            .item_value_changed
            .emit((record.clone(), item_name.to_string()));
    }

    /// Empty the live list, and the change lists too if `clear_changes` is set.
    pub fn clear_block(&self, clear_changes: bool) {
        let dirty = {
            let mut state = self.state.write();
            state.records.clear();
            if clear_changes {
                state.inserted.clear();
                state.updated.clear();
                state.deleted.clear();
            }
            state.update_dirty()
        };

        tracing::debug!(target: targets::BLOCK, block = %self.name(), clear_changes, "block cleared");
        self.signals.block_cleared.emit(clear_changes);
        self.emit_dirty(dirty);
    }

    /// Record that pending changes were persisted.
    ///
    /// Inserted and updated records become queried, deleted records are
    /// dropped, and the change lists and dirty flag are cleared.
    pub fn block_saved(&self) {
        let _span = PerfSpan::new(span_names::BLOCK_SAVE);

        let (saved, dirty) = {
            let mut state = self.state.write();
            let mut saved: Vec<RecordRef> = state.inserted.drain(..).collect();
            saved.append(&mut state.updated);
            state.deleted.clear();
            (saved, state.update_dirty())
        };
        for record in &saved {
            record.record_saved();
        }

        tracing::debug!(target: targets::BLOCK, block = %self.name(), saved = saved.len(), "block saved");
        self.processor.post_block_saved(self);
        self.signals.block_saved.emit(());
        self.emit_dirty(dirty);
    }

    fn emit_dirty(&self, flipped: Option<bool>) {
        if let Some(dirty) = flipped {
            self.signals.dirty_changed.emit(dirty);
        }
    }

    fn check_owned(&self, record: &DataRecord) -> Result<()> {
        if record.belongs_to(self) {
            return Ok(());
        }
        tracing::warn!(target: targets::BLOCK, block = %self.name(), record = record.id(), "refusing record of another block");
        Err(Error::ForeignRecord {
            block: self.name().to_string(),
            record: record.id(),
        })
    }

    fn not_in_block(&self, record: &DataRecord) -> Error {
        Error::NotInBlock {
            block: self.name().to_string(),
            record: record.id(),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns `true` if the block has pending changes.
    pub fn is_dirty(&self) -> bool {
        self.state.read().dirty
    }

    /// Snapshot of the live records in display order.
    pub fn records(&self) -> Vec<RecordRef> {
        self.state.read().records.clone()
    }

    /// Records created since the last save.
    pub fn inserted_records(&self) -> Vec<RecordRef> {
        self.state.read().inserted.clone()
    }

    /// Persisted records edited since the last save.
    pub fn updated_records(&self) -> Vec<RecordRef> {
        self.state.read().updated.clone()
    }

    /// Persisted records deleted since the last save.
    pub fn deleted_records(&self) -> Vec<RecordRef> {
        self.state.read().deleted.clone()
    }

    /// Number of live records.
    pub fn record_count(&self) -> usize {
        self.state.read().records.len()
    }

    /// The live record at `index`.
    pub fn record_at(&self, index: usize) -> Option<RecordRef> {
        self.state.read().records.get(index).cloned()
    }

    /// Position of `record` in the live list.
    pub fn index_of(&self, record: &DataRecord) -> Option<usize> {
        BlockState::position(&self.state.read().records, record)
    }

    /// Returns `true` if `record` is live in this block.
    pub fn contains(&self, record: &DataRecord) -> bool {
        self.index_of(record).is_some()
    }

    /// The first live record.
    pub fn first_record(&self) -> Option<RecordRef> {
        self.state.read().records.first().cloned()
    }

    /// The last live record.
    pub fn last_record(&self) -> Option<RecordRef> {
        self.state.read().records.last().cloned()
    }

    /// The live record before `record`, `None` at the front.
    pub fn record_before(&self, record: &DataRecord) -> Result<Option<RecordRef>> {
        let state = self.state.read();
        let index = BlockState::position(&state.records, record)
            .ok_or_else(|| self.not_in_block(record))?;
        Ok(index.checked_sub(1).map(|i| state.records[i].clone()))
    }

    /// The live record after `record`, `None` at the back.
    pub fn record_after(&self, record: &DataRecord) -> Result<Option<RecordRef>> {
        let state = self.state.read();
        let index = BlockState::position(&state.records, record)
            .ok_or_else(|| self.not_in_block(record))?;
        Ok(state.records.get(index + 1).cloned())
    }

    // =========================================================================
    // Renderer focus
    // =========================================================================

    /// A renderer showing this block gained focus.
    pub fn renderer_focus_gained(&self) {
        self.set_focus(true);
    }

    /// A renderer showing this block lost focus.
    pub fn renderer_focus_lost(&self) {
        self.set_focus(false);
    }

    /// Whether one of this block's renderers holds focus.
    pub fn has_renderer_focus(&self) -> bool {
        self.state.read().has_focus
    }

    fn set_focus(&self, focus: bool) {
        let changed = {
            let mut state = self.state.write();
            let changed = state.has_focus != focus;
            state.has_focus = focus;
            changed
        };
        if changed {
            tracing::trace!(target: targets::BLOCK, block = %self.name(), focus, "renderer focus changed");
            self.signals.focus_changed.emit(focus);
        }
    }
}

impl std::fmt::Debug for DataBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("DataBlock")
            .field("name", &self.definition.name)
            .field("records", &state.records.len())
            .field("inserted", &state.inserted.len())
            .field("updated", &state.updated.len())
            .field("deleted", &state.deleted.len())
            .field("dirty", &state.dirty)
            .finish()
    }
}

static_assertions::assert_impl_all!(DataBlock: Send, Sync);
