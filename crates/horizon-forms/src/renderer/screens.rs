//! Screen registers: what each screen does with the record it shows.

use std::sync::Arc;

use horizon_forms_core::ConnectionGuard;
use horizon_forms_core::logging::targets;

use super::register::RendererRegister;
use super::registry::RendererRegistry;
use super::ScreenType;
use crate::data::{DataBlock, DataRecord, RecordRef};
use crate::error::{Error, Result};

// ============================================================================
// Main screen
// ============================================================================

/// Shows the live records of a block, one at a time.
///
/// Edits of the shown record are forwarded to the block. When the shown
/// record is deleted, or the block is cleared, the register empties itself.
pub struct MainScreenRegister {
    register: Arc<RendererRegister>,
    _record_deleted: ConnectionGuard,
    _block_cleared: ConnectionGuard,
}

impl MainScreenRegister {
    /// Build the main screen widgets of `block`.
    pub fn new(block: Arc<DataBlock>, registry: &RendererRegistry) -> Result<Self> {
        let register = RendererRegister::new(block.clone(), ScreenType::Main, registry)?;

        let weak = Arc::downgrade(&register);
        let record_deleted = block.signals().record_deleted.connect_scoped(move |record| {
            if let Some(register) = weak.upgrade() {
                let shown = register.current_record();
                if shown.is_some_and(|shown| Arc::ptr_eq(&shown, record)) {
                    register.reset_register();
                }
            }
        });
        let weak = Arc::downgrade(&register);
        let block_cleared = block.signals().block_cleared.connect_scoped(move |_| {
            if let Some(register) = weak.upgrade() {
                register.reset_register();
            }
        });

        Ok(Self {
            register,
            _record_deleted: record_deleted,
            _block_cleared: block_cleared,
        })
    }

    /// The underlying register.
    pub fn register(&self) -> &Arc<RendererRegister> {
        &self.register
    }

    /// Show a live record of the block.
    ///
    /// Fails with [`Error::NotInBlock`] if the record is not live.
    pub fn show(&self, record: &RecordRef) -> Result<()> {
        let block = self.register.block();
        if !block.contains(record) {
            return Err(Error::NotInBlock {
                block: block.name().to_string(),
                record: record.id(),
            });
        }
        self.register.register(record.clone());
        Ok(())
    }

    /// Show the first live record. Returns it, or `None` if the block is empty.
    pub fn show_first(&self) -> Option<RecordRef> {
        let record = self.register.block().first_record()?;
        self.register.register(record.clone());
        Some(record)
    }

    /// Show the record after the current one. Stays put at the end.
    pub fn next_record(&self) -> Result<Option<RecordRef>> {
        self.navigate(|block, current| block.record_after(current))
    }

    /// Show the record before the current one. Stays put at the front.
    pub fn previous_record(&self) -> Result<Option<RecordRef>> {
        self.navigate(|block, current| block.record_before(current))
    }

    fn navigate<F>(&self, step: F) -> Result<Option<RecordRef>>
    where
        F: FnOnce(&DataBlock, &DataRecord) -> Result<Option<RecordRef>>,
    {
        let Some(current) = self.register.registered_record() else {
            return Ok(None);
        };
        let next = step(self.register.block().as_ref(), current.as_ref())?;
        if let Some(record) = &next {
            self.register.register(record.clone());
        }
        Ok(next)
    }
}

// ============================================================================
// Insert screen
// ============================================================================

/// Edits a new record and hands it to the block on [`insert`](Self::insert).
pub struct InsertScreenRegister {
    register: Arc<RendererRegister>,
}

impl InsertScreenRegister {
    /// Build the insert screen widgets of `block`.
    pub fn new(block: Arc<DataBlock>, registry: &RendererRegistry) -> Result<Self> {
        Ok(Self {
            register: RendererRegister::new(block, ScreenType::Insert, registry)?,
        })
    }

    /// The underlying register.
    pub fn register(&self) -> &Arc<RendererRegister> {
        &self.register
    }

    /// Start editing a fresh record holding the defined defaults.
    pub fn open(&self) -> Result<RecordRef> {
        let record = self.register.block().create_record()?;
        self.register.register(record.clone());
        Ok(record)
    }

    /// Insert the edited record into the block after `anchor` and close the screen.
    ///
    /// Returns `None` if no record is open. If the block vetoes the insert
    /// the record stays open.
    pub fn insert(&self, anchor: Option<&RecordRef>) -> Result<Option<RecordRef>> {
        let Some(record) = self.register.registered_record() else {
            return Ok(None);
        };
        self.register.block().record_created(record.clone(), anchor)?;
        self.register.reset_register();
        tracing::debug!(target: targets::REGISTER, record = record.id(), "record inserted from insert screen");
        Ok(Some(record))
    }

    /// Discard the edited record.
    pub fn cancel(&self) {
        self.register.reset_register();
    }
}

// ============================================================================
// Update screen
// ============================================================================

/// Edits a copy of a record and merges it back on [`commit`](Self::commit).
///
/// The base record is untouched until the commit, so the popup can be
/// cancelled without side effects. Changes made to the base elsewhere while
/// the popup is open are taken over into the copy.
pub struct UpdateScreenRegister {
    register: Arc<RendererRegister>,
}

impl UpdateScreenRegister {
    /// Build the update screen widgets of `block`.
    pub fn new(block: Arc<DataBlock>, registry: &RendererRegistry) -> Result<Self> {
        Ok(Self {
            register: RendererRegister::new(block, ScreenType::Update, registry)?,
        })
    }

    /// The underlying register.
    pub fn register(&self) -> &Arc<RendererRegister> {
        &self.register
    }

    /// Start editing a copy of `base`.
    pub fn open(&self, base: &RecordRef) -> Result<RecordRef> {
        let copy = base.copy()?;
        copy.set_base_record(Some(base.clone()));
        self.register.register(copy.clone());
        Ok(copy)
    }

    /// Merge the edited copy into its base and close the screen.
    ///
    /// Returns the number of items written into the base.
    pub fn commit(&self) -> Result<usize> {
        let Some(copy) = self.register.registered_record() else {
            return Ok(0);
        };
        let written = match copy.base_record() {
            Some(base) => copy.copy_values_to_record(&base)?,
            None => 0,
        };
        self.register.reset_register();
        tracing::debug!(target: targets::REGISTER, record = copy.id(), written, "update screen committed");
        Ok(written)
    }

    /// Discard the edited copy.
    pub fn cancel(&self) {
        self.register.reset_register();
    }
}

// ============================================================================
// Query screen
// ============================================================================

/// Edits query criteria.
///
/// The criteria record belongs to no block, so edits never dirty anything.
pub struct QueryScreenRegister {
    register: Arc<RendererRegister>,
}

impl QueryScreenRegister {
    /// Build the query screen widgets of `block`.
    pub fn new(block: Arc<DataBlock>, registry: &RendererRegistry) -> Result<Self> {
        Ok(Self {
            register: RendererRegister::new(block, ScreenType::Query, registry)?,
        })
    }

    /// The underlying register.
    pub fn register(&self) -> &Arc<RendererRegister> {
        &self.register
    }

    /// Start entering criteria into an empty record.
    pub fn open(&self) -> Result<RecordRef> {
        let criteria = DataRecord::new(self.register.block().definition().clone())?;
        self.register.register(criteria.clone());
        Ok(criteria)
    }

    /// The entered criteria, or `None` if the screen is not open.
    pub fn criteria(&self) -> Option<RecordRef> {
        self.register.registered_record()
    }

    /// Close the screen.
    pub fn close(&self) {
        self.register.reset_register();
    }
}
