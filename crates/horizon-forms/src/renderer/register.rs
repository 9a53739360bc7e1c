//! The binding object between one record and the widgets of one screen.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use horizon_forms_core::logging::{span_names, targets};
use horizon_forms_core::{ConnectionGuard, PerfSpan, Signal};
use parking_lot::Mutex;

use super::registry::RendererRegistry;
use super::traits::{ItemRenderer, ScreenItemListener};
use super::ScreenType;
use crate::action::Rejection;
use crate::data::{DataBlock, DataRecord, ItemValue, RecordChangeListener, RecordRef};
use crate::error::{Error, Result};

/// Whether a register is currently writing into its own widgets and record.
///
/// Widget change events that arrive while a programmatic write is in flight
/// were caused by that write and are suppressed, so they never re-enter
/// validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteState {
    /// Widget edits are validated and committed.
    #[default]
    Idle,
    /// The register is pushing values; widget edits are ignored.
    ApplyingProgrammaticWrite,
}

/// What happened to a widget edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The edit was validated and merged into the record.
    Committed,
    /// The action processor refused the edit; the record is unchanged and the
    /// widget is flagged invalid.
    Rejected(Rejection),
    /// The edit arrived during a programmatic write and was ignored.
    Suppressed,
    /// The widget value already equals the record value.
    Unchanged,
    /// No record is registered.
    NoRecord,
}

/// Restores the previous [`WriteState`] when dropped.
struct WriteGuard<'a> {
    state: &'a Mutex<WriteState>,
    previous: WriteState,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        *self.state.lock() = self.previous;
    }
}

/// Keeps one record synchronized with the widgets of one screen.
///
/// While a record is registered the register is the record's transient
/// change listener: every write to the record, from a widget or from code,
/// passes through [`data_item_changed`](RecordChangeListener::data_item_changed),
/// which pushes the new value into the widget. On the main screen the change
/// is then forwarded to the block, which owns the record's persistence state.
///
/// Widget edits go through [`screen_item_value_changed`](Self::screen_item_value_changed):
/// the edit is applied to a copy of the record, the copy is validated, and
/// only an accepted copy is merged into the record.
///
/// Every register also follows the block's `item_value_changed` signal, so a
/// record edited through another screen is refreshed here too. A register
/// showing a popup copy takes the new value of its base record into the copy.
pub struct RendererRegister {
    screen: ScreenType,
    block: Arc<DataBlock>,
    renderers: Vec<Arc<dyn ItemRenderer>>,
    record: Mutex<Option<RecordRef>>,
    write_state: Mutex<WriteState>,
    changed: AtomicBool,
    item_committed: Signal<(RecordRef, String)>,
    _block_item_changed: ConnectionGuard,
    self_ref: Weak<RendererRegister>,
}

impl RendererRegister {
    /// Build the widgets of `screen` for `block` through `registry`.
    ///
    /// Each widget gets its visibility, edit permission and mandatory flag
    /// from the screen definition, and reports back to the new register.
    pub fn new(
        block: Arc<DataBlock>,
        screen: ScreenType,
        registry: &RendererRegistry,
    ) -> Result<Arc<Self>> {
        let definition = block.definition().clone();
        let renderers = definition
            .screen(screen)
            .iter()
            .map(|screen_item| {
                let item = definition
                    .item(&screen_item.item)
                    .ok_or_else(|| Error::unknown_item(&definition.name, &screen_item.item))?;
                let renderer = registry.create(item, screen_item)?;
                renderer.set_visible(screen_item.visible);
                renderer.set_edit_allowed(screen_item.edit_allowed);
                renderer.set_mandatory(screen_item.mandatory);
                Ok(renderer)
            })
            .collect::<Result<Vec<_>>>()?;

        let register = Arc::new_cyclic(|self_ref: &Weak<RendererRegister>| {
            let weak = self_ref.clone();
            let block_item_changed =
                block
                    .signals()
                    .item_value_changed
                    .connect_scoped(move |(record, item_name): &(RecordRef, String)| {
                        if let Some(register) = weak.upgrade() {
                            register.block_item_changed(record, item_name);
                        }
                    });
            Self {
                screen,
                block,
                renderers,
                record: Mutex::new(None),
                write_state: Mutex::new(WriteState::Idle),
                changed: AtomicBool::new(false),
                item_committed: Signal::new(),
                _block_item_changed: block_item_changed,
                self_ref: self_ref.clone(),
            }
        });

        for renderer in &register.renderers {
            let listener: Weak<dyn ScreenItemListener> = register.self_ref.clone();
            renderer.set_listener(Some(listener));
        }
        tracing::debug!(
            target: targets::REGISTER,
            block = %register.block.name(),
            screen = %screen,
            renderers = register.renderers.len(),
            "register created"
        );
        Ok(register)
    }

    /// The screen this register serves.
    pub fn screen(&self) -> ScreenType {
        self.screen
    }

    /// The block whose records this register shows.
    pub fn block(&self) -> &Arc<DataBlock> {
        &self.block
    }

    /// The widgets in screen order.
    pub fn renderers(&self) -> &[Arc<dyn ItemRenderer>] {
        &self.renderers
    }

    /// The widget showing `item_name`, ignoring case.
    pub fn renderer(&self, item_name: &str) -> Option<&Arc<dyn ItemRenderer>> {
        self.renderers
            .iter()
            .find(|renderer| renderer.item_name().eq_ignore_ascii_case(item_name))
    }

    /// The current write state.
    pub fn write_state(&self) -> WriteState {
        *self.write_state.lock()
    }

    /// Returns `true` if an edit was committed since the record was registered.
    pub fn is_changed(&self) -> bool {
        self.changed.load(Ordering::SeqCst)
    }

    /// Fired after each validated edit is merged. Args: (record, item name).
    pub fn item_committed(&self) -> &Signal<(RecordRef, String)> {
        &self.item_committed
    }

    fn begin_programmatic_write(&self) -> WriteGuard<'_> {
        let previous = std::mem::replace(
            &mut *self.write_state.lock(),
            WriteState::ApplyingProgrammaticWrite,
        );
        WriteGuard {
            state: &self.write_state,
            previous,
        }
    }

    /// The registered record, without reconciling widgets.
    pub(crate) fn current_record(&self) -> Option<RecordRef> {
        self.record.lock().clone()
    }

    fn clear_renderers(&self) {
        let _guard = self.begin_programmatic_write();
        for renderer in &self.renderers {
            renderer.set_initial_value(ItemValue::Null);
            renderer.validation_error_occurred(false);
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Show `record` in the widgets.
    ///
    /// The previous record's listener is detached and every widget cleared
    /// before the new values are pushed; the register attaches itself to
    /// `record` only afterwards, so clearing never writes into it.
    #[tracing::instrument(skip_all, target = "horizon_forms::register", level = "trace")]
    pub fn register(&self, record: RecordRef) {
        let _span = PerfSpan::new(span_names::REGISTER);

        if let Some(previous) = self.record.lock().take() {
            previous.set_listener(None);
        }
        self.clear_renderers();

        *self.record.lock() = Some(record.clone());
        self.refresh_after_change(&record);

        let listener: Weak<dyn RecordChangeListener> = self.self_ref.clone();
        record.set_listener(Some(listener));
        self.changed.store(false, Ordering::SeqCst);

        tracing::debug!(
            target: targets::REGISTER,
            block = %self.block.name(),
            screen = %self.screen,
            record = record.id(),
            "record registered"
        );
    }

    /// Push the values of `record` into the widgets as initial values.
    ///
    /// Does nothing unless `record` is the registered record or the record it
    /// wraps.
    pub fn refresh_after_change(&self, record: &DataRecord) {
        let Some(current) = self.current_record() else {
            return;
        };
        if !current.is_or_wraps(record) {
            tracing::trace!(
                target: targets::REGISTER,
                registered = current.id(),
                record = record.id(),
                "ignoring refresh for another record"
            );
            return;
        }

        let _guard = self.begin_programmatic_write();
        for renderer in &self.renderers {
            if let Some(item) = record.item(renderer.item_name()) {
                renderer.set_initial_value(item.value());
            }
        }
    }

    /// A live record of the block changed, possibly through another register.
    fn block_item_changed(&self, changed: &RecordRef, item_name: &str) {
        let Some(current) = self.current_record() else {
            return;
        };
        let Ok(value) = changed.value(item_name) else {
            return;
        };

        let _guard = self.begin_programmatic_write();
        if Arc::ptr_eq(&current, changed) {
            if let Some(renderer) = self.renderer(item_name) {
                renderer.set_initial_value(value);
            }
            return;
        }
        let wraps_changed = current
            .base_record()
            .is_some_and(|base| Arc::ptr_eq(&base, changed));
        if !wraps_changed {
            return;
        }
        tracing::trace!(
            target: targets::REGISTER,
            record = current.id(),
            base = changed.id(),
            item = item_name,
            "following change of base record"
        );
        // The copy reports the write back through data_item_changed.
        if let Err(err) = current.set_value(item_name, value) {
            tracing::warn!(target: targets::REGISTER, item = item_name, %err, "base change not taken over");
        }
    }

    /// The registered record, after syncing widgets that changed silently.
    ///
    /// Any widget whose value differs from the record is treated as an edit
    /// and goes through validation before the record is returned.
    pub fn registered_record(&self) -> Option<RecordRef> {
        let record = self.current_record()?;
        for renderer in &self.renderers {
            let Ok(stored) = record.value(renderer.item_name()) else {
                continue;
            };
            let shown = renderer.value();
            if shown == stored {
                continue;
            }
            tracing::debug!(
                target: targets::REGISTER,
                item = renderer.item_name(),
                %shown,
                %stored,
                "reconciling widget that changed without notice"
            );
            if let Err(err) = self.screen_item_value_changed(renderer.item_name(), shown) {
                tracing::warn!(target: targets::REGISTER, item = renderer.item_name(), %err, "reconciliation failed");
            }
        }
        Some(record)
    }

    /// Detach from the record, clear the widgets and reset the changed flag.
    pub fn reset_register(&self) {
        if let Some(previous) = self.record.lock().take() {
            previous.set_listener(None);
        }
        self.clear_renderers();
        self.changed.store(false, Ordering::SeqCst);
        tracing::trace!(target: targets::REGISTER, block = %self.block.name(), screen = %self.screen, "register reset");
    }

    // =========================================================================
    // Edits
    // =========================================================================

    /// Handle a widget edit of `item_name`.
    ///
    /// Validation failures are reported as [`EditOutcome::Rejected`] and
    /// through the widget's invalid flag. Unknown items and type mismatches
    /// are errors; the record is unchanged in every case but
    /// [`EditOutcome::Committed`].
    #[tracing::instrument(skip_all, target = "horizon_forms::register", level = "trace", fields(item = item_name))]
    pub fn screen_item_value_changed(&self, item_name: &str, value: ItemValue) -> Result<EditOutcome> {
        if self.write_state() == WriteState::ApplyingProgrammaticWrite {
            tracing::trace!(target: targets::REGISTER, item = item_name, "suppressing edit during programmatic write");
            return Ok(EditOutcome::Suppressed);
        }
        let _span = PerfSpan::new(span_names::SCREEN_EDIT);
        let Some(record) = self.current_record() else {
            return Ok(EditOutcome::NoRecord);
        };
        if record.value(item_name)? == value {
            return Ok(EditOutcome::Unchanged);
        }

        let candidate = record.copy()?;
        candidate.set_value(item_name, value)?;

        let verdict = self
            .block
            .processor()
            .validate_item(&candidate, item_name, self.screen);
        let renderer = self.renderer(item_name);
        if let Err(rejection) = verdict {
            tracing::debug!(
                target: targets::REGISTER,
                item = item_name,
                %rejection,
                "edit rejected"
            );
            if let Some(renderer) = renderer {
                renderer.validation_error_occurred(true);
            }
            return Ok(EditOutcome::Rejected(rejection));
        }

        if let Some(renderer) = renderer {
            renderer.validation_error_occurred(false);
        }
        {
            let _guard = self.begin_programmatic_write();
            candidate.copy_values_to_record(&record)?;
        }
        self.changed.store(true, Ordering::SeqCst);

        let item_name = record
            .item(item_name)
            .map_or_else(|| item_name.to_string(), |item| item.name().to_string());
        tracing::trace!(target: targets::REGISTER, record = record.id(), item = %item_name, "edit committed");
        self.item_committed.emit((record, item_name));
        Ok(EditOutcome::Committed)
    }

    /// Set an item as if the user had edited its widget.
    ///
    /// Items without a widget on this screen are written to the record directly.
    pub fn set_item_value(&self, item_name: &str, value: impl Into<ItemValue>) -> Result<()> {
        let value = value.into();
        match self.renderer(item_name) {
            Some(renderer) => renderer.set_value(value),
            None => {
                if let Some(record) = self.current_record() {
                    record.set_value(item_name, value)?;
                }
            }
        }
        Ok(())
    }

    /// Write an item into the record and its widget without validation.
    ///
    /// Widget change events caused by the write are suppressed.
    pub fn set_item_value_no_validate(
        &self,
        item_name: &str,
        value: impl Into<ItemValue>,
    ) -> Result<()> {
        let Some(record) = self.current_record() else {
            return Ok(());
        };
        let value = value.into();

        let _guard = self.begin_programmatic_write();
        record.set_value(item_name, value.clone())?;
        if let Some(renderer) = self.renderer(item_name) {
            renderer.set_initial_value(value);
        }
        Ok(())
    }
}

impl ScreenItemListener for RendererRegister {
    fn item_value_changed(&self, item_name: &str, value: ItemValue) {
        if let Err(err) = self.screen_item_value_changed(item_name, value) {
            tracing::warn!(target: targets::REGISTER, item = item_name, %err, "widget edit failed");
        }
    }

    fn focus_gained(&self, _item_name: &str) {
        self.block.renderer_focus_gained();
    }

    fn focus_lost(&self, _item_name: &str) {
        self.block.renderer_focus_lost();
    }
}

impl RecordChangeListener for RendererRegister {
    fn data_item_changed(&self, record: &RecordRef, item_name: &str) {
        let is_registered = self
            .current_record()
            .is_some_and(|current| Arc::ptr_eq(&current, record));
        if !is_registered {
            return;
        }

        if let (Some(renderer), Ok(value)) = (self.renderer(item_name), record.value(item_name)) {
            let _guard = self.begin_programmatic_write();
            renderer.set_initial_value(value);
        }
        if self.screen == ScreenType::Main {
            self.block.item_value_changed(record, item_name);
        }
    }
}

impl std::fmt::Debug for RendererRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererRegister")
            .field("block", &self.block.name())
            .field("screen", &self.screen)
            .field("renderers", &self.renderers.len())
            .field("record", &self.current_record().map(|r| r.id()))
            .field("write_state", &self.write_state())
            .finish()
    }
}

static_assertions::assert_impl_all!(RendererRegister: Send, Sync);
