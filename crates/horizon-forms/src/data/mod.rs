//! The data layer: items, records, blocks and the form that owns them.
//!
//! Ownership runs downward: a [`DataForm`] owns its blocks, a [`DataBlock`]
//! owns its records, a [`DataRecord`] owns its items. Notifications run
//! upward through back-references that never keep their target alive:
//!
//! - an item reports each write to its record through a single listener slot;
//! - a record reports to its transient [`RecordChangeListener`] if one is
//!   installed, otherwise to its block;
//! - a block announces changes to any number of observers through
//!   [`BlockSignals`].

mod block;
mod form;
mod item;
mod record;
mod value;

pub use block::{BlockSignals, DataBlock};
pub use form::DataForm;
pub use item::{DataItem, ItemChangeListener};
pub use record::{DataRecord, RecordChangeListener, RecordRef, RecordStatus};
pub use value::{DataType, ItemValue};
