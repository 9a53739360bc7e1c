//! Validation and lifecycle hooks.
//!
//! Business rules live outside the binding engine. The engine calls an
//! [`ActionProcessor`] whenever a widget edit is about to be committed and at
//! a few record lifecycle transitions. Every hook has a default
//! implementation that accepts, so processors only override what they need.
//!
//! # Example
//!
//! ```
//! use horizon_forms::action::{ActionProcessor, Rejection};
//! use horizon_forms::data::DataRecord;
//! use horizon_forms::ScreenType;
//!
//! struct SalaryRules;
//!
//! impl ActionProcessor for SalaryRules {
//!     fn validate_item(
//!         &self,
//!         candidate: &DataRecord,
//!         item_name: &str,
//!         _screen: ScreenType,
//!     ) -> Result<(), Rejection> {
//!         if item_name.eq_ignore_ascii_case("salary") {
//!             let salary = candidate.value("salary").ok().and_then(|v| v.as_int());
//!             if salary.is_some_and(|s| s < 0) {
//!                 return Err(Rejection::new("Salary cannot be negative"));
//!             }
//!         }
//!         Ok(())
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use crate::data::{DataBlock, DataRecord};
use crate::renderer::ScreenType;

/// A business rule refused a value or an operation.
///
/// Rejections are expected, recoverable events. For widget edits they are
/// reported through the widget's invalid flag and never escape the register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    message: String,
}

impl Rejection {
    /// Create a rejection with a user-facing message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The user-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Rejection {}

/// Hooks invoked by blocks, records and renderer registers.
///
/// # Thread Safety
///
/// Processors must be `Send + Sync` so they can be shared by every block and
/// register of a form.
pub trait ActionProcessor: Send + Sync {
    /// Validate an edit of `item_name` on `candidate`.
    ///
    /// `candidate` is a copy of the edited record with the new value already
    /// applied. The processor may set further items on it; on success every
    /// value of the candidate is merged into the real record together.
    fn validate_item(
        &self,
        _candidate: &DataRecord,
        _item_name: &str,
        _screen: ScreenType,
    ) -> Result<(), Rejection> {
        Ok(())
    }

    /// Called after a queried record has been added to a block.
    fn post_query(&self, _block: &DataBlock, _record: &DataRecord) -> Result<(), Rejection> {
        Ok(())
    }

    /// Called before a newly created record is inserted into a block.
    ///
    /// Returning an error leaves the block unchanged.
    fn when_create_record(
        &self,
        _block: &DataBlock,
        _record: &DataRecord,
    ) -> Result<(), Rejection> {
        Ok(())
    }

    /// Called before a record is deleted from a block.
    ///
    /// Returning an error leaves the record in place.
    fn pre_delete(&self, _block: &DataBlock, _record: &DataRecord) -> Result<(), Rejection> {
        Ok(())
    }

    /// Called once after a block's pending changes were persisted and cleared.
    fn post_block_saved(&self, _block: &DataBlock) {}
}

/// An action processor that accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultActionProcessor;

impl ActionProcessor for DefaultActionProcessor {}

// Allow using Arc<dyn ActionProcessor> as an ActionProcessor
impl<P: ActionProcessor + ?Sized> ActionProcessor for Arc<P> {
    fn validate_item(
        &self,
        candidate: &DataRecord,
        item_name: &str,
        screen: ScreenType,
    ) -> Result<(), Rejection> {
        (**self).validate_item(candidate, item_name, screen)
    }

    fn post_query(&self, block: &DataBlock, record: &DataRecord) -> Result<(), Rejection> {
        (**self).post_query(block, record)
    }

    fn when_create_record(&self, block: &DataBlock, record: &DataRecord) -> Result<(), Rejection> {
        (**self).when_create_record(block, record)
    }

    fn pre_delete(&self, block: &DataBlock, record: &DataRecord) -> Result<(), Rejection> {
        (**self).pre_delete(block, record)
    }

    fn post_block_saved(&self, block: &DataBlock) {
        (**self).post_block_saved(block)
    }
}
