//! Horizon Forms - record lifecycle and renderer synchronization for declarative forms.
//!
//! A form is a set of blocks; a block is an ordered set of records; a record
//! is a set of named, typed items. The crate tracks what has to be persisted
//! (inserted, updated and deleted records per block) and keeps one record at
//! a time synchronized with the widgets of each screen.
//!
//! # Example
//!
//! ```
//! use horizon_forms::prelude::*;
//!
//! let form = FormDefinition::from_toml_str(r#"
//! name = "hr"
//!
//! [[blocks]]
//! name = "emp"
//!
//! [[blocks.items]]
//! name = "name"
//!
//! [[blocks.items]]
//! name = "salary"
//! data_type = "integer"
//! "#)?;
//! let form = DataForm::new(form)?;
//! let emp = form.block("emp")?;
//!
//! let record = emp.create_record()?;
//! record.set_value("name", "Ada")?;
//! emp.add_queried_record(record.clone())?;
//! assert!(!emp.is_dirty());
//!
//! record.set_value("salary", 100)?;
//! assert!(record.is_marked_for_update());
//! assert!(form.is_dirty());
//!
//! form.save();
//! assert!(!form.is_dirty());
//! # Ok::<(), horizon_forms::Error>(())
//! ```
//!
//! Logging goes through `tracing` under the targets in
//! [`horizon_forms_core::logging::targets`]; no subscriber is installed here.

pub mod action;
pub mod data;
pub mod definition;
pub mod error;
pub mod prelude;
pub mod renderer;

pub use action::{ActionProcessor, DefaultActionProcessor, Rejection};
pub use error::{Error, Result};
pub use renderer::ScreenType;
