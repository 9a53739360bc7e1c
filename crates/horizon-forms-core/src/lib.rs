//! Core systems for Horizon Forms.
//!
//! This crate provides the foundational components the forms binding engine
//! is built on:
//!
//! - **Signal/Slot System**: Type-safe, re-entrancy safe notification
//! - **Property System**: Value cells with change detection
//! - **Logging**: Tracing targets and span helpers per subsystem
//!
//! # Signal/Slot Example
//!
//! ```
//! use horizon_forms_core::Signal;
//!
//! let value_changed = Signal::<i32>::new();
//!
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! value_changed.emit(42);
//! value_changed.disconnect(conn_id);
//! ```

pub mod logging;
pub mod property;
pub mod signal;

pub use logging::PerfSpan;
pub use property::Property;
pub use signal::{ConnectionGuard, ConnectionId, Signal};
