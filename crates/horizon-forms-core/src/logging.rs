//! Logging facilities for Horizon Forms.
//!
//! Horizon Forms uses the `tracing` crate for instrumentation. The library
//! never installs a subscriber; to see logs, install one in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_forms::register=trace,horizon_forms::block=debug")
//!     .init();
//! ```
//!
//! Every subsystem logs under one of the [`targets`], so filters can be
//! scoped to the part of the binding engine being debugged.

/// Span names used throughout Horizon Forms for tracing.
pub mod span_names {
    /// Widget edit validation and commit.
    pub const SCREEN_EDIT: &str = "horizon_forms::screen_edit";
    /// Record registration on a screen.
    pub const REGISTER: &str = "horizon_forms::register_record";
    /// Block save bookkeeping.
    pub const BLOCK_SAVE: &str = "horizon_forms::block_save";
}

/// Target names for log filtering.
pub mod targets {
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_forms_core::signal";
    /// Item value slots.
    pub const ITEM: &str = "horizon_forms::item";
    /// Record status and value mirroring.
    pub const RECORD: &str = "horizon_forms::record";
    /// Block change bookkeeping and navigation.
    pub const BLOCK: &str = "horizon_forms::block";
    /// Renderer register synchronization.
    pub const REGISTER: &str = "horizon_forms::register";
    /// Form-level block ownership and focus.
    pub const FORM: &str = "horizon_forms::form";
    /// Definition loading.
    pub const DEFINITION: &str = "horizon_forms::definition";
    /// Performance spans.
    pub const PERF: &str = "horizon_forms::perf";
}

/// A performance tracing span guard.
///
/// The span is entered on creation and exited when the guard is dropped, so
/// a subscriber with span timing enabled reports the enclosed duration.
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create and enter a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}
