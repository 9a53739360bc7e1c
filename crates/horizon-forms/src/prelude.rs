//! Prelude module for Horizon Forms.
//!
//! ```
//! use horizon_forms::prelude::*;
//! ```

// ============================================================================
// Signals
// ============================================================================

pub use horizon_forms_core::{ConnectionGuard, ConnectionId, Signal};

// ============================================================================
// Data
// ============================================================================

pub use crate::data::{
    BlockSignals, DataBlock, DataForm, DataItem, DataRecord, DataType, ItemValue,
    RecordChangeListener, RecordRef,
};

// ============================================================================
// Definitions
// ============================================================================

pub use crate::definition::{
    BlockDefinition, FormDefinition, ItemDefinition, ScreenItemDefinition, ServiceMapping,
};

// ============================================================================
// Renderers
// ============================================================================

pub use crate::renderer::{
    EditOutcome, InsertScreenRegister, ItemRenderer, MainScreenRegister, QueryScreenRegister,
    RendererRegister, RendererRegistry, ScreenItemListener, ScreenType, UpdateScreenRegister,
    WriteState,
};

// ============================================================================
// Actions and errors
// ============================================================================

pub use crate::action::{ActionProcessor, DefaultActionProcessor, Rejection};
pub use crate::error::Error;
