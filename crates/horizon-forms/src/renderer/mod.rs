//! Renderer synchronization: keeping one record in step with a set of widgets.
//!
//! A [`RendererRegister`] owns the widgets of one screen of one block and
//! keeps exactly one record synchronized with them. Widgets are passive
//! [`ItemRenderer`]s created through the session's [`RendererRegistry`];
//! they report edits and focus changes back through [`ScreenItemListener`].
//!
//! The screen wrappers add what each screen does with its record:
//!
//! - [`MainScreenRegister`] shows live block records and forwards edits to the block.
//! - [`InsertScreenRegister`] edits a fresh record and inserts it into the block.
//! - [`UpdateScreenRegister`] edits a copy of a record and merges it back on commit.
//! - [`QueryScreenRegister`] edits query criteria and never touches the block.

mod register;
mod registry;
mod screens;
mod traits;

use std::fmt;

use serde::Deserialize;

pub use register::{EditOutcome, RendererRegister, WriteState};
pub use registry::{RendererFactory, RendererRegistry};
pub use screens::{InsertScreenRegister, MainScreenRegister, QueryScreenRegister, UpdateScreenRegister};
pub use traits::{ItemRenderer, ScreenItemListener};

/// The UI surface a register serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenType {
    /// The main grid or detail view of live records.
    Main,
    /// The popup for creating a record.
    Insert,
    /// The popup for editing a record.
    Update,
    /// The popup for entering query criteria.
    Query,
}

impl ScreenType {
    /// Every screen type.
    pub const ALL: [ScreenType; 4] = [
        ScreenType::Main,
        ScreenType::Insert,
        ScreenType::Update,
        ScreenType::Query,
    ];
}

impl fmt::Display for ScreenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScreenType::Main => "main",
            ScreenType::Insert => "insert",
            ScreenType::Update => "update",
            ScreenType::Query => "query",
        };
        f.write_str(name)
    }
}
