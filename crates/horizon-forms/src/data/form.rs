//! The block owner of one open form.

use std::sync::Arc;

use horizon_forms_core::logging::targets;
use parking_lot::Mutex;

use super::block::DataBlock;
use crate::action::{ActionProcessor, DefaultActionProcessor};
use crate::definition::FormDefinition;
use crate::error::{Error, Result};

/// The blocks of an open form.
///
/// Tracks which block holds renderer focus, so commands such as save,
/// insert or delete can be routed to it.
pub struct DataForm {
    name: String,
    blocks: Vec<Arc<DataBlock>>,
    focused: Arc<Mutex<Option<String>>>,
}

impl DataForm {
    /// Open a form whose blocks accept every lifecycle transition.
    pub fn new(definition: FormDefinition) -> Result<Self> {
        Self::with_processor(definition, Arc::new(DefaultActionProcessor))
    }

    /// Open a form, sharing `processor` between all its blocks.
    pub fn with_processor(
        definition: FormDefinition,
        processor: Arc<dyn ActionProcessor>,
    ) -> Result<Self> {
        definition.validate()?;

        let focused = Arc::new(Mutex::new(None));
        let blocks = definition
            .blocks
            .into_iter()
            .map(|block_definition| {
                let name = block_definition.name.clone();
                let block = DataBlock::with_processor(Arc::new(block_definition), processor.clone());

                let focused = focused.clone();
                block.signals().focus_changed.connect(move |&gained| {
                    let mut focused = focused.lock();
                    if gained {
                        *focused = Some(name.clone());
                    } else if focused.as_deref() == Some(name.as_str()) {
                        *focused = None;
                    }
                });
                block
            })
            .collect::<Vec<_>>();

        tracing::debug!(target: targets::FORM, form = %definition.name, blocks = blocks.len(), "form opened");
        Ok(Self {
            name: definition.name,
            blocks,
            focused,
        })
    }

    /// The form name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All blocks in definition order.
    pub fn blocks(&self) -> &[Arc<DataBlock>] {
        &self.blocks
    }

    /// Look up a block, ignoring case.
    pub fn block(&self, name: &str) -> Result<Arc<DataBlock>> {
        self.blocks
            .iter()
            .find(|block| block.name().eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| Error::UnknownBlock {
                form: self.name.clone(),
                block: name.to_string(),
            })
    }

    /// The block whose renderer last gained focus and has not lost it since.
    pub fn focused_block(&self) -> Option<Arc<DataBlock>> {
        let name = self.focused.lock().clone()?;
        self.block(&name).ok()
    }

    /// Returns `true` if any block has pending changes.
    pub fn is_dirty(&self) -> bool {
        self.blocks.iter().any(|block| block.is_dirty())
    }

    /// Blocks with pending changes.
    pub fn dirty_blocks(&self) -> Vec<Arc<DataBlock>> {
        self.blocks
            .iter()
            .filter(|block| block.is_dirty())
            .cloned()
            .collect()
    }

    /// Mark every dirty block as saved. Returns how many blocks were saved.
    ///
    /// Call after the persistence layer has written the pending changes.
    pub fn save(&self) -> usize {
        let dirty = self.dirty_blocks();
        for block in &dirty {
            block.block_saved();
        }
        tracing::debug!(target: targets::FORM, form = %self.name, saved = dirty.len(), "form saved");
        dirty.len()
    }

    /// Clear every block, discarding pending changes if `clear_changes` is set.
    pub fn clear(&self, clear_changes: bool) {
        for block in &self.blocks {
            block.clear_block(clear_changes);
        }
    }
}

impl std::fmt::Debug for DataForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataForm")
            .field("name", &self.name)
            .field("blocks", &self.blocks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORM: &str = r#"
name = "hr"

[[blocks]]
name = "dept"

[[blocks.items]]
name = "dept_no"
data_type = "integer"

[[blocks]]
name = "emp"

[[blocks.items]]
name = "name"
"#;

    #[test]
    fn test_blocks_by_name() {
        let form = DataForm::new(FormDefinition::from_toml_str(FORM).unwrap()).unwrap();
        assert_eq!(form.blocks().len(), 2);
        assert_eq!(form.block("EMP").unwrap().name(), "emp");
        assert!(matches!(form.block("jobs"), Err(Error::UnknownBlock { .. })));
    }

    #[test]
    fn test_focus_routing() {
        let form = DataForm::new(FormDefinition::from_toml_str(FORM).unwrap()).unwrap();
        assert!(form.focused_block().is_none());

        form.block("dept").unwrap().renderer_focus_gained();
        assert_eq!(form.focused_block().unwrap().name(), "dept");

        form.block("dept").unwrap().renderer_focus_lost();
        form.block("emp").unwrap().renderer_focus_gained();
        assert_eq!(form.focused_block().unwrap().name(), "emp");

        // A stale loss from another block does not clear focus.
        form.block("dept").unwrap().renderer_focus_gained();
        form.block("emp").unwrap().renderer_focus_lost();
        assert_eq!(form.focused_block().unwrap().name(), "dept");
    }

    #[test]
    fn test_save_dirty_blocks() {
        let form = DataForm::new(FormDefinition::from_toml_str(FORM).unwrap()).unwrap();
        let emp = form.block("emp").unwrap();
        let record = emp.create_record().unwrap();
        emp.record_created(record.clone(), None).unwrap();

        assert!(form.is_dirty());
        assert_eq!(form.dirty_blocks().len(), 1);
        assert_eq!(form.save(), 1);
        assert!(!form.is_dirty());
        assert!(record.is_marked_as_queried());
        assert_eq!(form.save(), 0);
    }
}
