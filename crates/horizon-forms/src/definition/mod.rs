//! Form, block and item definitions.
//!
//! Definitions are plain serde types, normally loaded from TOML:
//!
//! ```
//! use horizon_forms::definition::FormDefinition;
//! use horizon_forms::data::DataType;
//!
//! let form = FormDefinition::from_toml_str(r#"
//! name = "employees"
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
//! default = "0"
//!
//! [[blocks.main_screen]]
//! item = "name"
//! renderer = "text"
//! mandatory = true
//! "#).unwrap();
//!
//! let block = form.block("EMP").unwrap();
//! assert_eq!(block.item("Salary").unwrap().data_type, DataType::Integer);
//! ```
//!
//! The [`ServiceMapping`] that mirrors items into backing objects is code,
//! not configuration, and is attached after loading with
//! [`FormDefinition::with_service`] or [`BlockDefinition::with_service`].

mod service;

use std::collections::HashSet;
use std::sync::Arc;

use horizon_forms_core::logging::targets;
use serde::Deserialize;

use crate::data::{DataType, ItemValue};
use crate::error::{Error, Result};
use crate::renderer::ScreenType;

pub use service::{ServiceMapping, ServiceMappingBuilder, ServicePojo};

fn default_true() -> bool {
    true
}

fn default_renderer() -> String {
    "text".to_string()
}

/// Definition of one item of a block.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ItemDefinition {
    /// Item name, unique within the block ignoring case.
    pub name: String,
    /// Declared type of the item's values.
    #[serde(default)]
    pub data_type: DataType,
    /// Whether the item is mirrored into the service object and counts as a
    /// data change. Control items (`false`) only drive the screen.
    #[serde(default = "default_true")]
    pub service_item: bool,
    /// Default value text, parsed according to `data_type`.
    #[serde(default, rename = "default")]
    pub default_value: Option<String>,
    /// Hint shown by renderers.
    #[serde(default)]
    pub hint_text: Option<String>,
    /// Name of the visual attribute applied on creation.
    #[serde(default)]
    pub visual_attribute: Option<String>,
}

impl ItemDefinition {
    /// Create a service item definition.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            service_item: true,
            default_value: None,
            hint_text: None,
            visual_attribute: None,
        }
    }

    /// Turn this into a control item that is not mirrored into the service object.
    pub fn control_item(mut self) -> Self {
        self.service_item = false;
        self
    }

    /// Set the default value text.
    pub fn with_default(mut self, text: impl Into<String>) -> Self {
        self.default_value = Some(text.into());
        self
    }

    /// Set the hint text.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint_text = Some(hint.into());
        self
    }

    /// Parse the default value, `Null` if none is defined.
    pub fn default_item_value(&self) -> Result<ItemValue> {
        match &self.default_value {
            None => Ok(ItemValue::Null),
            Some(text) => self
                .data_type
                .parse(text)
                .map_err(|message| Error::InvalidDefaultValue {
                    item: self.name.clone(),
                    message,
                }),
        }
    }
}

/// How one item is shown on one screen.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScreenItemDefinition {
    /// Name of the block item displayed.
    pub item: String,
    /// Renderer identifier, resolved through the renderer registry.
    #[serde(default = "default_renderer")]
    pub renderer: String,
    /// Label text.
    #[serde(default)]
    pub label: Option<String>,
    /// Whether the widget is shown.
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Whether the user may edit the widget.
    #[serde(default = "default_true")]
    pub edit_allowed: bool,
    /// Whether the widget requires a value.
    #[serde(default)]
    pub mandatory: bool,
}

impl ScreenItemDefinition {
    /// Show `item` with the given renderer, visible and editable.
    pub fn new(item: impl Into<String>, renderer: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            renderer: renderer.into(),
            label: None,
            visible: true,
            edit_allowed: true,
            mandatory: false,
        }
    }

    /// Mark the widget as mandatory.
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Make the widget read-only.
    pub fn read_only(mut self) -> Self {
        self.edit_allowed = false;
        self
    }
}

/// Definition of one block: its items and the items shown on each screen.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockDefinition {
    /// Block name, unique within the form ignoring case.
    pub name: String,
    /// Items of every record in the block, in display order.
    #[serde(default)]
    pub items: Vec<ItemDefinition>,
    /// Items shown on the main screen.
    #[serde(default)]
    pub main_screen: Vec<ScreenItemDefinition>,
    /// Items shown on the insert screen.
    #[serde(default)]
    pub insert_screen: Vec<ScreenItemDefinition>,
    /// Items shown on the update screen.
    #[serde(default)]
    pub update_screen: Vec<ScreenItemDefinition>,
    /// Items shown on the query screen.
    #[serde(default)]
    pub query_screen: Vec<ScreenItemDefinition>,
    #[serde(skip)]
    service: Option<Arc<ServiceMapping>>,
}

impl BlockDefinition {
    /// Create an empty block definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
            main_screen: Vec::new(),
            insert_screen: Vec::new(),
            update_screen: Vec::new(),
            query_screen: Vec::new(),
            service: None,
        }
    }

    /// Add an item.
    pub fn with_item(mut self, item: ItemDefinition) -> Self {
        self.items.push(item);
        self
    }

    /// Show an item on a screen.
    pub fn with_screen_item(mut self, screen: ScreenType, item: ScreenItemDefinition) -> Self {
        match screen {
            ScreenType::Main => self.main_screen.push(item),
            ScreenType::Insert => self.insert_screen.push(item),
            ScreenType::Update => self.update_screen.push(item),
            ScreenType::Query => self.query_screen.push(item),
        }
        self
    }

    /// Attach the service mapping used to mirror service items.
    pub fn with_service(mut self, mapping: ServiceMapping) -> Self {
        self.service = Some(Arc::new(mapping));
        self
    }

    /// The service mapping, if one is attached.
    pub fn service(&self) -> Option<&Arc<ServiceMapping>> {
        self.service.as_ref()
    }

    /// Look up an item definition, ignoring case.
    pub fn item(&self, name: &str) -> Option<&ItemDefinition> {
        self.items
            .iter()
            .find(|item| item.name.eq_ignore_ascii_case(name))
    }

    /// Items shown on `screen`.
    pub fn screen(&self, screen: ScreenType) -> &[ScreenItemDefinition] {
        match screen {
            ScreenType::Main => &self.main_screen,
            ScreenType::Insert => &self.insert_screen,
            ScreenType::Update => &self.update_screen,
            ScreenType::Query => &self.query_screen,
        }
    }

    /// Check names, screen references and default values.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::definition("block name must not be empty"));
        }

        let mut seen = HashSet::new();
        for item in &self.items {
            if !seen.insert(item.name.to_lowercase()) {
                return Err(Error::definition(format!(
                    "block '{}' defines item '{}' twice",
                    self.name, item.name
                )));
            }
            let default = item.default_item_value()?;
            if !item.data_type.accepts(&default) {
                return Err(Error::InvalidDefaultValue {
                    item: item.name.clone(),
                    message: format!("not a {}", item.data_type),
                });
            }
        }

        for screen in ScreenType::ALL {
            for screen_item in self.screen(screen) {
                if self.item(&screen_item.item).is_none() {
                    return Err(Error::unknown_item(&self.name, &screen_item.item));
                }
            }
        }
        Ok(())
    }
}

/// Definition of a form: a named set of blocks.
#[derive(Debug, Clone, Deserialize)]
pub struct FormDefinition {
    /// Form name.
    pub name: String,
    /// Blocks of the form.
    #[serde(default)]
    pub blocks: Vec<BlockDefinition>,
}

impl FormDefinition {
    /// Parse and validate a form definition from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let form: FormDefinition = toml::from_str(text)?;
        form.validate()?;
        tracing::debug!(
            target: targets::DEFINITION,
            form = %form.name,
            blocks = form.blocks.len(),
            "loaded form definition"
        );
        Ok(form)
    }

    /// Look up a block definition, ignoring case.
    pub fn block(&self, name: &str) -> Option<&BlockDefinition> {
        self.blocks
            .iter()
            .find(|block| block.name.eq_ignore_ascii_case(name))
    }

    /// Attach a service mapping to the named block.
    pub fn with_service(mut self, block: &str, mapping: ServiceMapping) -> Result<Self> {
        let name = self.name.clone();
        let definition = self
            .blocks
            .iter_mut()
            .find(|b| b.name.eq_ignore_ascii_case(block))
            .ok_or_else(|| Error::UnknownBlock {
                form: name,
                block: block.to_string(),
            })?;
        definition.service = Some(Arc::new(mapping));
        Ok(self)
    }

    /// Validate every block and check block names are unique.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for block in &self.blocks {
            block.validate()?;
            if !seen.insert(block.name.to_lowercase()) {
                return Err(Error::definition(format!(
                    "form '{}' defines block '{}' twice",
                    self.name, block.name
                )));
            }
        }
        Ok(())
    }
}
