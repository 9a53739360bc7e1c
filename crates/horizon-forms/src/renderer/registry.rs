//! Session-owned map from renderer identifiers to widget factories.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::traits::ItemRenderer;
use crate::definition::{ItemDefinition, ScreenItemDefinition};
use crate::error::{Error, Result};

/// Creates a widget for an item shown on a screen.
pub type RendererFactory =
    Arc<dyn Fn(&ItemDefinition, &ScreenItemDefinition) -> Arc<dyn ItemRenderer> + Send + Sync>;

/// Maps the `renderer` identifier of a screen item to a widget factory.
///
/// The application builds one registry per session and hands it to every
/// register it creates.
#[derive(Clone, Default)]
pub struct RendererRegistry {
    factories: HashMap<String, RendererFactory>,
}

impl RendererRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `id`, replacing any previous factory.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&ItemDefinition, &ScreenItemDefinition) -> Arc<dyn ItemRenderer>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(id.into(), Arc::new(factory));
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F>(mut self, id: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&ItemDefinition, &ScreenItemDefinition) -> Arc<dyn ItemRenderer>
            + Send
            + Sync
            + 'static,
    {
        self.register(id, factory);
        self
    }

    /// Returns `true` if a factory is registered under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Create the widget for `screen_item`.
    pub fn create(
        &self,
        item: &ItemDefinition,
        screen_item: &ScreenItemDefinition,
    ) -> Result<Arc<dyn ItemRenderer>> {
        let factory = self
            .factories
            .get(&screen_item.renderer)
            .ok_or_else(|| Error::UnknownRenderer(screen_item.renderer.clone()))?;
        Ok(factory(item, screen_item))
    }
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&String> = self.factories.keys().collect();
        ids.sort_unstable();
        f.debug_struct("RendererRegistry").field("ids", &ids).finish()
    }
}
