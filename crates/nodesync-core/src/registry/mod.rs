//! Plugin-based component registry
//!
//! The registry allows address sources and renderers to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nodesync_core::registry::PluginRegistry;
//!
//! let registry = PluginRegistry::new();
//!
//! // Each plugin crate exposes a register() function
//! nodesync_core::source::register(&registry);
//! nodesync_source_kube::register(&registry);
//! nodesync_render_ufw::register(&registry);
//!
//! let source = registry.create_source(&config.source).await?;
//! let renderer = registry.create_renderer(&config.renderer)?;
//! ```

use crate::config::{AddressSourceConfig, RendererConfig};
use crate::error::{Error, Result};
use crate::traits::{AddressSource, AddressSourceFactory, ConfigRenderer, ConfigRendererFactory};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

type SourceMap = HashMap<String, Arc<dyn AddressSourceFactory>>;
type RendererMap = HashMap<String, Box<dyn ConfigRendererFactory>>;

/// Registry for plugin-based component creation
///
/// The registry maintains a map of type names to factory objects,
/// allowing dynamic instantiation based on configuration.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes. A poisoned lock is recovered rather than
/// propagated: the maps are only ever inserted into, so they stay valid.
#[derive(Default)]
pub struct PluginRegistry {
    /// Registered address source factories
    sources: RwLock<SourceMap>,

    /// Registered renderer factories
    renderers: RwLock<RendererMap>,
}

impl PluginRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn sources_read(&self) -> RwLockReadGuard<'_, SourceMap> {
        self.sources.read().unwrap_or_else(|e| e.into_inner())
    }

    fn sources_write(&self) -> RwLockWriteGuard<'_, SourceMap> {
        self.sources.write().unwrap_or_else(|e| e.into_inner())
    }

    fn renderers_read(&self) -> RwLockReadGuard<'_, RendererMap> {
        self.renderers.read().unwrap_or_else(|e| e.into_inner())
    }

    fn renderers_write(&self) -> RwLockWriteGuard<'_, RendererMap> {
        self.renderers.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register an address source factory
    ///
    /// # Parameters
    ///
    /// - `name`: Source type name (e.g., "kube", "file")
    /// - `factory`: Factory object for creating source instances
    pub fn register_source(&self, name: impl Into<String>, factory: Box<dyn AddressSourceFactory>) {
        self.sources_write().insert(name.into(), Arc::from(factory));
    }

    /// Register a renderer factory
    ///
    /// # Parameters
    ///
    /// - `name`: Renderer type name (e.g., "ufw", "nginx")
    /// - `factory`: Factory object for creating renderer instances
    pub fn register_renderer(
        &self,
        name: impl Into<String>,
        factory: Box<dyn ConfigRendererFactory>,
    ) {
        self.renderers_write().insert(name.into(), factory);
    }

    /// Create an address source from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn AddressSource>)`: Created source instance
    /// - `Err(Error)`: If the source type is not registered or creation fails
    pub async fn create_source(
        &self,
        config: &AddressSourceConfig,
    ) -> Result<Box<dyn AddressSource>> {
        let source_type = config.type_name();

        let factory = self
            .sources_read()
            .get(source_type)
            .cloned()
            .ok_or_else(|| Error::config(format!("Unknown address source type: {}", source_type)))?;

        // Lock is released above; creation may await a network handshake
        factory.create(config).await
    }

    /// Create a renderer from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn ConfigRenderer>)`: Created renderer instance
    /// - `Err(Error)`: If the renderer type is not registered or creation fails
    pub fn create_renderer(&self, config: &RendererConfig) -> Result<Box<dyn ConfigRenderer>> {
        let renderer_type = config.type_name();
        let renderers = self.renderers_read();

        let factory = renderers
            .get(renderer_type)
            .ok_or_else(|| Error::config(format!("Unknown renderer type: {}", renderer_type)))?;

        factory.create(config)
    }

    /// List all registered source types
    pub fn list_sources(&self) -> Vec<String> {
        self.sources_read().keys().cloned().collect()
    }

    /// List all registered renderer types
    pub fn list_renderers(&self) -> Vec<String> {
        self.renderers_read().keys().cloned().collect()
    }

    /// Check if a source type is registered
    pub fn has_source(&self, name: &str) -> bool {
        self.sources_read().contains_key(name)
    }

    /// Check if a renderer type is registered
    pub fn has_renderer(&self, name: &str) -> bool {
        self.renderers_read().contains_key(name)
    }
}
