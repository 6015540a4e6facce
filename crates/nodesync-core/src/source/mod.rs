// # Built-in Address Sources
//
// Sources that ship with the core. Inventory-backed sources live in their
// own crates (see `nodesync-source-kube`).

pub mod file;

pub use file::{FileAddressSource, FileSourceFactory};

use crate::registry::PluginRegistry;

/// Register the built-in address sources with a registry
pub fn register(registry: &PluginRegistry) {
    registry.register_source("file", Box::new(FileSourceFactory));
}
