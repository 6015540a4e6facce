// # Config Renderer Trait
//
// Defines the interface for turning an address set into artifact lines.
//
// ## Implementations
//
// - ufw firewall rules: `nodesync-render-ufw` crate
// - nginx upstream blocks: `nodesync-render-nginx` crate

use crate::address::AddressSet;

/// Trait for renderer implementations
///
/// Rendering is a pure function of the address set, the existing artifact
/// and the renderer's static configuration: the same inputs always produce
/// the same lines. Renderers perform no I/O; the loop reads the existing
/// artifact on their behalf.
pub trait ConfigRenderer: Send + Sync {
    /// Render the artifact for `addresses`
    ///
    /// # Parameters
    ///
    /// - `addresses`: The current member addresses, in first-seen order
    /// - `existing`: Lines of the artifact currently on disk, when the
    ///   renderer asked for them and they could be read
    ///
    /// # Returns
    ///
    /// The complete artifact, one entry per line, without line terminators
    fn render(&self, addresses: &AddressSet, existing: Option<&[String]>) -> Vec<String>;

    /// Whether the loop should read the current artifact before rendering
    ///
    /// Renderers that preserve operator-authored content around a
    /// generated region return `true`.
    fn uses_existing(&self) -> bool {
        false
    }

    /// Get the renderer name (for logging/debugging)
    fn renderer_name(&self) -> &'static str;
}

/// Helper trait for constructing renderers from configuration
pub trait ConfigRendererFactory: Send + Sync {
    /// Create a ConfigRenderer instance from configuration
    fn create(
        &self,
        config: &crate::config::RendererConfig,
    ) -> Result<Box<dyn ConfigRenderer>, crate::Error>;
}
