// # nginx Renderer
//
// Renders the load-balancer variant of the artifact: one nginx `upstream`
// block per configured group, each listing every member address on the
// group's port.
//
// ```text
// upstream api {
// server 10.0.0.5:9090 weight=100;
// server 10.0.0.6:9090 weight=100;
// }
// ```
//
// The file is fully owned by the reconciler; nothing from a previous
// version is preserved. Include it from the main nginx configuration.

use std::net::SocketAddr;

use nodesync_core::config::{RendererConfig, UpstreamGroup};
use nodesync_core::registry::PluginRegistry;
use nodesync_core::traits::{ConfigRenderer, ConfigRendererFactory};
use nodesync_core::{AddressSet, Error, Result};

/// Weight given to every server entry when none is configured
pub const DEFAULT_WEIGHT: u32 = 100;

/// Upstream groups of the reference deployment (NodePort services)
pub fn default_upstreams() -> Vec<UpstreamGroup> {
    vec![
        UpstreamGroup::new("diy", 32016),
        UpstreamGroup::new("dockerui", 32018),
        UpstreamGroup::new("tryingadventure", 32020),
        UpstreamGroup::new("devops", 32021),
        UpstreamGroup::new("monitor", 32699),
    ]
}

/// Renderer for nginx upstream blocks
#[derive(Debug, Clone)]
pub struct NginxRenderer {
    upstreams: Vec<UpstreamGroup>,
    weight: u32,
}

impl NginxRenderer {
    /// Create a renderer for `upstreams`, giving every server `weight`
    pub fn new(upstreams: Vec<UpstreamGroup>, weight: u32) -> Self {
        Self { upstreams, weight }
    }
}

impl Default for NginxRenderer {
    fn default() -> Self {
        Self::new(default_upstreams(), DEFAULT_WEIGHT)
    }
}

impl ConfigRenderer for NginxRenderer {
    fn render(&self, addresses: &AddressSet, _existing: Option<&[String]>) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.upstreams.len() * (addresses.len() + 2));

        for group in &self.upstreams {
            lines.push(format!("upstream {} {{", group.name));
            for address in addresses {
                // SocketAddr brackets IPv6 hosts
                lines.push(format!(
                    "server {} weight={};",
                    SocketAddr::new(*address, group.port),
                    self.weight
                ));
            }
            lines.push("}".to_string());
        }

        lines
    }

    fn renderer_name(&self) -> &'static str {
        "nginx"
    }
}

/// Factory for creating nginx renderers
pub struct NginxRendererFactory;

impl ConfigRendererFactory for NginxRendererFactory {
    fn create(&self, config: &RendererConfig) -> Result<Box<dyn ConfigRenderer>> {
        match config {
            RendererConfig::Nginx { upstreams, weight } => {
                Ok(Box::new(NginxRenderer::new(upstreams.clone(), *weight)))
            }
            _ => Err(Error::config("Invalid config for nginx renderer")),
        }
    }
}

/// Register the nginx renderer with a registry
pub fn register(registry: &PluginRegistry) {
    registry.register_renderer("nginx", Box::new(NginxRendererFactory));
}
