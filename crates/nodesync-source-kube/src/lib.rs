// # Kubernetes Address Source
//
// This crate provides an AddressSource backed by the Kubernetes node list.
//
// ## Membership
//
// Every `Node` that carries the address annotation (by default Calico's
// `projectcalico.org/IPv4Address`) is a member. The annotation value may be
// CIDR notation; the prefix length is dropped.
//
// - Nodes without the annotation are skipped (debug log)
// - Nodes with an unparseable annotation are skipped (warn log)
// - A failed list call fails the fetch; the loop retries next tick
//
// ## Client
//
// The client is built once at startup, from an explicit kubeconfig when
// one is configured and from the environment (in-cluster service account
// or `~/.kube/config`) otherwise.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, ResourceExt};

use nodesync_core::config::AddressSourceConfig;
use nodesync_core::registry::PluginRegistry;
use nodesync_core::traits::{AddressSource, AddressSourceFactory};
use nodesync_core::{AddressSet, Error, Result, parse_address};

/// Connection timeout for the API server
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Read timeout for list calls
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

const SOURCE_NAME: &str = "kube";

/// Address source listing cluster nodes
#[derive(Clone)]
pub struct KubeNodeSource {
    /// API client
    client: Client,

    /// Annotation carrying each node's address
    annotation: String,

    /// Optional label selector restricting membership
    label_selector: Option<String>,
}

impl KubeNodeSource {
    /// Create a source from an existing client
    pub fn new(client: Client, annotation: impl Into<String>) -> Self {
        Self {
            client,
            annotation: annotation.into(),
            label_selector: None,
        }
    }

    /// Only consider nodes matching `selector` (e.g. `node-role/storage=true`)
    pub fn with_label_selector(mut self, selector: impl Into<String>) -> Self {
        self.label_selector = Some(selector.into());
        self
    }

    fn list_params(&self) -> ListParams {
        match &self.label_selector {
            Some(selector) => ListParams::default().labels(selector),
            None => ListParams::default(),
        }
    }
}

/// Collect member addresses from a node list
///
/// Order follows the node list; a node whose address repeats an earlier
/// one does not add a second member.
pub fn addresses_from_nodes(nodes: &[Node], annotation: &str) -> AddressSet {
    let mut addresses = AddressSet::new();
    let mut available = 0;

    for node in nodes {
        let name = node.name_any();

        let Some(raw) = node.annotations().get(annotation) else {
            tracing::debug!("Node {} has no {} annotation, skipping", name, annotation);
            continue;
        };

        match parse_address(raw) {
            Ok(address) => {
                tracing::debug!("Found node {}: {}", name, address);
                addresses.insert(address);
                available += 1;
            }
            Err(e) => {
                tracing::warn!("Node {} has an unusable {} annotation: {}", name, annotation, e);
            }
        }
    }

    tracing::info!(
        "There are {} nodes in the cluster, of which {} are available",
        nodes.len(),
        available
    );

    addresses
}

#[async_trait]
impl AddressSource for KubeNodeSource {
    async fn fetch(&self) -> Result<AddressSet> {
        let nodes: Api<Node> = Api::all(self.client.clone());

        let list = nodes
            .list(&self.list_params())
            .await
            .map_err(|e| Error::address_source(format!("Failed to list nodes: {}", e)))?;

        Ok(addresses_from_nodes(&list.items, &self.annotation))
    }

    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }
}

/// Create a client from an optional kubeconfig path
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client> {
    let mut config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::source_error(
                    SOURCE_NAME,
                    format!("failed to read kubeconfig {}: {}", path.display(), e),
                )
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| {
                    Error::source_error(SOURCE_NAME, format!("failed to load kubeconfig: {}", e))
                })?
        }
        None => Config::infer().await.map_err(|e| {
            Error::source_error(SOURCE_NAME, format!("failed to infer config: {}", e))
        })?,
    };

    config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
    config.read_timeout = Some(DEFAULT_READ_TIMEOUT);

    Client::try_from(config)
        .map_err(|e| Error::source_error(SOURCE_NAME, format!("failed to create client: {}", e)))
}

/// Factory for creating Kubernetes node sources
pub struct KubeSourceFactory;

#[async_trait]
impl AddressSourceFactory for KubeSourceFactory {
    async fn create(&self, config: &AddressSourceConfig) -> Result<Box<dyn AddressSource>> {
        match config {
            AddressSourceConfig::Kube {
                kubeconfig,
                annotation,
                label_selector,
            } => {
                let client = create_client(kubeconfig.as_deref().map(Path::new)).await?;

                let mut source = KubeNodeSource::new(client, annotation.clone());
                if let Some(selector) = label_selector {
                    source = source.with_label_selector(selector.clone());
                }

                Ok(Box::new(source))
            }
            _ => Err(Error::config("Invalid config for Kubernetes address source")),
        }
    }
}

/// Register the Kubernetes source with a registry
pub fn register(registry: &PluginRegistry) {
    registry.register_source(SOURCE_NAME, Box::new(KubeSourceFactory));
}
