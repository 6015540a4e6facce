//! Configuration types for the reconciler
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Main reconciler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodesyncConfig {
    /// Address source configuration
    pub source: AddressSourceConfig,

    /// Renderer configuration
    pub renderer: RendererConfig,

    /// Where the rendered artifact lives
    pub artifact: ArtifactConfig,

    /// How the consumer is told to reload
    pub reload: ReloadConfig,

    /// Optional loop settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl NodesyncConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.source.validate()?;
        self.renderer.validate()?;
        self.artifact.validate()?;
        self.reload.validate()?;
        self.engine.validate()?;

        Ok(())
    }
}

/// Address source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AddressSourceConfig {
    /// Kubernetes node list
    Kube {
        /// Path to a kubeconfig file (inferred from the environment when absent)
        kubeconfig: Option<String>,
        /// Annotation carrying each node's address
        #[serde(default = "default_annotation")]
        annotation: String,
        /// Optional label selector restricting which nodes are members
        label_selector: Option<String>,
    },

    /// Newline-delimited file of addresses
    File {
        /// Path to the address list
        path: String,
    },

    /// Custom address source
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl AddressSourceConfig {
    /// Validate the address source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            AddressSourceConfig::Kube { annotation, .. } => {
                if annotation.trim().is_empty() {
                    return Err(crate::Error::config("Node address annotation cannot be empty"));
                }
                Ok(())
            }
            AddressSourceConfig::File { path } => {
                if path.is_empty() {
                    return Err(crate::Error::config("Address file path cannot be empty"));
                }
                Ok(())
            }
            AddressSourceConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom address source factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom address source config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the source type name used for registry lookup
    pub fn type_name(&self) -> &str {
        match self {
            AddressSourceConfig::Kube { .. } => "kube",
            AddressSourceConfig::File { .. } => "file",
            AddressSourceConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Calico publishes each node's primary address under this annotation.
pub const DEFAULT_ADDRESS_ANNOTATION: &str = "projectcalico.org/IPv4Address";

fn default_annotation() -> String {
    DEFAULT_ADDRESS_ANNOTATION.to_string()
}

/// A named load-balancer target, paired with every address at render time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamGroup {
    /// Upstream block name
    pub name: String,
    /// Port every member serves this group on
    pub port: u16,
}

impl UpstreamGroup {
    /// Create a new upstream group
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            port,
        }
    }
}

impl std::str::FromStr for UpstreamGroup {
    type Err = crate::Error;

    /// Parse `name:port`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, port) = s.rsplit_once(':').ok_or_else(|| {
            crate::Error::invalid_input(format!("upstream '{}' must be written as name:port", s))
        })?;

        let port = port.trim().parse::<u16>().map_err(|e| {
            crate::Error::invalid_input(format!("upstream '{}' has an invalid port: {}", s, e))
        })?;

        Ok(Self::new(name.trim(), port))
    }
}

/// Renderer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RendererConfig {
    /// ufw `user.rules` firewall renderer
    Ufw {
        /// Port opened to every member address
        #[serde(default = "default_allow_port")]
        allow_port: u16,
        /// iptables chain the generated rules are appended to
        #[serde(default = "default_chain")]
        chain: String,
    },

    /// nginx upstream renderer
    Nginx {
        /// Upstream groups, one block each
        upstreams: Vec<UpstreamGroup>,
        /// Load weight given to every server entry
        #[serde(default = "default_weight")]
        weight: u32,
    },

    /// Custom renderer
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl RendererConfig {
    /// Validate the renderer configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            RendererConfig::Ufw { allow_port, chain } => {
                if *allow_port == 0 {
                    return Err(crate::Error::config("Firewall allow port must be > 0"));
                }
                if chain.trim().is_empty() || chain.contains(char::is_whitespace) {
                    return Err(crate::Error::config(format!(
                        "Firewall chain '{}' is not a valid chain name",
                        chain
                    )));
                }
                Ok(())
            }
            RendererConfig::Nginx { upstreams, .. } => {
                if upstreams.is_empty() {
                    return Err(crate::Error::config("No upstream groups configured"));
                }
                for group in upstreams {
                    if group.name.is_empty()
                        || !group
                            .name
                            .chars()
                            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
                    {
                        return Err(crate::Error::config(format!(
                            "Upstream name '{}' must be alphanumeric (hyphen and underscore allowed)",
                            group.name
                        )));
                    }
                    if group.port == 0 {
                        return Err(crate::Error::config(format!(
                            "Upstream '{}' port must be > 0",
                            group.name
                        )));
                    }
                }
                Ok(())
            }
            RendererConfig::Custom { factory, .. } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom renderer factory cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the renderer type name used for registry lookup
    pub fn type_name(&self) -> &str {
        match self {
            RendererConfig::Ufw { .. } => "ufw",
            RendererConfig::Nginx { .. } => "nginx",
            RendererConfig::Custom { factory, .. } => factory,
        }
    }
}

fn default_allow_port() -> u16 {
    27017
}

fn default_chain() -> String {
    "ufw-user-input".to_string()
}

fn default_weight() -> u32 {
    100
}

/// Artifact location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Path of the rendered file
    pub path: String,
}

impl ArtifactConfig {
    /// Validate the artifact configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.path.is_empty() {
            return Err(crate::Error::config("Artifact path cannot be empty"));
        }
        Ok(())
    }
}

/// Reload command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadConfig {
    /// Executable to run
    pub command: String,

    /// Fixed arguments
    #[serde(default)]
    pub args: Vec<String>,

    /// Kill the command after this many seconds (0 = wait indefinitely)
    #[serde(default)]
    pub timeout_secs: u64,
}

impl ReloadConfig {
    /// Validate the reload configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.command.is_empty() {
            return Err(crate::Error::config("Reload command cannot be empty"));
        }
        Ok(())
    }
}

/// Loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sleep between reconciliation cycles (in seconds)
    ///
    /// Exactly one interval separates two cycles whether or not the
    /// previous cycle changed anything, which also caps reload frequency.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Pause between a successful artifact write and the reload (in seconds)
    ///
    /// Some consumers watch their config directory and need a moment
    /// before a reload sees the new file. Default: no pause.
    #[serde(default)]
    pub reload_delay_secs: u64,

    /// Capacity of the internal event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the loop configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval_secs == 0 {
            return Err(crate::Error::config("Poll interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            reload_delay_secs: 0,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_event_channel_capacity() -> usize {
    100
}
