//! Command line and environment configuration
//!
//! Every flag can also be set through a `NODESYNC_*` environment variable.
//! Anything left unset falls back to the defaults of the selected mode.

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use nodesync_core::config::{
    AddressSourceConfig, ArtifactConfig, DEFAULT_ADDRESS_ANNOTATION, EngineConfig,
    NodesyncConfig, ReloadConfig, RendererConfig, UpstreamGroup,
};

/// Which artifact the daemon maintains
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// ufw `user.rules` admitting every node
    Ufw,
    /// nginx upstream blocks listing every node
    Nginx,
}

impl Mode {
    fn default_artifact(self) -> &'static str {
        match self {
            Mode::Ufw => "/etc/ufw/user.rules",
            Mode::Nginx => "/etc/nginx/upstreams/upstreams.conf",
        }
    }

    fn default_reload(self) -> (&'static str, &'static [&'static str]) {
        match self {
            Mode::Ufw => ("/usr/sbin/ufw", &["reload"]),
            Mode::Nginx => ("/bin/systemctl", &["reload", "nginx"]),
        }
    }
}

/// Where node addresses come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Kubernetes node list
    Kube,
    /// Newline-delimited address file
    File,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Artifact to maintain
    #[arg(long, env = "NODESYNC_MODE", value_enum, default_value_t = Mode::Ufw)]
    pub mode: Mode,

    /// Address source
    #[arg(long, env = "NODESYNC_SOURCE", value_enum, default_value_t = SourceKind::Kube)]
    pub source: SourceKind,

    /// Kubeconfig file (KUBECONFIG and in-cluster config are used when unset)
    #[arg(long, env = "NODESYNC_KUBECONFIG")]
    pub kubeconfig: Option<String>,

    /// Node annotation carrying the address
    #[arg(long, env = "NODESYNC_ANNOTATION", default_value = DEFAULT_ADDRESS_ANNOTATION)]
    pub annotation: String,

    /// Only nodes matching this label selector are members
    #[arg(long, env = "NODESYNC_LABEL_SELECTOR")]
    pub label_selector: Option<String>,

    /// Address list read by the file source
    #[arg(long, env = "NODESYNC_ADDRESSES_FILE")]
    pub addresses_file: Option<String>,

    /// Artifact path [default: depends on --mode]
    #[arg(long, env = "NODESYNC_ARTIFACT")]
    pub artifact: Option<String>,

    /// Reload executable [default: depends on --mode]
    #[arg(long, env = "NODESYNC_RELOAD_COMMAND")]
    pub reload_command: Option<String>,

    /// Reload argument, repeatable (requires --reload-command)
    #[arg(
        long = "reload-arg",
        env = "NODESYNC_RELOAD_ARGS",
        value_delimiter = ' ',
        allow_hyphen_values = true
    )]
    pub reload_args: Vec<String>,

    /// Kill the reload command after this many seconds (0 waits forever)
    #[arg(long, env = "NODESYNC_RELOAD_TIMEOUT", default_value_t = 0)]
    pub reload_timeout: u64,

    /// Seconds to wait between writing the artifact and reloading
    #[arg(long, env = "NODESYNC_RELOAD_DELAY", default_value_t = 0)]
    pub reload_delay: u64,

    /// Seconds between reconciliation cycles
    #[arg(long, env = "NODESYNC_POLL_INTERVAL", default_value_t = 5)]
    pub poll_interval: u64,

    /// Port opened to every node (ufw mode)
    #[arg(long, env = "NODESYNC_ALLOW_PORT", default_value_t = nodesync_render_ufw::DEFAULT_ALLOW_PORT)]
    pub allow_port: u16,

    /// Chain the rules are appended to (ufw mode)
    #[arg(long, env = "NODESYNC_CHAIN", default_value = nodesync_render_ufw::DEFAULT_CHAIN)]
    pub chain: String,

    /// Upstream group as name:port, repeatable (nginx mode)
    #[arg(long = "upstream", env = "NODESYNC_UPSTREAMS", value_delimiter = ',')]
    pub upstreams: Vec<UpstreamGroup>,

    /// Server weight (nginx mode)
    #[arg(long, env = "NODESYNC_WEIGHT", default_value_t = nodesync_render_nginx::DEFAULT_WEIGHT)]
    pub weight: u32,

    /// Log the artifact and reload instead of touching the system
    #[arg(long, env = "NODESYNC_DRY_RUN")]
    pub dry_run: bool,

    /// Log level
    #[arg(
        long,
        env = "NODESYNC_LOG_LEVEL",
        default_value = "info",
        value_parser = ["trace", "debug", "info", "warn", "error"],
        ignore_case = true
    )]
    pub log_level: String,
}

impl Cli {
    /// Resolve flags and mode defaults into a validated configuration
    pub fn to_config(&self) -> Result<NodesyncConfig> {
        let source = match self.source {
            SourceKind::Kube => AddressSourceConfig::Kube {
                kubeconfig: self.kubeconfig.clone(),
                annotation: self.annotation.clone(),
                label_selector: self.label_selector.clone(),
            },
            SourceKind::File => match &self.addresses_file {
                Some(path) => AddressSourceConfig::File { path: path.clone() },
                None => bail!(
                    "--addresses-file is required with --source file. \
                    Set it via: export NODESYNC_ADDRESSES_FILE=/etc/nodesync/nodes.txt"
                ),
            },
        };

        let renderer = match self.mode {
            Mode::Ufw => RendererConfig::Ufw {
                allow_port: self.allow_port,
                chain: self.chain.clone(),
            },
            Mode::Nginx => RendererConfig::Nginx {
                upstreams: if self.upstreams.is_empty() {
                    nodesync_render_nginx::default_upstreams()
                } else {
                    self.upstreams.clone()
                },
                weight: self.weight,
            },
        };

        let reload = match &self.reload_command {
            Some(command) => ReloadConfig {
                command: command.clone(),
                args: self.reload_args.clone(),
                timeout_secs: self.reload_timeout,
            },
            None if !self.reload_args.is_empty() => bail!(
                "--reload-arg requires --reload-command. \
                Set it via: export NODESYNC_RELOAD_COMMAND=/path/to/reload"
            ),
            None => {
                let (command, args) = self.mode.default_reload();
                ReloadConfig {
                    command: command.to_string(),
                    args: args.iter().map(|a| a.to_string()).collect(),
                    timeout_secs: self.reload_timeout,
                }
            }
        };

        let config = NodesyncConfig {
            source,
            renderer,
            artifact: ArtifactConfig {
                path: self
                    .artifact
                    .clone()
                    .unwrap_or_else(|| self.mode.default_artifact().to_string()),
            },
            reload,
            engine: EngineConfig {
                poll_interval_secs: self.poll_interval,
                reload_delay_secs: self.reload_delay,
                ..EngineConfig::default()
            },
        };

        config.validate()?;
        Ok(config)
    }
}
