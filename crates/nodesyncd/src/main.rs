// # nodesyncd - Node Address Reconciler Daemon
//
// The nodesyncd daemon is a thin integration layer. All reconciliation
// logic lives in nodesync-core; this binary is responsible for:
// 1. Reading configuration from flags and environment variables
// 2. Initializing logging and the runtime
// 3. Registering address sources and renderers
// 4. Running the reconciliation loop until SIGTERM/SIGINT
//
// ## Modes
//
// - `--mode ufw`: keeps `/etc/ufw/user.rules` admitting every node,
//   reloading with `/usr/sbin/ufw reload`
// - `--mode nginx`: keeps `/etc/nginx/upstreams/upstreams.conf` listing
//   every node, reloading with `/bin/systemctl reload nginx`
//
// ## Example
//
// ```bash
// export NODESYNC_MODE=nginx
// export NODESYNC_UPSTREAMS=api:9090,web:8080
// export NODESYNC_POLL_INTERVAL=10
//
// nodesyncd
// ```

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use clap::error::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use nodesync_core::traits::{ArtifactWriter, ReloadTrigger};
use nodesync_core::{
    CommandReloadTrigger, DryRunReloadTrigger, FileArtifactWriter, LoopEvent,
    MemoryArtifactWriter, NodesyncConfig, PluginRegistry, ReconciliationLoop,
};

use crate::cli::Cli;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// How long the loop gets to stop after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum NodesyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<NodesyncExitCode> for ExitCode {
    fn from(code: NodesyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            return NodesyncExitCode::ConfigError.into();
        }
    };

    let config = match cli.to_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return NodesyncExitCode::ConfigError.into();
        }
    };

    // Initialize tracing
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return NodesyncExitCode::ConfigError.into();
    }

    info!("Starting nodesyncd daemon ({:?} mode)", cli.mode);
    if cli.dry_run {
        info!("Dry-run mode: the artifact is logged and no reload is executed");
    }

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return NodesyncExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let (engine, events) = match build_loop(config, cli.dry_run).await {
            Ok(parts) => parts,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return NodesyncExitCode::ConfigError;
            }
        };

        if let Err(e) = run_daemon(engine, events).await {
            error!("Daemon error: {:#}", e);
            NodesyncExitCode::RuntimeError
        } else {
            NodesyncExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Wire the configured components into a reconciliation loop
async fn build_loop(
    config: NodesyncConfig,
    dry_run: bool,
) -> Result<(ReconciliationLoop, mpsc::Receiver<LoopEvent>)> {
    let registry = PluginRegistry::new();

    nodesync_core::source::register(&registry);
    #[cfg(feature = "kube")]
    {
        debug!("Registering Kubernetes address source");
        nodesync_source_kube::register(&registry);
    }
    nodesync_render_ufw::register(&registry);
    nodesync_render_nginx::register(&registry);
    debug!(
        "Registered address sources: {:?}, renderers: {:?}",
        registry.list_sources(),
        registry.list_renderers()
    );

    let source = registry
        .create_source(&config.source)
        .await
        .with_context(|| format!("failed to create {} address source", config.source.type_name()))?;
    let renderer = registry
        .create_renderer(&config.renderer)
        .with_context(|| format!("failed to create {} renderer", config.renderer.type_name()))?;

    let (writer, reload): (Box<dyn ArtifactWriter>, Box<dyn ReloadTrigger>) = if dry_run {
        let command = std::iter::once(config.reload.command.as_str())
            .chain(config.reload.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");

        // Preview against the real file so preserved regions show up
        let memory = MemoryArtifactWriter::new();
        match FileArtifactWriter::new().read(Path::new(&config.artifact.path)).await {
            Ok(Some(existing)) => memory.insert(&config.artifact.path, existing).await,
            Ok(None) => {}
            Err(e) => warn!("Dry-run preview starts without the existing artifact: {}", e),
        }

        (
            Box::new(memory),
            Box::new(DryRunReloadTrigger::new(command)),
        )
    } else {
        (
            Box::new(FileArtifactWriter::new()),
            Box::new(CommandReloadTrigger::from_config(&config.reload)),
        )
    };

    info!(
        "Address source: {}, renderer: {}, artifact: {}",
        source.source_name(),
        renderer.renderer_name(),
        PathBuf::from(&config.artifact.path).display()
    );

    Ok(ReconciliationLoop::new(
        source, renderer, writer, reload, config,
    )?)
}

/// Run the loop until a shutdown signal arrives
async fn run_daemon(
    engine: ReconciliationLoop,
    mut events: mpsc::Receiver<LoopEvent>,
) -> Result<()> {
    let token = CancellationToken::new();
    let loop_token = token.clone();

    let mut handle = tokio::spawn(async move { engine.run(loop_token).await });

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Loop event: {:?}", event);
        }
    });

    let signal = tokio::select! {
        signal = wait_for_shutdown_signal() => signal?,
        joined = &mut handle => {
            joined.context("reconciliation loop task failed")??;
            anyhow::bail!("reconciliation loop exited without a shutdown signal");
        }
    };

    println!("Received {}, shutting down", signal);
    info!("Received shutdown signal: {}", signal);
    token.cancel();

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
        Ok(joined) => {
            joined.context("reconciliation loop task failed")??;
            info!("Shutdown complete");
            Ok(())
        }
        Err(_) => Err(anyhow::anyhow!(
            "Reconciliation loop did not stop within {:?}",
            SHUTDOWN_TIMEOUT
        )),
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let received = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };

    Ok(received)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
