//! Reconciliation loop
//!
//! The ReconciliationLoop is responsible for:
//! - Polling the AddressSource on a fixed interval
//! - Comparing each snapshot with the last applied one
//! - Rendering and writing the artifact when the set changed
//! - Firing the reload once the write has completed
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐
//! │ AddressSource │─── AddressSet ───┐
//! └───────────────┘                  │
//!                                    ▼
//!                        ┌────────────────────┐
//!                        │ ReconciliationLoop │ ── changed(previous, current)?
//!                        └────────────────────┘
//!                                    │
//!         ┌──────────────────────────┼──────────────────────────┐
//!         │                          │                          │
//!         ▼                          ▼                          ▼
//! ┌────────────────┐        ┌────────────────┐        ┌────────────────┐
//! │ ConfigRenderer │ ─────▶ │ ArtifactWriter │ ─────▶ │ ReloadTrigger  │
//! │ (render)       │        │ (write)        │        │ (fire)         │
//! └────────────────┘        └────────────────┘        └────────────────┘
//! ```
//!
//! ## State Machine
//!
//! ```text
//! Idle ─▶ Fetching ─┬─ unchanged / fetch error ──────────────────────▶ Idle
//!                   └─ changed ─▶ Rendering ─▶ Writing ─┬─ error ────▶ Idle
//!                                                       └─▶ Reloading ─▶ Idle
//! ```
//!
//! Every pass through Idle sleeps one poll interval. The last applied
//! snapshot is a local of [`ReconciliationLoop::run`] and only advances
//! once the artifact for it is on disk.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::address::AddressSet;
use crate::config::NodesyncConfig;
use crate::diff::{changed, diff};
use crate::error::Result;
use crate::traits::{AddressSource, ArtifactWriter, ConfigRenderer, ReloadTrigger};

/// Events emitted by the ReconciliationLoop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopEvent {
    /// Loop started
    Started {
        source: String,
        renderer: String,
    },

    /// Snapshot matches the last applied set
    Unchanged {
        count: usize,
    },

    /// Snapshot differs from the last applied set
    ChangeDetected {
        added: Vec<IpAddr>,
        removed: Vec<IpAddr>,
    },

    /// Address source could not be queried
    FetchFailed {
        error: String,
    },

    /// New artifact is on disk
    ArtifactWritten {
        path: PathBuf,
        lines: usize,
    },

    /// Artifact could not be written; reload skipped
    WriteFailed {
        path: PathBuf,
        error: String,
    },

    /// Consumer reloaded
    ReloadSucceeded {
        output: String,
    },

    /// Reload failed; the artifact stays on disk
    ReloadFailed {
        error: String,
    },

    /// Loop stopped
    Stopped {
        reason: String,
    },
}

/// Result of a single reconciliation cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Source could not be queried; nothing else happened
    FetchFailed,

    /// Snapshot equals the last applied set; nothing written
    Unchanged(AddressSet),

    /// Artifact written and consumer reloaded
    Applied(AddressSet),

    /// Artifact written but the reload failed
    ReloadFailed(AddressSet),

    /// Artifact could not be written; reload skipped
    WriteFailed,

    /// Shutdown requested after the write, before the reload
    Cancelled(AddressSet),
}

impl CycleOutcome {
    /// The snapshot the loop should compare against next cycle
    ///
    /// `None` keeps the previous snapshot so the whole cycle is retried.
    pub fn applied_snapshot(self) -> Option<AddressSet> {
        match self {
            CycleOutcome::Unchanged(set)
            | CycleOutcome::Applied(set)
            | CycleOutcome::ReloadFailed(set)
            | CycleOutcome::Cancelled(set) => Some(set),
            CycleOutcome::FetchFailed | CycleOutcome::WriteFailed => None,
        }
    }
}

/// Core reconciliation loop
///
/// Orchestrates the snapshot → compare → render → write → reload flow.
///
/// ## Lifecycle
///
/// 1. Create with [`ReconciliationLoop::new()`]
/// 2. Start with [`ReconciliationLoop::run()`], passing a cancellation token
/// 3. Cancel the token to stop; the loop exits at its next checkpoint
///
/// ## Concurrency
///
/// Cycles never overlap: fetch, compare, render, write and reload run
/// strictly in sequence on the task that calls `run()`. The only state
/// carried between cycles is the last applied snapshot, owned by `run()`.
///
/// ## Cancellation
///
/// The token is checked before every cycle, raced against the poll sleep,
/// checked again between write and reload, and raced against the reload
/// itself, so a hung reload command cannot block shutdown.
pub struct ReconciliationLoop {
    /// Where member addresses come from
    source: Box<dyn AddressSource>,

    /// Turns addresses into artifact lines
    renderer: Box<dyn ConfigRenderer>,

    /// Persists the artifact
    writer: Box<dyn ArtifactWriter>,

    /// Tells the consumer to reload
    reload: Box<dyn ReloadTrigger>,

    /// Artifact location
    artifact_path: PathBuf,

    /// Sleep between cycles
    poll_interval: Duration,

    /// Pause between write and reload
    reload_delay: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<LoopEvent>,
}

impl ReconciliationLoop {
    /// Create a new reconciliation loop
    ///
    /// # Parameters
    ///
    /// - `source`: Address source implementation
    /// - `renderer`: Renderer implementation
    /// - `writer`: Artifact writer implementation
    /// - `reload`: Reload trigger implementation
    /// - `config`: Reconciler configuration
    ///
    /// # Returns
    ///
    /// A tuple of (loop, event_receiver) where event_receiver yields loop events
    pub fn new(
        source: Box<dyn AddressSource>,
        renderer: Box<dyn ConfigRenderer>,
        writer: Box<dyn ArtifactWriter>,
        reload: Box<dyn ReloadTrigger>,
        config: NodesyncConfig,
    ) -> Result<(Self, mpsc::Receiver<LoopEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            source,
            renderer,
            writer,
            reload,
            artifact_path: PathBuf::from(config.artifact.path),
            poll_interval: Duration::from_secs(config.engine.poll_interval_secs),
            reload_delay: Duration::from_secs(config.engine.reload_delay_secs),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Override the poll interval
    ///
    /// Configuration is expressed in whole seconds; embedders and tests
    /// that need a finer interval set it here.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override the pause between write and reload
    pub fn with_reload_delay(mut self, delay: Duration) -> Self {
        self.reload_delay = delay;
        self
    }

    /// Run the loop until `shutdown` is cancelled
    ///
    /// Starts from an empty snapshot, so the first successful fetch with at
    /// least one member always writes the artifact.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        self.emit_event(LoopEvent::Started {
            source: self.source.source_name().to_string(),
            renderer: self.renderer.renderer_name().to_string(),
        });
        info!(
            "Reconciling {} from {} source every {:?}",
            self.artifact_path.display(),
            self.source.source_name(),
            self.poll_interval
        );

        let mut previous = AddressSet::new();

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let outcome = self.reconcile(&previous, &shutdown).await;
            if let Some(snapshot) = outcome.applied_snapshot() {
                previous = snapshot;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.cancelled() => break,
            }
        }

        info!("Shutdown signal received, reconciliation loop stopped");
        self.emit_event(LoopEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });

        Ok(())
    }

    /// Run one reconciliation cycle against `previous`
    ///
    /// Never fails: every error is logged, emitted as an event and folded
    /// into the returned [`CycleOutcome`].
    pub async fn reconcile(
        &self,
        previous: &AddressSet,
        shutdown: &CancellationToken,
    ) -> CycleOutcome {
        debug!("Fetching addresses from {}", self.source.source_name());

        let current = match self.source.fetch().await {
            Ok(current) => current,
            Err(e) => {
                error!("Failed to fetch addresses, keeping previous snapshot: {}", e);
                self.emit_event(LoopEvent::FetchFailed {
                    error: e.to_string(),
                });
                return CycleOutcome::FetchFailed;
            }
        };

        if !changed(previous, &current) {
            debug!("No changes detected ({} addresses)", current.len());
            self.emit_event(LoopEvent::Unchanged {
                count: current.len(),
            });
            return CycleOutcome::Unchanged(current);
        }

        let delta = diff(previous, &current);
        info!(
            "Address set changed from {} to {} members (added: {:?}, removed: {:?})",
            previous.len(),
            current.len(),
            delta.added,
            delta.removed
        );
        self.emit_event(LoopEvent::ChangeDetected {
            added: delta.added,
            removed: delta.removed,
        });

        let existing = self.read_existing().await;
        let lines = self.renderer.render(&current, existing.as_deref());

        if let Err(e) = self.writer.write(&self.artifact_path, &lines).await {
            error!(
                "Failed to write {}, skipping reload: {}",
                self.artifact_path.display(),
                e
            );
            self.emit_event(LoopEvent::WriteFailed {
                path: self.artifact_path.clone(),
                error: e.to_string(),
            });
            return CycleOutcome::WriteFailed;
        }

        info!(
            "Wrote {} ({} lines)",
            self.artifact_path.display(),
            lines.len()
        );
        self.emit_event(LoopEvent::ArtifactWritten {
            path: self.artifact_path.clone(),
            lines: lines.len(),
        });

        if !self.reload_delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(self.reload_delay) => {}
                _ = shutdown.cancelled() => {}
            }
        }

        if shutdown.is_cancelled() {
            warn!("Shutdown requested before reload; artifact is written but not reloaded");
            return CycleOutcome::Cancelled(current);
        }

        info!("Reloading using command: {}", self.reload.describe());
        let result = tokio::select! {
            result = self.reload.fire() => result,
            _ = shutdown.cancelled() => {
                warn!("Shutdown requested during reload; reload abandoned");
                return CycleOutcome::Cancelled(current);
            }
        };

        match result {
            Ok(output) => {
                info!("Reload completed with: {}", output.stdout);
                self.emit_event(LoopEvent::ReloadSucceeded {
                    output: output.stdout,
                });
                CycleOutcome::Applied(current)
            }
            Err(e) => {
                error!("Reload failed, artifact remains on disk: {}", e);
                self.emit_event(LoopEvent::ReloadFailed {
                    error: e.to_string(),
                });
                CycleOutcome::ReloadFailed(current)
            }
        }
    }

    /// Read the current artifact for renderers that preserve content
    ///
    /// A read failure degrades to "no existing artifact".
    async fn read_existing(&self) -> Option<Vec<String>> {
        if !self.renderer.uses_existing() {
            return None;
        }

        match self.writer.read(&self.artifact_path).await {
            Ok(existing) => existing,
            Err(e) => {
                warn!(
                    "Could not read existing artifact {}, rendering without it: {}",
                    self.artifact_path.display(),
                    e
                );
                None
            }
        }
    }

    /// Emit a loop event
    fn emit_event(&self, event: LoopEvent) {
        // Send event, logging warning if channel is full (backpressure)
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(addresses: &[&str]) -> AddressSet {
        addresses.iter().map(|s| s.parse::<IpAddr>().unwrap()).collect()
    }

    #[test]
    fn test_failed_outcomes_keep_previous_snapshot() {
        assert_eq!(CycleOutcome::FetchFailed.applied_snapshot(), None);
        assert_eq!(CycleOutcome::WriteFailed.applied_snapshot(), None);
    }

    #[test]
    fn test_written_outcomes_advance_snapshot() {
        let s = set(&["10.0.0.5"]);
        assert_eq!(
            CycleOutcome::ReloadFailed(s.clone()).applied_snapshot(),
            Some(s.clone())
        );
        assert_eq!(
            CycleOutcome::Cancelled(s.clone()).applied_snapshot(),
            Some(s)
        );
    }
}
