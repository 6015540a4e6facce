//! Test doubles and common utilities for reconciliation contract tests
//!
//! These doubles record how the loop drives its collaborators without
//! touching a cluster, the filesystem or any external command.

#![allow(dead_code)]

use nodesync_core::config::{
    AddressSourceConfig, ArtifactConfig, EngineConfig, NodesyncConfig, ReloadConfig,
    RendererConfig,
};
use nodesync_core::error::{Error, Result};
use nodesync_core::traits::{
    AddressSource, ArtifactWriter, ConfigRenderer, ReloadOutput, ReloadTrigger,
};
use nodesync_core::{AddressSet, ReconciliationLoop};
use std::collections::VecDeque;
use std::net::IpAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Artifact path used by every test loop
pub const ARTIFACT_PATH: &str = "/etc/nodesync/test.conf";

/// Build an address set from string literals
pub fn addrs(addresses: &[&str]) -> AddressSet {
    addresses
        .iter()
        .map(|s| s.parse::<IpAddr>().expect("valid test address"))
        .collect()
}

/// Shared, ordered record of collaborator calls
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<&'static str>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, call: &'static str) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }
}

/// An AddressSource that replays a script of fetch results
///
/// Once the script is exhausted, the last successful snapshot is returned
/// forever (a quiet cluster).
pub struct ScriptedAddressSource {
    script: Arc<Mutex<VecDeque<std::result::Result<AddressSet, String>>>>,
    last: Arc<Mutex<AddressSet>>,
    fetch_call_count: Arc<AtomicUsize>,
}

impl ScriptedAddressSource {
    pub fn new(script: Vec<std::result::Result<AddressSet, String>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            last: Arc::new(Mutex::new(AddressSet::new())),
            fetch_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of times fetch() was called
    pub fn fetch_call_count(&self) -> usize {
        self.fetch_call_count.load(Ordering::SeqCst)
    }

    /// Create a new source that shares its script and counters with `other`
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            script: Arc::clone(&other.script),
            last: Arc::clone(&other.last),
            fetch_call_count: Arc::clone(&other.fetch_call_count),
        }
    }
}

#[async_trait::async_trait]
impl AddressSource for ScriptedAddressSource {
    async fn fetch(&self) -> Result<AddressSet> {
        self.fetch_call_count.fetch_add(1, Ordering::SeqCst);

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(set)) => {
                *self.last.lock().unwrap() = set.clone();
                Ok(set)
            }
            Some(Err(message)) => Err(Error::address_source(message)),
            None => Ok(self.last.lock().unwrap().clone()),
        }
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// A ConfigRenderer that emits one line per address and counts calls
pub struct CountingRenderer {
    render_call_count: Arc<AtomicUsize>,
    seen_existing: Arc<Mutex<Vec<Option<Vec<String>>>>>,
    uses_existing: bool,
}

impl CountingRenderer {
    pub fn new() -> Self {
        Self {
            render_call_count: Arc::new(AtomicUsize::new(0)),
            seen_existing: Arc::new(Mutex::new(Vec::new())),
            uses_existing: false,
        }
    }

    /// A renderer that asks the loop for the existing artifact
    pub fn preserving() -> Self {
        Self {
            uses_existing: true,
            ..Self::new()
        }
    }

    /// Get the number of times render() was called
    pub fn render_call_count(&self) -> usize {
        self.render_call_count.load(Ordering::SeqCst)
    }

    /// The `existing` argument of every render() call, in order
    pub fn seen_existing(&self) -> Vec<Option<Vec<String>>> {
        self.seen_existing.lock().unwrap().clone()
    }

    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            render_call_count: Arc::clone(&other.render_call_count),
            seen_existing: Arc::clone(&other.seen_existing),
            uses_existing: other.uses_existing,
        }
    }
}

impl ConfigRenderer for CountingRenderer {
    fn render(&self, addresses: &AddressSet, existing: Option<&[String]>) -> Vec<String> {
        self.render_call_count.fetch_add(1, Ordering::SeqCst);
        self.seen_existing
            .lock()
            .unwrap()
            .push(existing.map(|lines| lines.to_vec()));

        addresses.iter().map(|a| format!("allow {}", a)).collect()
    }

    fn uses_existing(&self) -> bool {
        self.uses_existing
    }

    fn renderer_name(&self) -> &'static str {
        "counting"
    }
}

/// An ArtifactWriter that keeps the last artifact in memory
pub struct RecordingWriter {
    write_call_count: Arc<AtomicUsize>,
    content: Arc<Mutex<Option<Vec<String>>>>,
    fail_writes: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
    log: CallLog,
}

impl RecordingWriter {
    pub fn new(log: CallLog) -> Self {
        Self {
            write_call_count: Arc::new(AtomicUsize::new(0)),
            content: Arc::new(Mutex::new(None)),
            fail_writes: Arc::new(AtomicBool::new(false)),
            fail_reads: Arc::new(AtomicBool::new(false)),
            log,
        }
    }

    /// Get the number of times write() was called (including failures)
    pub fn write_call_count(&self) -> usize {
        self.write_call_count.load(Ordering::SeqCst)
    }

    /// Last successfully written artifact
    pub fn content(&self) -> Option<Vec<String>> {
        self.content.lock().unwrap().clone()
    }

    /// Seed the artifact as if an operator had written it
    pub fn seed(&self, lines: &[&str]) {
        *self.content.lock().unwrap() = Some(lines.iter().map(|s| s.to_string()).collect());
    }

    /// Make every subsequent write fail (permission denied)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent read fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            write_call_count: Arc::clone(&other.write_call_count),
            content: Arc::clone(&other.content),
            fail_writes: Arc::clone(&other.fail_writes),
            fail_reads: Arc::clone(&other.fail_reads),
            log: other.log.clone(),
        }
    }
}

#[async_trait::async_trait]
impl ArtifactWriter for RecordingWriter {
    async fn read(&self, _path: &Path) -> Result<Option<Vec<String>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::artifact("Permission denied (os error 13)"));
        }
        Ok(self.content.lock().unwrap().clone())
    }

    async fn write(&self, _path: &Path, lines: &[String]) -> Result<()> {
        self.write_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::artifact("Permission denied (os error 13)"));
        }

        *self.content.lock().unwrap() = Some(lines.to_vec());
        self.log.push("write");
        Ok(())
    }
}

/// A ReloadTrigger that counts calls and can fail or hang
pub struct CountingReloadTrigger {
    fire_call_count: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
    delay: Option<Duration>,
    log: CallLog,
}

impl CountingReloadTrigger {
    pub fn new(log: CallLog) -> Self {
        Self {
            fire_call_count: Arc::new(AtomicUsize::new(0)),
            fail: Arc::new(AtomicBool::new(false)),
            delay: None,
            log,
        }
    }

    /// A trigger whose reload takes `delay` before returning
    pub fn slow(log: CallLog, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(log)
        }
    }

    /// Get the number of times fire() was called
    pub fn fire_call_count(&self) -> usize {
        self.fire_call_count.load(Ordering::SeqCst)
    }

    /// Make every subsequent reload exit non-zero
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            fire_call_count: Arc::clone(&other.fire_call_count),
            fail: Arc::clone(&other.fail),
            delay: other.delay,
            log: other.log.clone(),
        }
    }
}

#[async_trait::async_trait]
impl ReloadTrigger for CountingReloadTrigger {
    async fn fire(&self) -> Result<ReloadOutput> {
        self.fire_call_count.fetch_add(1, Ordering::SeqCst);
        self.log.push("reload");

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::reload("exit status: 1"));
        }

        Ok(ReloadOutput {
            stdout: "Firewall reloaded".to_string(),
        })
    }

    fn describe(&self) -> String {
        "counting reload".to_string()
    }
}

/// Helper to create a minimal NodesyncConfig for testing
pub fn minimal_config() -> NodesyncConfig {
    NodesyncConfig {
        source: AddressSourceConfig::File {
            path: "/dev/null".to_string(),
        },
        renderer: RendererConfig::Custom {
            factory: "counting".to_string(),
            config: serde_json::json!({}),
        },
        artifact: ArtifactConfig {
            path: ARTIFACT_PATH.to_string(),
        },
        reload: ReloadConfig {
            command: "/bin/true".to_string(),
            args: Vec::new(),
            timeout_secs: 0,
        },
        engine: EngineConfig {
            poll_interval_secs: 5,
            reload_delay_secs: 0,
            event_channel_capacity: 100,
        },
    }
}

/// Doubles wired into a loop, with handles that share their counters
pub struct Harness {
    pub source: ScriptedAddressSource,
    pub renderer: CountingRenderer,
    pub writer: RecordingWriter,
    pub reload: CountingReloadTrigger,
    pub log: CallLog,
}

impl Harness {
    pub fn new(script: Vec<std::result::Result<AddressSet, String>>) -> Self {
        let log = CallLog::new();
        Self {
            source: ScriptedAddressSource::new(script),
            renderer: CountingRenderer::new(),
            writer: RecordingWriter::new(log.clone()),
            reload: CountingReloadTrigger::new(log.clone()),
            log,
        }
    }

    /// Build a loop whose collaborators share counters with this harness
    pub fn build(
        &self,
    ) -> (
        ReconciliationLoop,
        tokio::sync::mpsc::Receiver<nodesync_core::LoopEvent>,
    ) {
        ReconciliationLoop::new(
            Box::new(ScriptedAddressSource::sharing_counters_with(&self.source)),
            Box::new(CountingRenderer::sharing_counters_with(&self.renderer)),
            Box::new(RecordingWriter::sharing_counters_with(&self.writer)),
            Box::new(CountingReloadTrigger::sharing_counters_with(&self.reload)),
            minimal_config(),
        )
        .expect("loop construction succeeds")
    }
}
