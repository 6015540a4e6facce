// # nodesync-core
//
// Core library for the cluster node address reconciler.
//
// ## Architecture Overview
//
// This library keeps downstream network artifacts (firewall rule files,
// load-balancer upstream files) in step with the set of node addresses in
// a cluster:
// - **AddressSource**: Trait for listing the current member addresses
// - **ConfigRenderer**: Trait for turning an address set into artifact lines
// - **ArtifactWriter**: Trait for persisting rendered artifacts
// - **ReloadTrigger**: Trait for making the consumer pick up a new artifact
// - **ReconciliationLoop**: Poll → compare → render → write → reload cycle
// - **PluginRegistry**: Plugin-based registry for sources and renderers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Idempotency**: Nothing is written or reloaded unless the set changed
// 3. **Plugin-Based**: Sources and renderers are registered, not hard-coded
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Degrade, don't crash**: Every cycle failure is retried on the next tick

pub mod address;
pub mod artifact;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod registry;
pub mod reload;
pub mod source;
pub mod traits;

// Re-export core types for convenience
pub use address::{AddressSet, parse_address};
pub use artifact::{FileArtifactWriter, MemoryArtifactWriter};
pub use config::{AddressSourceConfig, NodesyncConfig, RendererConfig, UpstreamGroup};
pub use diff::{AddressDiff, changed, diff};
pub use engine::{CycleOutcome, LoopEvent, ReconciliationLoop};
pub use error::{Error, Result};
pub use registry::PluginRegistry;
pub use reload::{CommandReloadTrigger, DryRunReloadTrigger};
pub use source::FileAddressSource;
pub use traits::{AddressSource, ArtifactWriter, ConfigRenderer, ReloadTrigger};
