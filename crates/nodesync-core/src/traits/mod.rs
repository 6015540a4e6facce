//! Core traits for the reconciler
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`AddressSource`]: List the current member addresses
//! - [`ConfigRenderer`]: Turn an address set into artifact lines
//! - [`ArtifactWriter`]: Persist rendered artifacts
//! - [`ReloadTrigger`]: Make the consumer pick up a new artifact

pub mod address_source;
pub mod artifact_writer;
pub mod reload_trigger;
pub mod renderer;

pub use address_source::{AddressSource, AddressSourceFactory};
pub use artifact_writer::ArtifactWriter;
pub use reload_trigger::{ReloadOutput, ReloadTrigger};
pub use renderer::{ConfigRenderer, ConfigRendererFactory};
