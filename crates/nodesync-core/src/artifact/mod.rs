// # Artifact Writer Implementations
//
// This module provides implementations of the ArtifactWriter trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::FileArtifactWriter;
pub use memory::MemoryArtifactWriter;
