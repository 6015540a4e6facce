// # Artifact Writer Trait
//
// Defines the interface for reading and persisting rendered artifacts.
//
// ## Implementations
//
// - Atomic file writes: [`crate::artifact::FileArtifactWriter`]
// - In-memory (dry run, tests): [`crate::artifact::MemoryArtifactWriter`]

use async_trait::async_trait;
use std::path::Path;

/// Trait for artifact writer implementations
///
/// # Consistency
///
/// A consumer reading the artifact concurrently with [`write`](Self::write)
/// must see either the old content or the new content, never a prefix of
/// the new content or reordered lines.
#[async_trait]
pub trait ArtifactWriter: Send + Sync {
    /// Read the artifact currently at `path`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(lines))`: The artifact's lines, without terminators
    /// - `Ok(None)`: No artifact exists yet
    /// - `Err(Error)`: The artifact exists but could not be read
    async fn read(&self, path: &Path) -> Result<Option<Vec<String>>, crate::Error>;

    /// Replace the artifact at `path` with `lines`
    ///
    /// Every line is written newline-terminated, in order.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The new artifact is in place
    /// - `Err(Error)`: Nothing was replaced (permissions, disk full, ...)
    async fn write(&self, path: &Path, lines: &[String]) -> Result<(), crate::Error>;
}
