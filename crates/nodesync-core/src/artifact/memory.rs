// # Memory Artifact Writer
//
// In-memory implementation of ArtifactWriter.
//
// ## Purpose
//
// Backs the daemon's dry-run mode: artifacts are rendered and logged but
// never touch the filesystem. Also useful for embedding and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::ArtifactWriter;

/// In-memory artifact writer
///
/// Artifacts are kept in a map keyed by path. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryArtifactWriter {
    inner: Arc<RwLock<HashMap<PathBuf, Vec<String>>>>,
}

impl MemoryArtifactWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an artifact, as if an operator had written it
    pub async fn insert(&self, path: impl Into<PathBuf>, lines: Vec<String>) {
        self.inner.write().await.insert(path.into(), lines);
    }

    /// Get the artifact stored at `path`
    pub async fn get(&self, path: &Path) -> Option<Vec<String>> {
        self.inner.read().await.get(path).cloned()
    }

    /// Number of stored artifacts
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if no artifact has been stored
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl ArtifactWriter for MemoryArtifactWriter {
    async fn read(&self, path: &Path) -> Result<Option<Vec<String>>, Error> {
        Ok(self.get(path).await)
    }

    async fn write(&self, path: &Path, lines: &[String]) -> Result<(), Error> {
        for line in lines {
            tracing::info!("[dry-run] {}: {}", path.display(), line);
        }
        self.inner
            .write()
            .await
            .insert(path.to_path_buf(), lines.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_writer_basic() {
        let writer = MemoryArtifactWriter::new();
        let path = Path::new("/etc/ufw/user.rules");

        assert!(writer.is_empty().await);
        assert_eq!(writer.read(path).await.unwrap(), None);

        let lines = vec!["### RULES ###".to_string(), "### END RULES ###".to_string()];
        writer.write(path, &lines).await.unwrap();

        assert_eq!(writer.len().await, 1);
        assert_eq!(writer.read(path).await.unwrap(), Some(lines));
    }

    #[tokio::test]
    async fn test_clones_share_storage() {
        let writer = MemoryArtifactWriter::new();
        let clone = writer.clone();

        clone.insert("/tmp/a", vec!["x".to_string()]).await;

        assert_eq!(writer.get(Path::new("/tmp/a")).await, Some(vec!["x".to_string()]));
    }
}
