// # File Artifact Writer
//
// File-based implementation of ArtifactWriter.
//
// ## Consistency
//
// - Atomic writes: New content goes to a sibling temporary file, is flushed
//   and fsynced, then renamed over the target
// - The temporary file lives in the target's directory so the rename never
//   crosses a filesystem
// - Permissions of an existing artifact are carried over to the new one
// - On any failure the temporary file is removed and the old artifact is
//   left untouched

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::traits::ArtifactWriter;

/// Suffix appended to the artifact file name for the in-flight copy
const TEMP_SUFFIX: &str = ".nodesync-tmp";

/// File-based artifact writer with atomic replacement
///
/// # Example
///
/// ```rust,no_run
/// use nodesync_core::artifact::FileArtifactWriter;
/// use nodesync_core::traits::ArtifactWriter;
/// use std::path::Path;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let writer = FileArtifactWriter::new();
///     let path = Path::new("/etc/nginx/upstreams/upstreams.conf");
///
///     writer
///         .write(path, &["upstream api {".to_string(), "}".to_string()])
///         .await?;
///
///     assert!(writer.read(path).await?.is_some());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileArtifactWriter;

impl FileArtifactWriter {
    /// Create a new file artifact writer
    pub fn new() -> Self {
        Self
    }

    /// Get path to the temporary file used while writing `path`
    fn temp_path(path: &Path) -> PathBuf {
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(TEMP_SUFFIX);
        path.with_file_name(name)
    }

    /// Serialize lines, each newline-terminated
    fn serialize(lines: &[String]) -> String {
        let mut content = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
        for line in lines {
            content.push_str(line);
            content.push('\n');
        }
        content
    }

    /// Split file content into lines on `\n` only
    ///
    /// A trailing `\r` stays part of its line, so CRLF content is written
    /// back byte-for-byte by [`Self::serialize`].
    fn parse(content: &str) -> Vec<String> {
        if content.is_empty() {
            return Vec::new();
        }

        content
            .strip_suffix('\n')
            .unwrap_or(content)
            .split('\n')
            .map(str::to_string)
            .collect()
    }

    async fn write_temp(temp_path: &Path, target: &Path, content: &[u8]) -> Result<(), Error> {
        let mut file = fs::File::create(temp_path).await.map_err(|e| {
            Error::artifact(format!(
                "Failed to create temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        file.write_all(content).await.map_err(|e| {
            Error::artifact(format!(
                "Failed to write to temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        file.flush().await.map_err(|e| {
            Error::artifact(format!(
                "Failed to flush temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            Error::artifact(format!(
                "Failed to sync temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        // Keep the consumer's view of ownership bits stable across rewrites
        if let Ok(metadata) = fs::metadata(target).await {
            if let Err(e) = fs::set_permissions(temp_path, metadata.permissions()).await {
                tracing::warn!(
                    "Failed to copy permissions from {}: {}",
                    target.display(),
                    e
                );
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ArtifactWriter for FileArtifactWriter {
    async fn read(&self, path: &Path) -> Result<Option<Vec<String>>, Error> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(Self::parse(&content))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Artifact does not exist yet: {}", path.display());
                Ok(None)
            }
            Err(e) => Err(Error::artifact(format!(
                "Failed to read artifact {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn write(&self, path: &Path, lines: &[String]) -> Result<(), Error> {
        let temp_path = Self::temp_path(path);
        let content = Self::serialize(lines);

        if let Err(e) = Self::write_temp(&temp_path, path, content.as_bytes()).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        // Atomic rename (temp -> actual)
        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(Error::artifact(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )));
        }

        tracing::trace!("Artifact written: {} ({} lines)", path.display(), lines.len());
        Ok(())
    }
}
