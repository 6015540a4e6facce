// # File Address Source
//
// Reads member addresses from a newline-delimited text file.
//
// ## Purpose
//
// A fallback for hosts that cannot reach a cluster API, and a convenient
// source for CI: whatever maintains the file (a provisioning tool, a cron
// job, a human) becomes the inventory.
//
// ## Format
//
// ```text
// # storage nodes
// 10.0.0.5
// 10.0.0.6/24
// fd00::7
// ```
//
// Blank lines and `#` comments are ignored. Lines that do not parse as an
// address are skipped with a warning; they never fail the whole fetch.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::address::{AddressSet, parse_address};
use crate::config::AddressSourceConfig;
use crate::traits::{AddressSource, AddressSourceFactory};
use crate::{Error, Result};

/// Address source backed by a text file, re-read on every fetch
#[derive(Debug, Clone)]
pub struct FileAddressSource {
    path: PathBuf,
}

impl FileAddressSource {
    /// Create a source reading `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the address list
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse the contents of an address list
    pub fn parse(content: &str) -> AddressSet {
        let mut set = AddressSet::new();

        for (number, line) in content.lines().enumerate() {
            let entry = line.split('#').next().unwrap_or_default().trim();
            if entry.is_empty() {
                continue;
            }

            match parse_address(entry) {
                Ok(address) => {
                    set.insert(address);
                }
                Err(e) => {
                    tracing::warn!("Skipping line {} of address list: {}", number + 1, e);
                }
            }
        }

        set
    }
}

#[async_trait]
impl AddressSource for FileAddressSource {
    async fn fetch(&self) -> Result<AddressSet> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::address_source(format!(
                "Failed to read address list {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let addresses = Self::parse(&content);
        tracing::debug!(
            "Read {} address(es) from {}",
            addresses.len(),
            self.path.display()
        );
        Ok(addresses)
    }

    fn source_name(&self) -> &'static str {
        "file"
    }
}

/// Factory for creating file address sources
pub struct FileSourceFactory;

#[async_trait]
impl AddressSourceFactory for FileSourceFactory {
    async fn create(&self, config: &AddressSourceConfig) -> Result<Box<dyn AddressSource>> {
        match config {
            AddressSourceConfig::File { path } => Ok(Box::new(FileAddressSource::new(path))),
            _ => Err(Error::config("Invalid config for file address source")),
        }
    }
}
