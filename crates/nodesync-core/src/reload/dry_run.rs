use async_trait::async_trait;

use crate::Error;
use crate::traits::{ReloadOutput, ReloadTrigger};

/// Reload trigger that only logs the command it stands in for
#[derive(Debug, Clone)]
pub struct DryRunReloadTrigger {
    description: String,
}

impl DryRunReloadTrigger {
    /// Create a dry-run trigger standing in for `description`
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

#[async_trait]
impl ReloadTrigger for DryRunReloadTrigger {
    async fn fire(&self) -> Result<ReloadOutput, Error> {
        tracing::info!("[dry-run] would run: {}", self.description);
        Ok(ReloadOutput::default())
    }

    fn describe(&self) -> String {
        format!("dry-run ({})", self.description)
    }
}
