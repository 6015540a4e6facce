// # Reload Trigger Trait
//
// Defines the interface for telling the consumer (firewall daemon, reverse
// proxy) to pick up a freshly written artifact.

use async_trait::async_trait;

/// Output captured from a successful reload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadOutput {
    /// Standard output of the reload, trimmed
    pub stdout: String,
}

/// Trait for reload trigger implementations
///
/// A reload must never be fired before the write it depends on has
/// completed; the loop guarantees this ordering.
#[async_trait]
pub trait ReloadTrigger: Send + Sync {
    /// Fire the reload and wait for it to finish
    ///
    /// # Returns
    ///
    /// - `Ok(ReloadOutput)`: The consumer accepted the reload
    /// - `Err(Error)`: Spawn failure, non-zero exit or timeout
    async fn fire(&self) -> Result<ReloadOutput, crate::Error>;

    /// Human-readable description of what fire() runs (for logging)
    fn describe(&self) -> String;
}
