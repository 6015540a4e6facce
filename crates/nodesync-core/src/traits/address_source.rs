// # Address Source Trait
//
// Defines the interface for observing the set of member addresses.
//
// ## Implementations
//
// - Kubernetes node list: `nodesync-source-kube` crate
// - Address list file: [`crate::source::FileAddressSource`]
//
// ## Usage
//
// ```rust,ignore
// use nodesync_core::AddressSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* AddressSource implementation */;
//
//     let addresses = source.fetch().await?;
//     println!("{} members: {}", addresses.len(), addresses);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::address::AddressSet;

/// Trait for address source implementations
///
/// A source answers one question: which addresses are members right now?
/// Implementations must be thread-safe and usable across async tasks.
///
/// ## Allowed
/// - Read-only queries against the inventory
/// - Skipping members that carry no usable address (log, don't fail)
///
/// ## Forbidden
/// - Retrying internally (the loop retries on its next tick)
/// - Caching between calls (each fetch is a fresh snapshot)
/// - Deciding whether anything changed (owned by the loop)
#[async_trait]
pub trait AddressSource: Send + Sync {
    /// Fetch the current address set
    ///
    /// # Returns
    ///
    /// - `Ok(AddressSet)`: Every member that published an address
    /// - `Err(Error)`: If the inventory could not be reached or queried
    async fn fetch(&self) -> Result<AddressSet, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}

/// Helper trait for constructing address sources from configuration
///
/// Creation is async because some sources (the Kubernetes client) resolve
/// credentials and endpoints while connecting.
#[async_trait]
pub trait AddressSourceFactory: Send + Sync {
    /// Create an AddressSource instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this source type
    ///
    /// # Returns
    ///
    /// A boxed AddressSource trait object
    async fn create(
        &self,
        config: &crate::config::AddressSourceConfig,
    ) -> Result<Box<dyn AddressSource>, crate::Error>;
}
