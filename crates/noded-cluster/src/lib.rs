//! # noded-cluster
//!
//! Capability for reading and writing the cluster directory: the shared
//! mapping from endpoint names to the endpoint strings registered for
//! them, used for cluster-wide service discovery.
//!
//! The registration protocol is read-modify-write with no compare-and-swap;
//! it is designed to be idempotent under eventual consistency, not atomic.
//! Mutation failures are absorbed by the backend rather than surfaced, so
//! the trait carries no error channel.

pub mod memory;

use async_trait::async_trait;

pub use memory::MemoryClusterClient;

/// Node-level options reported by the directory backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterOptions {
    /// This node's own address, used to render endpoint strings.
    pub host_ip: String,
}

/// Capability to read and write the cluster directory.
///
/// One concrete backend per target environment; the Manager only sees this
/// trait.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Reports this node's options.
    fn options(&self) -> ClusterOptions;

    /// Reads the ordered sequence of endpoint strings registered under
    /// `name`. An unknown name reads as the empty sequence.
    async fn get_endpoints(&self, name: &str) -> Vec<String>;

    /// Replaces the sequence registered under `name`.
    async fn set_endpoints(&self, name: &str, endpoints: Vec<String>);
}
