//! In-process cluster directory backend.
//!
//! DashMap gives interior mutability without an explicit lock, so the
//! client can be shared behind `Arc` and mutated through `&self`. Suitable
//! for single-node deployments and as the test double for the Manager.

use crate::{ClusterClient, ClusterOptions};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// DashMap-backed directory of endpoint names to endpoint strings.
#[derive(Clone)]
pub struct MemoryClusterClient {
    host_ip: String,
    entries: Arc<DashMap<String, Vec<String>>>,
}

impl MemoryClusterClient {
    /// Creates an empty directory reporting `host_ip` as this node's
    /// address.
    pub fn new(host_ip: impl Into<String>) -> Self {
        Self {
            host_ip: host_ip.into(),
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Number of endpoint names with a registered entry.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ClusterClient for MemoryClusterClient {
    fn options(&self) -> ClusterOptions {
        ClusterOptions {
            host_ip: self.host_ip.clone(),
        }
    }

    async fn get_endpoints(&self, name: &str) -> Vec<String> {
        self.entries
            .get(name)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    async fn set_endpoints(&self, name: &str, endpoints: Vec<String>) {
        debug!("Set endpoints for {}: {:?}", name, endpoints);
        if endpoints.is_empty() {
            self.entries.remove(name);
        } else {
            self.entries.insert(name.to_string(), endpoints);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_unknown_name_is_empty() {
        let client = MemoryClusterClient::new("10.0.0.5");
        assert!(client.get_endpoints("missing").await.is_empty());
    }

    #[tokio::test]
    async fn test_set_and_get_endpoints() {
        let client = MemoryClusterClient::new("10.0.0.5");
        client
            .set_endpoints("etcd", vec!["10.0.0.5:2379".to_string()])
            .await;

        assert_eq!(client.get_endpoints("etcd").await, vec!["10.0.0.5:2379"]);
        assert_eq!(client.options().host_ip, "10.0.0.5");
    }

    #[tokio::test]
    async fn test_set_empty_removes_entry() {
        let client = MemoryClusterClient::new("10.0.0.5");
        client
            .set_endpoints("etcd", vec!["10.0.0.5:2379".to_string()])
            .await;
        client.set_endpoints("etcd", vec![]).await;

        assert!(client.is_empty());
    }
}
