//! # noded-controller
//!
//! The service controller capability: materializing a service's runtime
//! configuration and driving it at the OS level. The Manager only sees the
//! [`ServiceController`] trait; [`SystemdController`] is the systemd
//! backend, and [`bootstrap`] holds the one-shot pre-Manager helper that
//! gets the cluster coordination store itself running.

pub mod bootstrap;
pub mod systemd;

use async_trait::async_trait;
use noded_common::Result;
use noded_service::Service;

pub use bootstrap::bootstrap_coordination_store;
pub use systemd::SystemdController;

/// Capability to materialize and drive services at the OS level.
///
/// Every mutating call reports a `Result`; callers decide which failures
/// abort and which are tolerated (the Manager swallows exactly the ones
/// its contract says are best-effort).
#[async_trait]
pub trait ServiceController: Send + Sync {
    /// Renders and installs the runtime configuration for a service.
    async fn write_config(&self, service: &Service) -> Result<()>;

    /// Removes a service's runtime configuration.
    async fn remove_config(&self, name: &str) -> Result<()>;

    /// Enables the service to start at boot.
    async fn enable_service(&self, name: &str) -> Result<()>;

    /// Disables the service from starting at boot.
    async fn disable_service(&self, name: &str) -> Result<()>;

    async fn start_service(&self, name: &str) -> Result<()>;

    async fn stop_service(&self, name: &str) -> Result<()>;

    async fn restart_service(&self, name: &str) -> Result<()>;

    /// Starts every listed service as one batch operation.
    async fn start_list(&self, services: &[Service]) -> Result<()>;

    /// Stops every listed service as one batch operation.
    async fn stop_list(&self, services: &[Service]) -> Result<()>;

    /// Pre-flight environment check; `false` means the node is not ready
    /// to start services.
    async fn check_before_start(&self) -> bool;
}
