//! # noded-health
//!
//! Health observation for managed services: transition events, per-service
//! watchers with an enable/disable gate, the `HealthEvaluator` capability
//! the Manager consumes, and a probe-based evaluator backend (HTTP/TCP
//! checks).

pub mod probe;
pub mod watcher;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use probe::ProbeEvaluator;
pub use watcher::{watcher_pair, Watcher, WatcherHandle};

/// Observed health of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// The service answers its probe.
    Healthy,
    /// The service is reachable but failing its probe; carries a
    /// consecutive-failure counter in the event.
    Unhealthy,
    /// The service process is absent or crashed.
    Death,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Healthy => "healthy",
            HealthState::Unhealthy => "unhealthy",
            HealthState::Death => "death",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A health transition event for one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthEvent {
    /// Service name.
    pub name: String,

    pub state: HealthState,

    /// Consecutive-failure counter; meaningful only for `Unhealthy`.
    pub error_number: u32,

    pub observed_at: DateTime<Utc>,
}

impl HealthEvent {
    pub fn new(name: impl Into<String>, state: HealthState, error_number: u32) -> Self {
        Self {
            name: name.into(),
            state,
            error_number,
            observed_at: Utc::now(),
        }
    }
}

/// Capability to observe service health.
///
/// One watcher per service; the enabled/disabled flag on a watcher is the
/// sole device suppressing event emission while remediation is in flight.
#[async_trait]
pub trait HealthEvaluator: Send + Sync {
    /// Obtains a watcher for the named service, or `None` when the
    /// evaluator knows nothing about it.
    fn watch_service_healthy(&self, name: &str) -> Option<Watcher>;

    /// Resumes event emission for the identified watcher.
    fn enable_watcher(&self, service_name: &str, watcher_id: u64);

    /// Suspends event emission for the identified watcher.
    fn disable_watcher(&self, service_name: &str, watcher_id: u64);

    /// Queries the current status of a service on demand.
    async fn current_status(&self, name: &str) -> Option<HealthState>;
}
