//! Per-service health watchers.
//!
//! A watcher is one half of a bounded channel: the evaluator holds the
//! producing [`WatcherHandle`], the Manager's watch task holds the
//! consuming [`Watcher`]. The handle drops events while the watcher is
//! disabled or after it has been closed, so a disabled watcher emits
//! nothing without tearing the channel down.

use crate::HealthEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug)]
struct WatcherShared {
    enabled: AtomicBool,
    closed: AtomicBool,
}

/// Consumer side of a health watch, identified by `(service_name, id)`.
#[derive(Debug)]
pub struct Watcher {
    service_name: String,
    id: u64,
    rx: mpsc::Receiver<HealthEvent>,
    shared: Arc<WatcherShared>,
}

impl Watcher {
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Receives the next health event. Returns `None` once the producing
    /// side is gone.
    pub async fn recv(&mut self) -> Option<HealthEvent> {
        self.rx.recv().await
    }

    /// Releases the watcher. Sends after this point are dropped by the
    /// producing handle.
    pub fn close(&mut self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.rx.close();
        debug!("Closed watcher {} for service {}", self.id, self.service_name);
    }
}

/// Producer side of a health watch, held by the evaluator.
#[derive(Debug, Clone)]
pub struct WatcherHandle {
    service_name: String,
    id: u64,
    tx: mpsc::Sender<HealthEvent>,
    shared: Arc<WatcherShared>,
}

impl WatcherHandle {
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn enable(&self) {
        self.shared.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.shared.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Emits an event to the consumer. Dropped silently while the watcher
    /// is disabled or after it has been closed; a full channel also drops
    /// (health events are superseded by the next probe tick).
    pub fn send(&self, event: HealthEvent) {
        if !self.is_enabled() || self.is_closed() {
            return;
        }
        if let Err(e) = self.tx.try_send(event) {
            debug!(
                "Dropped health event for service {}: {}",
                self.service_name, e
            );
        }
    }
}

/// Creates a connected watcher pair for `service_name`.
///
/// Watchers start disabled; the watch task enables them on entry.
pub fn watcher_pair(service_name: impl Into<String>, id: u64) -> (WatcherHandle, Watcher) {
    let service_name = service_name.into();
    let (tx, rx) = mpsc::channel(16);
    let shared = Arc::new(WatcherShared {
        enabled: AtomicBool::new(false),
        closed: AtomicBool::new(false),
    });

    let handle = WatcherHandle {
        service_name: service_name.clone(),
        id,
        tx,
        shared: Arc::clone(&shared),
    };
    let watcher = Watcher {
        service_name,
        id,
        rx,
        shared,
    };
    (handle, watcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HealthState;

    #[tokio::test]
    async fn test_disabled_watcher_emits_nothing() {
        let (handle, mut watcher) = watcher_pair("etcd", 1);

        handle.send(HealthEvent::new("etcd", HealthState::Healthy, 0));
        assert!(watcher.rx.try_recv().is_err());

        handle.enable();
        handle.send(HealthEvent::new("etcd", HealthState::Healthy, 0));
        let event = watcher.recv().await.unwrap();
        assert_eq!(event.state, HealthState::Healthy);
    }

    #[tokio::test]
    async fn test_disable_suppresses_further_events() {
        let (handle, mut watcher) = watcher_pair("etcd", 1);
        handle.enable();

        handle.send(HealthEvent::new("etcd", HealthState::Unhealthy, 4));
        handle.disable();
        handle.send(HealthEvent::new("etcd", HealthState::Unhealthy, 5));

        let event = watcher.recv().await.unwrap();
        assert_eq!(event.error_number, 4);
        assert!(watcher.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_close_is_observable_from_handle() {
        let (handle, mut watcher) = watcher_pair("etcd", 7);
        handle.enable();
        assert!(!handle.is_closed());

        watcher.close();
        assert!(handle.is_closed());

        // Sends after close are dropped without error.
        handle.send(HealthEvent::new("etcd", HealthState::Death, 0));
    }
}
