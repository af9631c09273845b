//! Probe-based health evaluator.
//!
//! One background loop per registered service runs its configured check
//! (HTTP GET expecting 2xx, or plain TCP connect) at a fixed interval and
//! keeps a consecutive-failure counter. Connection-refused means nothing
//! is listening and maps to `Death`; every other failure maps to
//! `Unhealthy` with the counter attached. `Healthy` is emitted on recovery
//! transitions rather than every tick.

use crate::watcher::{watcher_pair, Watcher, WatcherHandle};
use crate::{HealthEvaluator, HealthEvent, HealthState};
use async_trait::async_trait;
use dashmap::DashMap;
use http_body_util::Empty;
use hyper::body::Bytes;
use hyper::{Request, Uri};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use noded_service::{HealthCheckKind, HealthCheckSpec};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{interval, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a single probe.
enum ProbeOutcome {
    Healthy,
    Unhealthy(String),
    Dead(String),
}

/// Probe-driven [`HealthEvaluator`] backend.
pub struct ProbeEvaluator {
    specs: DashMap<String, HealthCheckSpec>,
    watchers: Arc<DashMap<String, Vec<WatcherHandle>>>,
    statuses: Arc<DashMap<String, HealthState>>,
    next_id: AtomicU64,
    cancel: CancellationToken,
}

impl ProbeEvaluator {
    pub fn new() -> Self {
        Self {
            specs: DashMap::new(),
            watchers: Arc::new(DashMap::new()),
            statuses: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
            cancel: CancellationToken::new(),
        }
    }

    /// Registers a service for probing. Replaces any previous spec for the
    /// same name; takes effect for loops started afterwards.
    pub fn register(&self, service_name: impl Into<String>, spec: HealthCheckSpec) {
        self.specs.insert(service_name.into(), spec);
    }

    /// Starts one probe loop per registered service.
    pub fn start(&self) {
        for entry in self.specs.iter() {
            let name = entry.key().clone();
            let spec = entry.value().clone();
            let watchers = Arc::clone(&self.watchers);
            let statuses = Arc::clone(&self.statuses);
            let cancel = self.cancel.clone();

            info!("Starting health probe for service {}", name);
            tokio::spawn(async move {
                run_probe_loop(name, spec, watchers, statuses, cancel).await;
            });
        }
    }

    /// Stops all probe loops.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    fn with_handle<F: FnOnce(&WatcherHandle)>(&self, service_name: &str, watcher_id: u64, f: F) {
        if let Some(handles) = self.watchers.get(service_name) {
            if let Some(handle) = handles.iter().find(|h| h.id() == watcher_id) {
                f(handle);
            }
        }
    }
}

impl Default for ProbeEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HealthEvaluator for ProbeEvaluator {
    fn watch_service_healthy(&self, name: &str) -> Option<Watcher> {
        if !self.specs.contains_key(name) {
            return None;
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (handle, watcher) = watcher_pair(name, id);
        self.watchers.entry(name.to_string()).or_default().push(handle);
        debug!("Created watcher {} for service {}", id, name);
        Some(watcher)
    }

    fn enable_watcher(&self, service_name: &str, watcher_id: u64) {
        self.with_handle(service_name, watcher_id, |h| h.enable());
    }

    fn disable_watcher(&self, service_name: &str, watcher_id: u64) {
        self.with_handle(service_name, watcher_id, |h| h.disable());
    }

    async fn current_status(&self, name: &str) -> Option<HealthState> {
        self.statuses.get(name).map(|entry| *entry.value())
    }
}

async fn run_probe_loop(
    name: String,
    spec: HealthCheckSpec,
    watchers: Arc<DashMap<String, Vec<WatcherHandle>>>,
    statuses: Arc<DashMap<String, HealthState>>,
    cancel: CancellationToken,
) {
    let mut ticker = interval(Duration::from_secs(spec.interval_secs.max(1)));
    let mut failures: u32 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancel.cancelled() => {
                debug!("Health probe for service {} stopped", name);
                return;
            }
        }

        let outcome = match spec.kind {
            HealthCheckKind::Tcp => check_tcp(&spec.address).await,
            HealthCheckKind::Http => check_http(&spec.address).await,
        };

        let previous = statuses.get(&name).map(|entry| *entry.value());
        let event = match outcome {
            ProbeOutcome::Healthy => {
                failures = 0;
                statuses.insert(name.clone(), HealthState::Healthy);
                if previous == Some(HealthState::Healthy) {
                    continue;
                }
                HealthEvent::new(&name, HealthState::Healthy, 0)
            }
            ProbeOutcome::Unhealthy(reason) => {
                failures += 1;
                statuses.insert(name.clone(), HealthState::Unhealthy);
                debug!(
                    "Probe failed for service {} ({} consecutive): {}",
                    name, failures, reason
                );
                HealthEvent::new(&name, HealthState::Unhealthy, failures)
            }
            ProbeOutcome::Dead(reason) => {
                failures += 1;
                statuses.insert(name.clone(), HealthState::Death);
                warn!("Service {} looks dead: {}", name, reason);
                HealthEvent::new(&name, HealthState::Death, failures)
            }
        };

        if let Some(mut handles) = watchers.get_mut(&name) {
            handles.retain(|h| !h.is_closed());
            for handle in handles.iter() {
                handle.send(event.clone());
            }
        }
    }
}

async fn check_tcp(address: &str) -> ProbeOutcome {
    match timeout(PROBE_TIMEOUT, TcpStream::connect(address)).await {
        Ok(Ok(_)) => ProbeOutcome::Healthy,
        Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused => {
            ProbeOutcome::Dead(format!("connection refused: {}", address))
        }
        Ok(Err(e)) => ProbeOutcome::Unhealthy(format!("connect failed: {}", e)),
        Err(_) => ProbeOutcome::Unhealthy(format!("connect timeout: {}", address)),
    }
}

async fn check_http(address: &str) -> ProbeOutcome {
    let uri: Uri = match address.parse() {
        Ok(uri) => uri,
        Err(e) => return ProbeOutcome::Unhealthy(format!("invalid probe URL: {}", e)),
    };

    let client = Client::builder(TokioExecutor::new()).build_http();
    let request = match Request::builder()
        .uri(uri)
        .header("User-Agent", "noded/0.1")
        .body(Empty::<Bytes>::new())
    {
        Ok(req) => req,
        Err(e) => return ProbeOutcome::Unhealthy(format!("failed to build request: {}", e)),
    };

    match timeout(PROBE_TIMEOUT, client.request(request)).await {
        Ok(Ok(response)) if response.status().is_success() => ProbeOutcome::Healthy,
        Ok(Ok(response)) => {
            ProbeOutcome::Unhealthy(format!("unexpected status code: {}", response.status()))
        }
        Ok(Err(e)) if e.is_connect() => ProbeOutcome::Dead(format!("connection failed: {}", e)),
        Ok(Err(e)) => ProbeOutcome::Unhealthy(format!("request failed: {}", e)),
        Err(_) => ProbeOutcome::Unhealthy(format!("request timeout: {}", address)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn tcp_spec(address: String) -> HealthCheckSpec {
        HealthCheckSpec {
            kind: HealthCheckKind::Tcp,
            address,
            interval_secs: 1,
        }
    }

    #[tokio::test]
    async fn test_tcp_probe_healthy_against_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        match check_tcp(&addr.to_string()).await {
            ProbeOutcome::Healthy => {}
            _ => panic!("expected healthy probe against live listener"),
        }
    }

    #[tokio::test]
    async fn test_tcp_probe_dead_against_closed_port() {
        // Bind then drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        match check_tcp(&addr.to_string()).await {
            ProbeOutcome::Dead(_) => {}
            _ => panic!("expected death probe against closed port"),
        }
    }

    #[tokio::test]
    async fn test_evaluator_emits_death_events() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let evaluator = ProbeEvaluator::new();
        evaluator.register("etcd", tcp_spec(addr.to_string()));

        let mut watcher = evaluator.watch_service_healthy("etcd").unwrap();
        evaluator.enable_watcher("etcd", watcher.id());
        evaluator.start();

        let event = watcher.recv().await.unwrap();
        assert_eq!(event.name, "etcd");
        assert_eq!(event.state, HealthState::Death);
        assert_eq!(
            evaluator.current_status("etcd").await,
            Some(HealthState::Death)
        );

        evaluator.stop();
    }

    #[tokio::test]
    async fn test_evaluator_unknown_service_has_no_watcher() {
        let evaluator = ProbeEvaluator::new();
        assert!(evaluator.watch_service_healthy("missing").is_none());
        assert_eq!(evaluator.current_status("missing").await, None);
    }

    #[tokio::test]
    async fn test_evaluator_recovery_emits_healthy_once() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let evaluator = ProbeEvaluator::new();
        evaluator.register("api", tcp_spec(addr.to_string()));

        let mut watcher = evaluator.watch_service_healthy("api").unwrap();
        evaluator.enable_watcher("api", watcher.id());
        evaluator.start();

        let event = watcher.recv().await.unwrap();
        assert_eq!(event.state, HealthState::Healthy);

        evaluator.stop();
    }
}
