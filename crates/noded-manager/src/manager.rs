//! The node controller manager.
//!
//! One Manager instance owns the node's service list and two independent
//! cancellation scopes: its own lifecycle token and a per-session token
//! covering all health-watch tasks. `stop()` cancels only the lifecycle
//! token; the health-sync session has its own explicit stop (a deliberate
//! asymmetry of the original design, pinned by tests).

use crate::endpoints;
use noded_cluster::ClusterClient;
use noded_common::{Error, Result};
use noded_controller::ServiceController;
use noded_health::{HealthEvaluator, HealthState, Watcher};
use noded_service::{load_services_from_file, Service};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Sentinel service managed entirely externally; never configured,
/// enabled or removed by this supervisor.
const DOCKER_SERVICE: &str = "docker";

/// Consecutive unhealthy events tolerated before a restart is triggered
/// (trigger fires strictly above this count).
const UNHEALTHY_RESTART_THRESHOLD: u32 = 3;

/// Upper bound on the post-remediation recovery wait.
const RECOVERY_WAIT: Duration = Duration::from_secs(60);

/// Interval between recovery polls.
const RECOVERY_POLL: Duration = Duration::from_secs(1);

/// Manager configuration.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Path of the service list file the service set is (re)loaded from.
    pub services_file: PathBuf,
}

/// Node controller manager: keeps the node's advertised service set in
/// the cluster directory consistent with its actual running set, and
/// self-heals services based on health observation.
pub struct Manager {
    conf: ManagerConfig,
    services: Vec<Service>,
    controller: Arc<dyn ServiceController>,
    cluster: Arc<dyn ClusterClient>,
    health: Arc<dyn HealthEvaluator>,
    cancel: CancellationToken,
    sync_cancel: Option<CancellationToken>,
}

impl Manager {
    pub fn new(
        conf: ManagerConfig,
        controller: Arc<dyn ServiceController>,
        cluster: Arc<dyn ClusterClient>,
        health: Arc<dyn HealthEvaluator>,
    ) -> Self {
        Self {
            conf,
            services: Vec::new(),
            controller,
            cluster,
            health,
            cancel: CancellationToken::new(),
            sync_cancel: None,
        }
    }

    /// The currently managed services.
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Starts the manager by bringing the node online.
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting node controller manager");
        self.online().await
    }

    /// Cancels the manager's own lifecycle scope.
    ///
    /// Does not stop the health-sync session or the managed services;
    /// those are separate, explicit responsibilities.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Brings the node online: loads the service set, registers its
    /// endpoints in the cluster directory, materializes and starts every
    /// service, and starts the health-sync session.
    ///
    /// Any abort leaves partial state as-is; there is no rollback.
    pub async fn online(&mut self) -> Result<()> {
        info!("Doing node online by node controller manager");
        let services = load_services_from_file(&self.conf.services_file).map_err(|e| {
            error!("Failed to load all services: {}", e);
            e
        })?;
        self.services = services;

        // Register local service endpoints into the cluster directory.
        let host_ip = self.cluster.options().host_ip;
        for service in &self.services {
            debug!("Parse endpoints for service: {}", service.name);
            for end in &service.endpoints {
                debug!("Discovery endpoint: {}", end.name);
                let endpoint = end.uri(&host_ip);
                let mut current = self.cluster.get_endpoints(&end.name).await;
                if !endpoints::contains(&current, &endpoint) {
                    current.push(endpoint);
                    self.cluster.set_endpoints(&end.name, current).await;
                }
            }
        }

        self.write_services().await?;

        if !self.controller.check_before_start().await {
            return Err(Error::EnvironmentNotReady);
        }

        if let Err(e) = self.controller.start_list(&self.services).await {
            // Individual start failures surface through health watching.
            warn!("Failed to start some services: {}", e);
        }
        self.start_sync_service();

        Ok(())
    }

    /// Takes the node offline: deregisters endpoints, stops the
    /// health-sync session and stops every service as a batch.
    ///
    /// Directory mutation failures are absorbed by the client; the only
    /// propagated error comes from the batch stop.
    pub async fn offline(&mut self) -> Result<()> {
        info!("Doing node offline by node controller manager");
        let host_ip = self.cluster.options().host_ip;
        for service in &self.services {
            for end in &service.endpoints {
                debug!("Anti-registry endpoint: {}", end.name);
                let endpoint = end.uri(&host_ip);
                let current = self.cluster.get_endpoints(&end.name).await;
                if endpoints::contains(&current, &endpoint) {
                    self.cluster
                        .set_endpoints(&end.name, endpoints::remove(&current, &endpoint))
                        .await;
                }
            }
        }

        self.stop_sync_service();

        self.controller.stop_list(&self.services).await
    }

    /// Reloads the service set from its source and brings everything in
    /// it online again. Semantically a re-run of [`Manager::online`].
    pub async fn reload_services(&mut self) -> Result<()> {
        self.online().await
    }

    /// Starts the health-sync session: a fresh cancellation scope and one
    /// watch task per managed service.
    ///
    /// Known gap, kept from the original design: when a watcher is
    /// missing for one service, setup stops there and services later in
    /// iteration order get no watch task, yet the caller still reports
    /// success.
    pub fn start_sync_service(&mut self) {
        let session = CancellationToken::new();
        self.sync_cancel = Some(session.clone());

        for service in &self.services {
            let name = service.name.clone();
            info!("Start watch status for service: {}", name);
            let watcher = match self.health.watch_service_healthy(&name) {
                Some(watcher) => watcher,
                None => {
                    error!("Not found watcher of the service {}", name);
                    return;
                }
            };

            let health = Arc::clone(&self.health);
            let controller = Arc::clone(&self.controller);
            let cancel = session.clone();
            tokio::spawn(run_watch_task(watcher, health, controller, cancel));
        }
    }

    /// Cancels the health-sync session, stopping every watch task as one
    /// unit. This is the only way the per-service tasks stop.
    pub fn stop_sync_service(&mut self) {
        if let Some(cancel) = self.sync_cancel.take() {
            cancel.cancel();
        }
    }

    /// Polls the service's health once per second until it reports
    /// healthy (true) or `duration` elapses (false).
    pub async fn wait_start(&self, name: &str, duration: Duration) -> bool {
        wait_start(self.health.as_ref(), name, duration).await
    }

    /// Materializes and enables every managed service except the external
    /// `docker` sentinel. Aborts on the first write failure; services
    /// enabled so far stay enabled.
    pub async fn write_services(&self) -> Result<()> {
        for service in &self.services {
            if service.name == DOCKER_SERVICE {
                continue;
            }
            self.controller.write_config(service).await?;
            if let Err(e) = self.controller.enable_service(&service.name).await {
                warn!("Failed to enable service {}: {}", service.name, e);
            }
        }
        Ok(())
    }

    /// Disables and removes the configuration of every managed service
    /// except the `docker` sentinel. Best-effort: every call is attempted
    /// and individual failures are not surfaced.
    pub async fn remove_services(&self) {
        for service in &self.services {
            if service.name == DOCKER_SERVICE {
                continue;
            }
            if let Err(e) = self.controller.disable_service(&service.name).await {
                warn!("Failed to disable service {}: {}", service.name, e);
            }
            if let Err(e) = self.controller.remove_config(&service.name).await {
                warn!("Failed to remove config of service {}: {}", service.name, e);
            }
        }
    }
}

/// Remedial action taken on an adverse health event.
enum RemedialAction {
    Restart,
    Start,
}

/// One watch task per service: consumes health events until the session
/// is cancelled, remediating on adverse ones. The watcher is released
/// exactly once, on the way out.
async fn run_watch_task(
    mut watcher: Watcher,
    health: Arc<dyn HealthEvaluator>,
    controller: Arc<dyn ServiceController>,
    cancel: CancellationToken,
) {
    health.enable_watcher(watcher.service_name(), watcher.id());

    loop {
        tokio::select! {
            maybe_event = watcher.recv() => {
                match maybe_event {
                    Some(event) => {
                        handle_event(&watcher, &health, &controller, event).await;
                    }
                    None => {
                        // Event source is gone; nothing more will arrive.
                        // Hold position until the session is cancelled.
                        cancel.cancelled().await;
                        break;
                    }
                }
            }
            _ = cancel.cancelled() => {
                break;
            }
        }
    }

    watcher.close();
}

async fn handle_event(
    watcher: &Watcher,
    health: &Arc<dyn HealthEvaluator>,
    controller: &Arc<dyn ServiceController>,
    event: noded_health::HealthEvent,
) {
    match event.state {
        HealthState::Healthy => {
            debug!("is [{}] of service {}", event.state, event.name);
        }
        HealthState::Unhealthy => {
            debug!(
                "is [{}] of service {} {} times",
                event.state, event.name, event.error_number
            );
            if event.error_number > UNHEALTHY_RESTART_THRESHOLD {
                info!(
                    "is [{}] of service {} {} times and restart it",
                    event.state, event.name, event.error_number
                );
                remediate(watcher, health, controller, &event.name, RemedialAction::Restart).await;
            }
        }
        HealthState::Death => {
            info!(
                "is [{}] of service {} and start it",
                event.state, event.name
            );
            remediate(watcher, health, controller, &event.name, RemedialAction::Start).await;
        }
    }
}

/// The remediation sequence: disable the watcher (suppressing re-entrant
/// triggers), act, wait bounded for recovery, re-enable unconditionally.
/// The action's own result is not checked; confirmation comes only from
/// the subsequent health status.
async fn remediate(
    watcher: &Watcher,
    health: &Arc<dyn HealthEvaluator>,
    controller: &Arc<dyn ServiceController>,
    name: &str,
    action: RemedialAction,
) {
    health.disable_watcher(watcher.service_name(), watcher.id());

    let (result, operation) = match action {
        RemedialAction::Restart => (controller.restart_service(name).await, "restart"),
        RemedialAction::Start => (controller.start_service(name).await, "start"),
    };
    if let Err(e) = result {
        debug!("Remedial {} call for service {} failed: {}", operation, name, e);
    }

    if !wait_start(health.as_ref(), name, RECOVERY_WAIT).await {
        warn!("Timeout {} service: {}", operation, name);
    }

    health.enable_watcher(watcher.service_name(), watcher.id());
}

/// Polls the current health status once per second until it reports
/// healthy (true) or until `duration` has elapsed (false). The deadline
/// is checked after each poll: a service that becomes healthy only at the
/// poll after the deadline reports false.
pub async fn wait_start(health: &dyn HealthEvaluator, name: &str, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;

    loop {
        sleep(RECOVERY_POLL).await;
        if health.current_status(name).await == Some(HealthState::Healthy) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
    }
}
