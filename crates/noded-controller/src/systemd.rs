//! systemd backend for the service controller.

use crate::ServiceController;
use async_trait::async_trait;
use noded_common::{Error, Result};
use noded_service::{render_unit, Service};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

const DEFAULT_SYSTEMCTL: &str = "/usr/bin/systemctl";
const DEFAULT_UNIT_DIR: &str = "/etc/systemd/system";

/// Drives services through systemd: renders unit files into `unit_dir`
/// and shells out to `systemctl` for lifecycle operations.
pub struct SystemdController {
    systemctl: PathBuf,
    unit_dir: PathBuf,
}

impl SystemdController {
    pub fn new() -> Self {
        Self {
            systemctl: PathBuf::from(DEFAULT_SYSTEMCTL),
            unit_dir: PathBuf::from(DEFAULT_UNIT_DIR),
        }
    }

    /// Overrides the systemctl binary and unit directory. Used by tests
    /// and non-standard installations.
    pub fn with_paths(systemctl: impl Into<PathBuf>, unit_dir: impl Into<PathBuf>) -> Self {
        Self {
            systemctl: systemctl.into(),
            unit_dir: unit_dir.into(),
        }
    }

    fn unit_path(&self, name: &str) -> PathBuf {
        self.unit_dir.join(format!("{}.service", name))
    }

    async fn systemctl(&self, operation: &str, unit: &str) -> Result<()> {
        debug!("systemctl {} {}", operation, unit);
        let output = Command::new(&self.systemctl)
            .arg(operation)
            .arg(unit)
            .output()
            .await
            .map_err(|e| Error::controller(unit, operation, e.to_string()))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(Error::controller(unit, operation, stderr.trim().to_string()))
        }
    }

    async fn daemon_reload(&self) -> Result<()> {
        let output = Command::new(&self.systemctl)
            .arg("daemon-reload")
            .output()
            .await
            .map_err(|e| Error::controller("systemd", "daemon-reload", e.to_string()))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(Error::controller(
                "systemd",
                "daemon-reload",
                stderr.trim().to_string(),
            ))
        }
    }
}

impl Default for SystemdController {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceController for SystemdController {
    async fn write_config(&self, service: &Service) -> Result<()> {
        let content = render_unit(service);
        if content.is_empty() {
            return Err(Error::render(&service.name));
        }

        let path = self.unit_path(&service.name);
        tokio::fs::write(&path, content).await.map_err(|e| {
            Error::controller(&service.name, "write-config", e.to_string())
        })?;
        info!("Wrote unit file {}", path.display());

        self.daemon_reload().await
    }

    async fn remove_config(&self, name: &str) -> Result<()> {
        let path = self.unit_path(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("Removed unit file {}", path.display());
                self.daemon_reload().await
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::controller(name, "remove-config", e.to_string())),
        }
    }

    async fn enable_service(&self, name: &str) -> Result<()> {
        self.systemctl("enable", name).await
    }

    async fn disable_service(&self, name: &str) -> Result<()> {
        self.systemctl("disable", name).await
    }

    async fn start_service(&self, name: &str) -> Result<()> {
        self.systemctl("start", name).await
    }

    async fn stop_service(&self, name: &str) -> Result<()> {
        self.systemctl("stop", name).await
    }

    async fn restart_service(&self, name: &str) -> Result<()> {
        self.systemctl("restart", name).await
    }

    async fn start_list(&self, services: &[Service]) -> Result<()> {
        let mut first_error = None;
        for service in services {
            if let Err(e) = self.start_service(&service.name).await {
                warn!("Failed to start service {}: {}", service.name, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn stop_list(&self, services: &[Service]) -> Result<()> {
        let mut first_error = None;
        for service in services {
            if let Err(e) = self.stop_service(&service.name).await {
                warn!("Failed to stop service {}: {}", service.name, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn check_before_start(&self) -> bool {
        if !Path::new(&self.systemctl).exists() {
            warn!("systemctl binary not found at {}", self.systemctl.display());
            return false;
        }
        if !self.unit_dir.is_dir() {
            warn!("Unit directory {} does not exist", self.unit_dir.display());
            return false;
        }
        true
    }
}
