//! One-shot bootstrap of the cluster coordination store.
//!
//! Usable before a Manager exists: the supervisor needs the coordination
//! store (the `etcd` service) running before it can connect a cluster
//! directory client, and the store's own container runtime must be up
//! first. Not idempotent: assumes the unit is not already installed.

use crate::ServiceController;
use noded_common::{Error, Result};
use noded_service::load_services_from_file;
use std::path::Path;
use tracing::{error, info};

/// Name of the externally managed container runtime the store depends on.
const RUNTIME_SERVICE: &str = "docker";

/// Name of the cluster coordination store service.
const STORE_SERVICE: &str = "etcd";

/// Starts the container runtime, installs the coordination store's unit
/// and starts the store.
pub async fn bootstrap_coordination_store(
    services_file: impl AsRef<Path>,
    controller: &dyn ServiceController,
) -> Result<()> {
    let services = load_services_from_file(services_file).map_err(|e| {
        error!("Failed to load all services: {}", e);
        e
    })?;

    controller
        .start_service(RUNTIME_SERVICE)
        .await
        .map_err(|e| Error::bootstrap(format!("start {}: {}", RUNTIME_SERVICE, e)))?;

    let store = services
        .iter()
        .find(|s| s.name == STORE_SERVICE)
        .ok_or_else(|| {
            Error::bootstrap(format!("service {} not present in service list", STORE_SERVICE))
        })?;

    // write_config rejects a service that renders to nothing.
    controller.write_config(store).await?;
    controller.start_service(&store.name).await?;

    info!("Coordination store {} started", store.name);
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::SystemdController;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    fn stub_systemctl(dir: &Path) -> PathBuf {
        let path = dir.join("systemctl");
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[tokio::test]
    async fn test_bootstrap_installs_store_unit() {
        let dir = tempfile::tempdir().unwrap();
        let systemctl = stub_systemctl(dir.path());
        let ctr = SystemdController::with_paths(systemctl, dir.path());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"services:\n  - name: etcd\n    start: /usr/bin/etcd\n  - name: docker\n",
        )
        .unwrap();

        bootstrap_coordination_store(file.path(), &ctr).await.unwrap();
        assert!(dir.path().join("etcd.service").exists());
    }

    #[tokio::test]
    async fn test_bootstrap_requires_store_in_service_list() {
        let dir = tempfile::tempdir().unwrap();
        let systemctl = stub_systemctl(dir.path());
        let ctr = SystemdController::with_paths(systemctl, dir.path());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"services:\n  - name: api\n    start: /usr/bin/api\n")
            .unwrap();

        let result = bootstrap_coordination_store(file.path(), &ctr).await;
        assert!(matches!(result, Err(Error::Bootstrap { .. })));
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_unrenderable_store() {
        let dir = tempfile::tempdir().unwrap();
        let systemctl = stub_systemctl(dir.path());
        let ctr = SystemdController::with_paths(systemctl, dir.path());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"services:\n  - name: etcd\n    start: \"\"\n")
            .unwrap();

        let result = bootstrap_coordination_store(file.path(), &ctr).await;
        assert!(matches!(result, Err(Error::Render { .. })));
    }
}
