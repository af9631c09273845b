//! Wholesale loading of the service list from the local filesystem.

use crate::model::Service;
use noded_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk shape of the service list file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServiceList {
    #[serde(default)]
    version: Option<String>,
    services: Vec<Service>,
}

/// Loads the full service set from a YAML file.
///
/// The list is loaded as a unit; a parse failure loads nothing. Callers
/// keep their previous service set on error.
pub fn load_services_from_file(path: impl AsRef<Path>) -> Result<Vec<Service>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::load_services(path.display().to_string(), e.to_string()))?;

    let list: ServiceList = serde_yaml::from_str(&content)
        .map_err(|e| Error::load_services(path.display().to_string(), e.to_string()))?;

    Ok(list.services)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
version: "1"
services:
  - name: etcd
    start: /usr/bin/etcd --data-dir /var/lib/etcd
    after: [network.target]
    endpoints:
      - name: etcd
        protocol: http
        port: "2379"
    health:
      kind: tcp
      address: "127.0.0.1:2379"
      interval_secs: 5
  - name: docker
    start: ""
    endpoints: []
"#;

    #[test]
    fn test_load_services() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let services = load_services_from_file(file.path()).unwrap();
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].name, "etcd");
        assert_eq!(services[0].endpoints[0].protocol, "http");
        assert_eq!(services[1].name, "docker");
        assert!(services[1].start.is_empty());
    }

    #[test]
    fn test_load_services_missing_file() {
        let result = load_services_from_file("/nonexistent/services.yaml");
        assert!(matches!(
            result,
            Err(noded_common::Error::LoadServices { .. })
        ));
    }

    #[test]
    fn test_load_services_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"services: {not: [a, list}").unwrap();

        let result = load_services_from_file(file.path());
        assert!(matches!(
            result,
            Err(noded_common::Error::LoadServices { .. })
        ));
    }
}
