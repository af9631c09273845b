//! Service and endpoint descriptors.

use serde::{Deserialize, Serialize};

/// A named network address a service exposes.
///
/// The `name` is the logical registration key in the cluster directory and
/// is not necessarily unique to one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,

    /// Optional scheme; when empty the rendered endpoint carries no scheme.
    #[serde(default)]
    pub protocol: String,

    pub port: String,
}

impl Endpoint {
    /// Renders the endpoint string for this node.
    ///
    /// `"ip:port"` when the protocol is empty, `"protocol://ip:port"`
    /// otherwise. This is the wire form stored in the cluster directory.
    pub fn uri(&self, ip: &str) -> String {
        if self.protocol.is_empty() {
            format!("{}:{}", ip, self.port)
        } else {
            format!("{}://{}:{}", self.protocol, ip, self.port)
        }
    }
}

/// Health probe kinds supported by the probe evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthCheckKind {
    /// HTTP GET expecting a 2xx response.
    Http,
    /// Plain TCP connect.
    Tcp,
}

/// Per-service health probe configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckSpec {
    pub kind: HealthCheckKind,

    /// Probe target: a URL for HTTP checks, `host:port` for TCP checks.
    pub address: String,

    #[serde(default = "default_probe_interval")]
    pub interval_secs: u64,
}

fn default_probe_interval() -> u64 {
    5
}

/// A managed service and its advertised endpoints.
///
/// Immutable for the duration of one online/offline cycle; the Manager
/// replaces the whole service list on reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,

    #[serde(default)]
    pub endpoints: Vec<Endpoint>,

    /// Command line started by the runtime unit. Empty means the service
    /// cannot be rendered to a unit (managed entirely externally).
    #[serde(default)]
    pub start: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,

    /// Unit dependencies (systemd `Requires=`).
    #[serde(default)]
    pub requires: Vec<String>,

    /// Unit ordering (systemd `After=`).
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthCheckSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_uri_without_protocol() {
        let end = Endpoint {
            name: "node".to_string(),
            protocol: String::new(),
            port: "8080".to_string(),
        };
        assert_eq!(end.uri("10.0.0.5"), "10.0.0.5:8080");
    }

    #[test]
    fn test_endpoint_uri_with_protocol() {
        let end = Endpoint {
            name: "etcd".to_string(),
            protocol: "tcp".to_string(),
            port: "80".to_string(),
        };
        assert_eq!(end.uri("10.0.0.5"), "tcp://10.0.0.5:80");
    }
}
