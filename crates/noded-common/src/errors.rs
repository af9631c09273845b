//! Error types for the noded supervisor.
//!
//! Most supervisor operations tolerate partial failure (see the Manager
//! documentation); the variants here cover the cases that do abort an
//! operation and have to reach the caller.

use thiserror::Error;

/// Result type alias for supervisor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for supervisor operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The service list could not be loaded from its source.
    #[error("Failed to load services from {path}: {reason}")]
    LoadServices { path: String, reason: String },

    /// A service controller call failed.
    #[error("Controller {operation} failed for service {service}: {reason}")]
    Controller {
        service: String,
        operation: String,
        reason: String,
    },

    /// The controller's pre-flight environment check reported not-ready.
    #[error("check environments is not passed")]
    EnvironmentNotReady,

    /// A service could not be rendered to a runtime unit.
    #[error("can not generate config for service {service}")]
    Render { service: String },

    /// The pre-Manager bootstrap path failed.
    #[error("Bootstrap failed: {reason}")]
    Bootstrap { reason: String },

    /// I/O error (wraps std::io::Error).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a LoadServices error.
    pub fn load_services(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LoadServices {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a Controller error.
    pub fn controller(
        service: impl Into<String>,
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Controller {
            service: service.into(),
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Creates a Render error.
    pub fn render(service: impl Into<String>) -> Self {
        Self::Render {
            service: service.into(),
        }
    }

    /// Creates a Bootstrap error.
    pub fn bootstrap(reason: impl Into<String>) -> Self {
        Self::Bootstrap {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::load_services("/etc/noded/services.yaml", "no such file");
        assert!(err.to_string().contains("/etc/noded/services.yaml"));

        let err = Error::controller("etcd", "start", "exit status 1");
        assert!(err.to_string().contains("etcd"));
        assert!(err.to_string().contains("start"));
    }

    #[test]
    fn test_environment_not_ready_message() {
        assert_eq!(
            Error::EnvironmentNotReady.to_string(),
            "check environments is not passed"
        );
    }
}
