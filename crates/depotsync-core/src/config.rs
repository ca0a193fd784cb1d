//! Checkout configuration and the executing node's identity.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder host label used when the node cannot report a host name.
pub const UNKNOWN_HOST: &str = "UNKNOWNHOST";

/// A required configuration field was missing or blank.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field} missing")]
pub struct ConfigError {
    /// Human-facing name of the missing field.
    pub field: &'static str,
}

impl ConfigError {
    fn missing(field: &'static str) -> Self {
        ConfigError { field }
    }
}

/// The configuration a checkout consumes, supplied by the surrounding
/// orchestrator's configuration layer.
///
/// All fields are required; `validate` runs before any remote call is
/// attempted and names the first missing field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Depot server address, host:port.
    pub port: String,

    /// Depot user the builds run as.
    pub user: String,

    /// Credential for `user`. Never logged.
    pub credential: String,

    /// Base workspace name; the node suffix is appended per build node.
    pub client: String,

    /// Stream the workspace tracks.
    pub stream: String,
}

impl CheckoutConfig {
    /// Check that every required field is present and non-blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port.trim().is_empty() {
            return Err(ConfigError::missing("server address"));
        }
        if self.user.trim().is_empty() {
            return Err(ConfigError::missing("user"));
        }
        if self.credential.trim().is_empty() {
            return Err(ConfigError::missing("credential"));
        }
        if self.client.trim().is_empty() {
            return Err(ConfigError::missing("workspace base name"));
        }
        if self.stream.trim().is_empty() {
            return Err(ConfigError::missing("stream"));
        }
        Ok(())
    }
}

/// Identity of the node a build executes on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeIdentity {
    /// Orchestrator-assigned node name. `None` or blank on the controller
    /// itself.
    pub name: Option<String>,

    /// Host name as the node reports it, possibly fully qualified.
    pub host: Option<String>,
}

impl NodeIdentity {
    /// A node with no name and no reported host (controller-local builds).
    pub fn controller() -> Self {
        NodeIdentity::default()
    }

    pub fn named(name: impl Into<String>, host: impl Into<String>) -> Self {
        NodeIdentity {
            name: Some(name.into()),
            host: Some(host.into()),
        }
    }

    /// The node name, if it is present and non-blank.
    pub fn node_name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }

    /// Host label to store on created workspace records: the reported host
    /// name stripped to its first DNS label, or `UNKNOWN_HOST` when the
    /// node reports nothing.
    pub fn host_label(&self) -> String {
        match self.host.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
            Some(host) => host.split('.').next().unwrap_or(host).to_string(),
            None => UNKNOWN_HOST.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> CheckoutConfig {
        CheckoutConfig {
            port: "depot.example.com:1666".to_string(),
            user: "builder".to_string(),
            credential: "s3cret".to_string(),
            client: "ci-ws".to_string(),
            stream: "//streams/main".to_string(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn each_missing_field_is_named() {
        let cases: Vec<(fn(&mut CheckoutConfig), &str)> = vec![
            (|c| c.port.clear(), "server address"),
            (|c| c.user.clear(), "user"),
            (|c| c.credential.clear(), "credential"),
            (|c| c.client.clear(), "workspace base name"),
            (|c| c.stream.clear(), "stream"),
        ];
        for (blank, field) in cases {
            let mut config = valid_config();
            blank(&mut config);
            let err = config.validate().expect_err("validation should fail");
            assert_eq!(err.field, field);
        }
    }

    #[test]
    fn whitespace_only_counts_as_missing() {
        let mut config = valid_config();
        config.stream = "   ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn host_label_strips_domain() {
        let node = NodeIdentity::named("linux-1", "build7.fleet.example.com");
        assert_eq!(node.host_label(), "build7");
    }

    #[test]
    fn host_label_falls_back_to_placeholder() {
        assert_eq!(NodeIdentity::controller().host_label(), UNKNOWN_HOST);

        let node = NodeIdentity {
            name: Some("linux-1".to_string()),
            host: Some("  ".to_string()),
        };
        assert_eq!(node.host_label(), UNKNOWN_HOST);
    }

    #[test]
    fn blank_node_name_is_none() {
        let node = NodeIdentity {
            name: Some("  ".to_string()),
            host: None,
        };
        assert!(node.node_name().is_none());
    }
}
