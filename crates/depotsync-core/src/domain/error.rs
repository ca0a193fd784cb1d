//! Checkout-level error taxonomy.

use depotsync_remote::RemoteError;

use crate::config::ConfigError;

/// Everything that can abort a checkout. Every category is terminal for
/// the current build attempt; nothing is retried internally.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// A required configuration field is missing. Raised before any
    /// remote call.
    #[error("configuration invalid: {0}")]
    Config(#[from] ConfigError),

    /// The depot server cannot be reached.
    #[error("cannot reach depot server: {0}")]
    Connectivity(String),

    /// The server rejected the credential.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The server rejected a workspace create or update.
    #[error("workspace resolution failed: {0}")]
    Workspace(String),

    /// A change listing failed, or returned nothing where an existing
    /// stream must have at least one baseline change.
    #[error("change query failed: {0}")]
    Query(String),

    /// The server could not materialize files. Partial failures surface
    /// here as one aggregate error.
    #[error("sync failed: {0}")]
    Sync(String),
}

impl CheckoutError {
    /// Map a transport error raised while establishing the session.
    pub(crate) fn from_connect(err: RemoteError) -> Self {
        match err {
            RemoteError::Auth(msg) => CheckoutError::Auth(msg),
            other => CheckoutError::Connectivity(other.to_string()),
        }
    }

    /// Map a transport error raised while resolving the workspace.
    pub(crate) fn from_resolve(err: RemoteError) -> Self {
        CheckoutError::Workspace(err.to_string())
    }

    /// Map a transport error raised by a change listing.
    pub(crate) fn from_query(err: RemoteError) -> Self {
        CheckoutError::Query(err.to_string())
    }

    /// Map a transport error raised by a sync.
    pub(crate) fn from_sync(err: RemoteError) -> Self {
        CheckoutError::Sync(err.to_string())
    }

    /// The checkout stage this error belongs to, for the operator log.
    pub fn stage(&self) -> &'static str {
        match self {
            CheckoutError::Config(_) => "configuration",
            CheckoutError::Connectivity(_) | CheckoutError::Auth(_) => "connect",
            CheckoutError::Workspace(_) => "workspace",
            CheckoutError::Query(_) => "query",
            CheckoutError::Sync(_) => "sync",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_mapping_distinguishes_auth() {
        let auth = CheckoutError::from_connect(RemoteError::Auth("rejected".to_string()));
        assert!(matches!(auth, CheckoutError::Auth(_)));
        assert_eq!(auth.stage(), "connect");

        let down = CheckoutError::from_connect(RemoteError::Connectivity("refused".to_string()));
        assert!(matches!(down, CheckoutError::Connectivity(_)));
    }

    #[test]
    fn stage_names_cover_the_taxonomy() {
        assert_eq!(
            CheckoutError::Config(ConfigError { field: "stream" }).stage(),
            "configuration"
        );
        assert_eq!(CheckoutError::Workspace("x".to_string()).stage(), "workspace");
        assert_eq!(CheckoutError::Query("x".to_string()).stage(), "query");
        assert_eq!(CheckoutError::Sync("x".to_string()).stage(), "sync");
    }
}
