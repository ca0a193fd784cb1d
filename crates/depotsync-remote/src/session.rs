//! Authenticated session scoped to one checkout operation.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::protocol::{DepotTransport, SessionToken};
use crate::RemoteResult;

/// A live, authenticated depot session.
///
/// A session is opened once at the start of a checkout and must be closed
/// on every exit path, success or failure. `close` consumes the session so
/// a released token cannot be reused.
pub struct Session {
    transport: Arc<dyn DepotTransport>,
    token: SessionToken,
    user: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Authenticate against the transport and open a session.
    pub async fn open(
        transport: Arc<dyn DepotTransport>,
        user: &str,
        credential: &str,
    ) -> RemoteResult<Self> {
        debug!(user = %user, "logging in to depot server");
        let token = transport.login(user, credential).await?;
        Ok(Session {
            transport,
            token,
            user: user.to_string(),
        })
    }

    /// The token backing this session.
    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// The authenticated user.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The transport this session is bound to.
    pub fn transport(&self) -> &dyn DepotTransport {
        self.transport.as_ref()
    }

    /// Release the session token.
    ///
    /// A logout failure is logged and swallowed: by this point the checkout
    /// outcome is already decided and the server expires stale tokens on
    /// its own.
    pub async fn close(self) {
        if let Err(err) = self.transport.logout(&self.token).await {
            warn!(user = %self.user, error = %err, "failed to release depot session");
        } else {
            debug!(user = %self.user, "depot session released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::MemoryDepot;

    #[tokio::test]
    async fn open_and_close_round_trip() {
        let depot = Arc::new(MemoryDepot::new().with_credentials("builder", "hunter2"));

        let session = Session::open(depot.clone(), "builder", "hunter2")
            .await
            .expect("login failed");
        assert_eq!(session.user(), "builder");
        assert_eq!(depot.counters().logins, 1);

        session.close().await;
        assert_eq!(depot.counters().live_sessions, 0);
    }

    #[tokio::test]
    async fn open_with_bad_credential_fails() {
        let depot = Arc::new(MemoryDepot::new().with_credentials("builder", "hunter2"));

        let err = Session::open(depot, "builder", "wrong")
            .await
            .expect_err("login should fail");
        assert!(matches!(err, crate::RemoteError::Auth(_)));
    }
}
