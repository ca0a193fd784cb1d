//! HTTP/JSON transport against the depot server gateway.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RemoteError;
use crate::protocol::*;
use crate::RemoteResult;

#[derive(Serialize)]
struct LoginRequest<'a> {
    user: &'a str,
    credential: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Serialize)]
struct SyncRequest<'a> {
    scope: &'a str,
}

/// Depot transport over the server's JSON gateway.
///
/// Timeouts are whatever the underlying client defaults to; the checkout
/// core configures none of its own.
pub struct HttpDepot {
    client: Client,
    base: String,
}

impl HttpDepot {
    /// Build a transport for a `host:port` server address. A full URL with
    /// scheme is also accepted for gateways behind TLS terminators.
    pub fn new(address: &str) -> RemoteResult<Self> {
        let base = if address.contains("://") {
            address.trim_end_matches('/').to_string()
        } else {
            validate_server_address(address)?;
            format!("http://{address}")
        };
        let client = Client::builder()
            .user_agent(concat!("depotsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Connectivity(e.to_string()))?;
        Ok(HttpDepot { client, base })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Map a non-success response into the remote taxonomy, consuming the
    /// body as the server's message.
    async fn reject(response: Response) -> RemoteError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = if body.is_empty() {
            status.to_string()
        } else {
            format!("{status}: {body}")
        };
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Auth(message),
            _ => RemoteError::Rejected(message),
        }
    }

    async fn expect_success(response: Response) -> RemoteResult<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::reject(response).await)
        }
    }
}

#[async_trait]
impl DepotTransport for HttpDepot {
    async fn login(&self, user: &str, credential: &str) -> RemoteResult<SessionToken> {
        debug!(user = %user, "POST /api/login");
        let response = self
            .client
            .post(self.url("/api/login"))
            .json(&LoginRequest { user, credential })
            .send()
            .await?;
        let response = Self::expect_success(response).await?;
        let body: LoginResponse = response.json().await?;
        Ok(SessionToken::new(body.token))
    }

    async fn logout(&self, token: &SessionToken) -> RemoteResult<()> {
        debug!("DELETE /api/session");
        let response = self
            .client
            .delete(self.url("/api/session"))
            .bearer_auth(token.as_str())
            .send()
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn list_workspaces(
        &self,
        token: &SessionToken,
        owner: &str,
        name: &str,
    ) -> RemoteResult<Vec<WorkspaceSummary>> {
        debug!(owner = %owner, name = %name, "GET /api/workspaces");
        let response = self
            .client
            .get(self.url("/api/workspaces"))
            .bearer_auth(token.as_str())
            .query(&[("owner", owner), ("name", name)])
            .send()
            .await?;
        let response = Self::expect_success(response).await?;
        Ok(response.json().await?)
    }

    async fn fetch_workspace(
        &self,
        token: &SessionToken,
        name: &str,
    ) -> RemoteResult<WorkspaceRecord> {
        debug!(name = %name, "GET /api/workspaces/{{name}}");
        let response = self
            .client
            .get(self.url(&format!("/api/workspaces/{name}")))
            .bearer_auth(token.as_str())
            .send()
            .await?;
        let response = Self::expect_success(response).await?;
        Ok(response.json().await?)
    }

    async fn create_workspace(
        &self,
        token: &SessionToken,
        record: &WorkspaceRecord,
    ) -> RemoteResult<()> {
        debug!(name = %record.name, "POST /api/workspaces");
        let response = self
            .client
            .post(self.url("/api/workspaces"))
            .bearer_auth(token.as_str())
            .json(record)
            .send()
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn update_workspace(
        &self,
        token: &SessionToken,
        name: &str,
        patch: &WorkspacePatch,
    ) -> RemoteResult<()> {
        debug!(name = %name, "PATCH /api/workspaces/{{name}}");
        let response = self
            .client
            .patch(self.url(&format!("/api/workspaces/{name}")))
            .bearer_auth(token.as_str())
            .json(patch)
            .send()
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn list_changes(
        &self,
        token: &SessionToken,
        scope: &str,
        window: usize,
    ) -> RemoteResult<Vec<ChangeSummary>> {
        debug!(scope = %scope, window = window, "GET /api/changes");
        let max = window.to_string();
        let response = self
            .client
            .get(self.url("/api/changes"))
            .bearer_auth(token.as_str())
            .query(&[("scope", scope), ("max", max.as_str())])
            .send()
            .await?;
        let response = Self::expect_success(response).await?;
        Ok(response.json().await?)
    }

    async fn sync_workspace(
        &self,
        token: &SessionToken,
        workspace: &str,
        scope: &str,
    ) -> RemoteResult<Vec<SyncedFile>> {
        debug!(workspace = %workspace, scope = %scope, "POST /api/workspaces/{{name}}/sync");
        let response = self
            .client
            .post(self.url(&format!("/api/workspaces/{workspace}/sync")))
            .bearer_auth(token.as_str())
            .json(&SyncRequest { scope })
            .send()
            .await?;
        let response = Self::expect_success(response).await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_address_gets_http_scheme() {
        let depot = HttpDepot::new("depot.example.com:1666").unwrap();
        assert_eq!(depot.url("/api/login"), "http://depot.example.com:1666/api/login");
    }

    #[test]
    fn full_url_is_kept_and_trailing_slash_trimmed() {
        let depot = HttpDepot::new("https://depot.example.com/").unwrap();
        assert_eq!(depot.url("/api/changes"), "https://depot.example.com/api/changes");
    }

    #[test]
    fn bare_host_is_rejected() {
        assert!(HttpDepot::new("depot.example.com").is_err());
    }
}
