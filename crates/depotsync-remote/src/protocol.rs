//! Wire-level records and the depot transport trait.
//!
//! These types mirror what the depot server tracks:
//! - `WorkspaceRecord`: a named mapping from a root directory to a stream
//! - `ChangeSummary`: one submitted change, identified by a numeric id
//! - `SyncedFile`: one file the server materialized during a sync
//!
//! `DepotTransport` is async and backend-agnostic. An in-memory fake is
//! provided for testing via the `fakes` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RemoteError;
use crate::RemoteResult;

/// Opaque session token issued by the server at login.
///
/// The inner field is private so a token can only come from a successful
/// `login` call (or be deserialized from one).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a server-issued token string.
    pub fn new(token: impl Into<String>) -> Self {
        SessionToken(token.into())
    }

    /// Return the raw token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Workspace records
// ---------------------------------------------------------------------------

/// Line-ending policy applied when the server writes files into a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineEnd {
    /// Platform-neutral: the client decides at write time.
    Local,
    Unix,
    Windows,
}

/// Per-workspace sync behavior flags.
///
/// Automated builds always use the fixed `automated()` bundle; the flags
/// exist individually only because the server stores them individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    /// All files writable without explicit open.
    pub allwrite: bool,
    /// Overwrite locally modified files without prompting.
    pub clobber: bool,
    /// Compress file transfers.
    pub compress: bool,
    /// Workspace visible only to its owner.
    pub locked: bool,
    /// Preserve submitted modification times on sync.
    pub modtime: bool,
    /// Remove directories emptied by a sync.
    pub rmdir: bool,
}

impl SyncOptions {
    /// The fixed bundle for unattended CI workspaces: clobber without
    /// prompting, keep submitted modtimes, clean up emptied directories,
    /// everything else off.
    pub fn automated() -> Self {
        SyncOptions {
            allwrite: false,
            clobber: true,
            compress: false,
            locked: false,
            modtime: true,
            rmdir: true,
        }
    }
}

/// Abbreviated workspace listing entry, as returned by
/// `DepotTransport::list_workspaces`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSummary {
    pub name: String,
    pub owner: String,
    pub root: String,
}

/// Full server-side workspace record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceRecord {
    /// Unique workspace name.
    pub name: String,

    /// Owning user.
    pub owner: String,

    /// Host label the workspace is bound to (first DNS label only).
    pub host: String,

    /// Absolute root directory on the owning host.
    pub root: String,

    /// Stream this workspace tracks.
    pub stream: String,

    /// Line-ending policy.
    pub line_end: LineEnd,

    /// Sync behavior flags.
    pub options: SyncOptions,

    /// Free-form description.
    pub description: String,

    /// Last access time as reported by the server.
    pub accessed_at: DateTime<Utc>,

    /// Last update time as reported by the server.
    pub updated_at: DateTime<Utc>,
}

impl WorkspaceRecord {
    /// Abbreviate to a listing entry.
    pub fn summary(&self) -> WorkspaceSummary {
        WorkspaceSummary {
            name: self.name.clone(),
            owner: self.owner.clone(),
            root: self.root.clone(),
        }
    }
}

/// Minimal field set for a workspace update.
///
/// Only fields that actually drifted are populated; an empty patch means
/// the record already matches and no remote write is needed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspacePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

impl WorkspacePatch {
    /// Whether the patch carries no changes.
    pub fn is_empty(&self) -> bool {
        self.stream.is_none() && self.owner.is_none() && self.root.is_none()
    }

    /// Apply the patch to a record in place.
    pub fn apply_to(&self, record: &mut WorkspaceRecord) {
        if let Some(stream) = &self.stream {
            record.stream = stream.clone();
        }
        if let Some(owner) = &self.owner {
            record.owner = owner.clone();
        }
        if let Some(root) = &self.root {
            record.root = root.clone();
        }
        record.updated_at = Utc::now();
    }
}

// ---------------------------------------------------------------------------
// Changes and sync results
// ---------------------------------------------------------------------------

/// One submitted change as listed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    /// Monotonically increasing change number.
    pub id: u64,

    /// Submitting user.
    pub author: String,

    /// First line of the change description.
    pub description: String,

    /// Submission time.
    pub submitted_at: DateTime<Utc>,
}

/// What the server did to a file during sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Added,
    Updated,
    Deleted,
}

/// One file materialized (or removed) by a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedFile {
    /// Server-side path of the file.
    pub depot_path: String,

    /// Revision the file is now at.
    pub revision: u64,

    /// What happened to the local copy.
    pub action: SyncAction,
}

// ---------------------------------------------------------------------------
// DepotTransport
// ---------------------------------------------------------------------------

/// The remote operation set depotsync requires of a depot server.
///
/// Guarantees expected of implementations:
/// - `list_changes` returns entries newest first, at most `window` of them.
/// - `sync_workspace` brings the named workspace's tree to head; a partial
///   failure is reported as a single error, not per file.
/// - Every call other than `login` requires a token from a live session.
#[async_trait]
pub trait DepotTransport: Send + Sync {
    /// Authenticate and obtain a session token.
    async fn login(&self, user: &str, credential: &str) -> RemoteResult<SessionToken>;

    /// Release a session token. Idempotent on the server side.
    async fn logout(&self, token: &SessionToken) -> RemoteResult<()>;

    /// List workspaces owned by `owner` whose name equals `name`.
    async fn list_workspaces(
        &self,
        token: &SessionToken,
        owner: &str,
        name: &str,
    ) -> RemoteResult<Vec<WorkspaceSummary>>;

    /// Fetch the full record for a workspace by name.
    async fn fetch_workspace(
        &self,
        token: &SessionToken,
        name: &str,
    ) -> RemoteResult<WorkspaceRecord>;

    /// Create a new workspace record.
    async fn create_workspace(
        &self,
        token: &SessionToken,
        record: &WorkspaceRecord,
    ) -> RemoteResult<()>;

    /// Update an existing workspace record with a minimal patch.
    async fn update_workspace(
        &self,
        token: &SessionToken,
        name: &str,
        patch: &WorkspacePatch,
    ) -> RemoteResult<()>;

    /// List submitted changes under `scope`, newest first, bounded to
    /// `window` entries.
    async fn list_changes(
        &self,
        token: &SessionToken,
        scope: &str,
        window: usize,
    ) -> RemoteResult<Vec<ChangeSummary>>;

    /// Bring the named workspace's tree under `scope` to head state.
    async fn sync_workspace(
        &self,
        token: &SessionToken,
        workspace: &str,
        scope: &str,
    ) -> RemoteResult<Vec<SyncedFile>>;
}

/// Validate a host:port server address. Rejects empty host or port parts;
/// the scheme is supplied by the transport, not the address.
pub fn validate_server_address(address: &str) -> RemoteResult<()> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| RemoteError::Rejected(format!("server address '{address}' is not host:port")))?;
    if host.is_empty() || port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
        return Err(RemoteError::Rejected(format!(
            "server address '{address}' is not host:port"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn automated_options_disable_allwrite_and_enable_rmdir() {
        let opts = SyncOptions::automated();
        assert!(!opts.allwrite);
        assert!(opts.clobber);
        assert!(!opts.compress);
        assert!(!opts.locked);
        assert!(opts.modtime);
        assert!(opts.rmdir);
    }

    #[test]
    fn empty_patch_applies_nothing() {
        let patch = WorkspacePatch::default();
        assert!(patch.is_empty());
    }

    #[test]
    fn patch_applies_only_populated_fields() {
        let mut record = WorkspaceRecord {
            name: "ci-ws".to_string(),
            owner: "builder".to_string(),
            host: "node1".to_string(),
            root: "/var/builds/old".to_string(),
            stream: "//streams/main".to_string(),
            line_end: LineEnd::Local,
            options: SyncOptions::automated(),
            description: "test".to_string(),
            accessed_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let patch = WorkspacePatch {
            root: Some("/var/builds/new".to_string()),
            ..Default::default()
        };
        patch.apply_to(&mut record);

        assert_eq!(record.root, "/var/builds/new");
        assert_eq!(record.owner, "builder");
        assert_eq!(record.stream, "//streams/main");
    }

    #[test]
    fn server_address_validation() {
        assert!(validate_server_address("depot.example.com:1666").is_ok());
        assert!(validate_server_address("localhost:8080").is_ok());
        assert!(validate_server_address("no-port").is_err());
        assert!(validate_server_address(":1666").is_err());
        assert!(validate_server_address("host:").is_err());
        assert!(validate_server_address("host:abc").is_err());
    }
}
