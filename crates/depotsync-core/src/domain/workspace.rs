//! Workspace identity derivation and drift reconciliation.

use chrono::Utc;
use depotsync_remote::{LineEnd, SyncOptions, WorkspacePatch, WorkspaceRecord};

use crate::config::NodeIdentity;

/// Description stamped on workspace records this core creates.
const CREATED_DESCRIPTION: &str = "Created by depotsync";

/// Logical workspace name, derived deterministically from the configured
/// base name and the executing node.
///
/// Spaces in the base name become underscores, and a named node appends a
/// `_{node}` suffix, so two nodes building the same job never share a
/// remote workspace record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkspaceIdentity(String);

impl WorkspaceIdentity {
    /// Derive the identity for a (base name, node) pair.
    pub fn derive(base: &str, node: &NodeIdentity) -> Self {
        let mut name = base.replace(' ', "_");
        if let Some(node_name) = node.node_name() {
            name.push('_');
            name.push_str(node_name);
        }
        WorkspaceIdentity(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkspaceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The desired shape of a build workspace: the fields that must always
/// match current configuration, regardless of what the server has stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSpec {
    /// The build's working directory on the executing node.
    pub root: String,

    /// Configured depot user.
    pub owner: String,

    /// Configured stream binding.
    pub stream: String,
}

impl WorkspaceSpec {
    /// The full record to create when no workspace exists yet: the spec
    /// fields plus the fixed policy for unattended builds (local line
    /// endings, the automated option bundle) and the creating host label.
    pub fn into_record(self, identity: &WorkspaceIdentity, node: &NodeIdentity) -> WorkspaceRecord {
        let now = Utc::now();
        WorkspaceRecord {
            name: identity.as_str().to_string(),
            owner: self.owner,
            host: node.host_label(),
            root: self.root,
            stream: self.stream,
            line_end: LineEnd::Local,
            options: SyncOptions::automated(),
            description: CREATED_DESCRIPTION.to_string(),
            accessed_at: now,
            updated_at: now,
        }
    }
}

/// Compare a stored record against the desired spec and produce the
/// minimal patch that corrects drift.
///
/// Pure: no remote calls. An empty patch means the record already matches
/// and resolve must issue no update, which is what makes resolution
/// idempotent.
pub fn drift_patch(current: &WorkspaceRecord, desired: &WorkspaceSpec) -> WorkspacePatch {
    let mut patch = WorkspacePatch::default();
    if current.stream != desired.stream {
        patch.stream = Some(desired.stream.clone());
    }
    if current.owner != desired.owner {
        patch.owner = Some(desired.owner.clone());
    }
    if current.root != desired.root {
        patch.root = Some(desired.root.clone());
    }
    patch
}
