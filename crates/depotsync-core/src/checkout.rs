//! The checkout operation: one build's pass through
//! connect → resolve workspace → compute revisions → sync → record.
//!
//! A single failure anywhere aborts the whole operation; there are no
//! internal retries. Whatever happens, the depot session opened at the
//! start is released before the operation returns.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info};

use depotsync_remote::{DepotTransport, Session, WorkspaceRecord};

use crate::changelog::ChangelogSink;
use crate::config::{CheckoutConfig, NodeIdentity};
use crate::domain::{
    drift_patch, ChangeSet, CheckoutError, RevisionMarker, WorkspaceIdentity, WorkspaceSpec,
    DEFAULT_LOOKBACK_WINDOW,
};
use crate::history::{last_known, BuildRecord, RevisionSink};
use crate::report::{BuildLog, NO_PREVIOUS_BUILDS};

/// Root-relative wildcard covering the workspace's whole tree. Sync is
/// always full-tree to head; incremental behavior comes from the server's
/// own file-state tracking, not from a range parameter.
pub const FULL_TREE_SCOPE: &str = "//...";

/// How a checkout ended. Errors never escape `Checkout::run`; they are
/// folded into `Failed` after being logged.
#[derive(Debug)]
pub enum CheckoutOutcome {
    Success {
        /// The marker recorded on the build.
        revision: RevisionMarker,
        /// Number of files the server reported syncing.
        synced_files: usize,
    },
    Failed {
        /// The stage that aborted the operation.
        stage: &'static str,
        message: String,
    },
}

impl CheckoutOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, CheckoutOutcome::Success { .. })
    }
}

/// One build's checkout against a depot server.
///
/// Construct once per build with the validated-at-run-time configuration
/// and the executing node's identity, then call [`Checkout::run`].
pub struct Checkout {
    config: CheckoutConfig,
    node: NodeIdentity,
    transport: Arc<dyn DepotTransport>,
    window: usize,
}

impl Checkout {
    pub fn new(
        config: CheckoutConfig,
        node: NodeIdentity,
        transport: Arc<dyn DepotTransport>,
    ) -> Self {
        Checkout {
            config,
            node,
            transport,
            window: DEFAULT_LOOKBACK_WINDOW,
        }
    }

    /// Override the change-enumeration lookback window.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Run the checkout for one build.
    ///
    /// * `workspace_root` — the build's working directory on this node.
    /// * `history` — most recent prior build, or `None` for a fresh job.
    /// * `sink` — where the head marker is recorded after a successful sync.
    /// * `changelog` — changelog artifact sink (`NoChangelog` to skip).
    /// * `log` — the human-facing build console.
    pub async fn run<W: Write>(
        &self,
        workspace_root: &Path,
        history: Option<&dyn BuildRecord>,
        sink: &mut dyn RevisionSink,
        changelog: &mut dyn ChangelogSink,
        log: &mut BuildLog<W>,
    ) -> CheckoutOutcome {
        match self
            .run_inner(workspace_root, history, sink, changelog, log)
            .await
        {
            Ok((revision, synced_files)) => CheckoutOutcome::Success {
                revision,
                synced_files,
            },
            Err(err) => {
                log.error(err.stage(), &err);
                error!(stage = err.stage(), error = %err, "checkout aborted");
                CheckoutOutcome::Failed {
                    stage: err.stage(),
                    message: err.to_string(),
                }
            }
        }
    }

    async fn run_inner<W: Write>(
        &self,
        workspace_root: &Path,
        history: Option<&dyn BuildRecord>,
        sink: &mut dyn RevisionSink,
        changelog: &mut dyn ChangelogSink,
        log: &mut BuildLog<W>,
    ) -> crate::Result<(RevisionMarker, usize)> {
        // Validation happens before any remote call is attempted.
        self.config.validate()?;

        info!(server = %self.config.port, user = %self.config.user, "connecting to depot server");
        let session = Session::open(
            self.transport.clone(),
            &self.config.user,
            &self.config.credential,
        )
        .await
        .map_err(CheckoutError::from_connect)?;

        // From here on, the session must be released on every exit path.
        let result = self
            .run_connected(&session, workspace_root, history, sink, changelog, log)
            .await;
        session.close().await;
        result
    }

    async fn run_connected<W: Write>(
        &self,
        session: &Session,
        workspace_root: &Path,
        history: Option<&dyn BuildRecord>,
        sink: &mut dyn RevisionSink,
        changelog: &mut dyn ChangelogSink,
        log: &mut BuildLog<W>,
    ) -> crate::Result<(RevisionMarker, usize)> {
        let workspace = self.resolve_workspace(session, workspace_root).await?;

        let last = last_known(history);
        let changes = self.enumerate_changes(session).await?;
        let head = require_head(&changes)?;

        let last_line = match last.change_number() {
            Some(id) => id.to_string(),
            None => NO_PREVIOUS_BUILDS.to_string(),
        };
        log.field("Depot server:", &self.config.port);
        log.field("Depot user:", &self.config.user);
        log.field("Workspace:", &workspace.name);
        log.field("Last built changelist:", last_line);
        log.field("Syncing to changelist:", head);

        log.line("Calculating changelog...");
        for change in changes.since(last) {
            log.line(change.id);
        }
        changelog
            .write_changelog(&changes)
            .map_err(|e| CheckoutError::Query(format!("changelog write failed: {e}")))?;

        info!(workspace = %workspace.name, target = %head, "syncing workspace to head");
        let synced = session
            .transport()
            .sync_workspace(session.token(), &workspace.name, FULL_TREE_SCOPE)
            .await
            .map_err(CheckoutError::from_sync)?;
        info!(workspace = %workspace.name, files = synced.len(), "workspace synced");

        // Only a successful sync may record a marker; a failed attempt
        // must leave the next build's baseline untouched.
        sink.attach_revision(head);
        debug!(marker = %head, "revision marker recorded on build");

        Ok((head, synced.len()))
    }

    /// Find the workspace record for this (base name, node) pair, correct
    /// any drifted fields, or create it if the server has none.
    ///
    /// Resolution is idempotent: with an unchanged spec the second call
    /// issues no create and no update.
    async fn resolve_workspace(
        &self,
        session: &Session,
        workspace_root: &Path,
    ) -> crate::Result<WorkspaceRecord> {
        let identity = WorkspaceIdentity::derive(&self.config.client, &self.node);
        let spec = WorkspaceSpec {
            root: workspace_root.display().to_string(),
            owner: self.config.user.clone(),
            stream: self.config.stream.clone(),
        };

        let transport = session.transport();
        let token = session.token();

        let hits = transport
            .list_workspaces(token, &self.config.user, identity.as_str())
            .await
            .map_err(CheckoutError::from_resolve)?;

        if hits.iter().any(|summary| summary.name == identity.as_str()) {
            debug!(workspace = %identity, "found existing workspace record");
            let mut record = transport
                .fetch_workspace(token, identity.as_str())
                .await
                .map_err(CheckoutError::from_resolve)?;

            let patch = drift_patch(&record, &spec);
            if patch.is_empty() {
                debug!(workspace = %identity, "workspace record matches configuration");
            } else {
                info!(workspace = %identity, "correcting drifted workspace record");
                transport
                    .update_workspace(token, identity.as_str(), &patch)
                    .await
                    .map_err(CheckoutError::from_resolve)?;
                patch.apply_to(&mut record);
            }
            return Ok(record);
        }

        info!(workspace = %identity, "creating workspace record");
        let record = spec.into_record(&identity, &self.node);
        transport
            .create_workspace(token, &record)
            .await
            .map_err(CheckoutError::from_resolve)?;
        Ok(record)
    }

    /// List changes under the full-tree scope, newest first, bounded to
    /// the lookback window.
    ///
    /// Known limitation: when the true gap since the last recorded build
    /// exceeds the window, only the newest `window` changes are visible
    /// here; the older part of the gap goes unreported even though sync
    /// still brings the tree to head.
    pub async fn enumerate_changes(&self, session: &Session) -> crate::Result<ChangeSet> {
        let entries = session
            .transport()
            .list_changes(session.token(), FULL_TREE_SCOPE, self.window)
            .await
            .map_err(CheckoutError::from_query)?;
        debug!(entries = entries.len(), window = self.window, "enumerated changes");
        Ok(ChangeSet::new(entries))
    }

    /// The newest change visible under the workspace's scope.
    pub async fn head_revision(&self, session: &Session) -> crate::Result<RevisionMarker> {
        let changes = self.enumerate_changes(session).await?;
        require_head(&changes)
    }
}

/// An existing stream always has at least one baseline change, so an
/// empty listing is a query failure rather than "no work to do".
fn require_head(changes: &ChangeSet) -> crate::Result<RevisionMarker> {
    match changes.head_marker() {
        RevisionMarker::Unknown => Err(CheckoutError::Query(
            "change listing returned no entries for an existing stream".to_string(),
        )),
        head => Ok(head),
    }
}
