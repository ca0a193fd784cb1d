//! In-memory fake depot server (testing only)
//!
//! `MemoryDepot` satisfies the `DepotTransport` contract without a network.
//! It is seedable with credentials, changes and depot files, and it counts
//! remote mutations so tests can assert idempotence and no-call properties
//! directly.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::RemoteError;
use crate::protocol::*;
use crate::RemoteResult;

/// Remote-call counters exposed for assertions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounters {
    pub logins: u64,
    pub live_sessions: u64,
    pub workspace_creates: u64,
    pub workspace_updates: u64,
    pub change_queries: u64,
    pub syncs: u64,
}

#[derive(Default)]
struct DepotState {
    credentials: HashMap<String, String>,
    sessions: HashSet<String>,
    workspaces: HashMap<String, WorkspaceRecord>,
    changes: Vec<ChangeSummary>,
    files: Vec<String>,
    fail_sync: Option<String>,
    counters: CallCounters,
}

/// In-memory depot server backed by a `Mutex<DepotState>`.
#[derive(Default)]
pub struct MemoryDepot {
    state: Mutex<DepotState>,
}

impl MemoryDepot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a valid (user, credential) pair.
    pub fn with_credentials(self, user: &str, credential: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .credentials
            .insert(user.to_string(), credential.to_string());
        self
    }

    /// Seed one submitted change. Changes may be pushed in any order; the
    /// transport sorts newest first when listing.
    pub fn push_change(&self, id: u64, author: &str, description: &str) {
        self.state.lock().unwrap().changes.push(ChangeSummary {
            id,
            author: author.to_string(),
            description: description.to_string(),
            submitted_at: Utc::now(),
        });
    }

    /// Seed the depot file tree served by sync.
    pub fn seed_files(&self, paths: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state.files = paths.iter().map(|p| p.to_string()).collect();
    }

    /// Make the next (and all following) sync calls fail with this message.
    pub fn fail_sync_with(&self, message: &str) {
        self.state.lock().unwrap().fail_sync = Some(message.to_string());
    }

    /// Snapshot of the remote-call counters.
    pub fn counters(&self) -> CallCounters {
        let state = self.state.lock().unwrap();
        let mut counters = state.counters;
        counters.live_sessions = state.sessions.len() as u64;
        counters
    }

    /// Fetch a workspace record directly, bypassing the transport. For
    /// test assertions about server-side state.
    pub fn workspace(&self, name: &str) -> Option<WorkspaceRecord> {
        self.state.lock().unwrap().workspaces.get(name).cloned()
    }

    fn check_token(state: &DepotState, token: &SessionToken) -> RemoteResult<()> {
        if state.sessions.contains(token.as_str()) {
            Ok(())
        } else {
            Err(RemoteError::Auth(
                "invalid or expired session token".to_string(),
            ))
        }
    }
}

#[async_trait]
impl DepotTransport for MemoryDepot {
    async fn login(&self, user: &str, credential: &str) -> RemoteResult<SessionToken> {
        let mut state = self.state.lock().unwrap();
        state.counters.logins += 1;
        match state.credentials.get(user) {
            Some(expected) if expected == credential => {
                let token = Uuid::new_v4().to_string();
                state.sessions.insert(token.clone());
                Ok(SessionToken::new(token))
            }
            _ => Err(RemoteError::Auth(format!(
                "credential rejected for user '{user}'"
            ))),
        }
    }

    async fn logout(&self, token: &SessionToken) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        state.sessions.remove(token.as_str());
        Ok(())
    }

    async fn list_workspaces(
        &self,
        token: &SessionToken,
        owner: &str,
        name: &str,
    ) -> RemoteResult<Vec<WorkspaceSummary>> {
        let state = self.state.lock().unwrap();
        Self::check_token(&state, token)?;
        Ok(state
            .workspaces
            .values()
            .filter(|w| w.owner == owner && w.name == name)
            .map(WorkspaceRecord::summary)
            .collect())
    }

    async fn fetch_workspace(
        &self,
        token: &SessionToken,
        name: &str,
    ) -> RemoteResult<WorkspaceRecord> {
        let state = self.state.lock().unwrap();
        Self::check_token(&state, token)?;
        state
            .workspaces
            .get(name)
            .cloned()
            .ok_or_else(|| RemoteError::Rejected(format!("no such workspace: {name}")))
    }

    async fn create_workspace(
        &self,
        token: &SessionToken,
        record: &WorkspaceRecord,
    ) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_token(&state, token)?;
        state.counters.workspace_creates += 1;
        if state.workspaces.contains_key(&record.name) {
            return Err(RemoteError::Rejected(format!(
                "workspace already exists: {}",
                record.name
            )));
        }
        state.workspaces.insert(record.name.clone(), record.clone());
        Ok(())
    }

    async fn update_workspace(
        &self,
        token: &SessionToken,
        name: &str,
        patch: &WorkspacePatch,
    ) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        Self::check_token(&state, token)?;
        state.counters.workspace_updates += 1;
        let record = state
            .workspaces
            .get_mut(name)
            .ok_or_else(|| RemoteError::Rejected(format!("no such workspace: {name}")))?;
        patch.apply_to(record);
        Ok(())
    }

    async fn list_changes(
        &self,
        token: &SessionToken,
        _scope: &str,
        window: usize,
    ) -> RemoteResult<Vec<ChangeSummary>> {
        // The fake serves a single depot tree; scope is accepted and ignored.
        let mut state = self.state.lock().unwrap();
        Self::check_token(&state, token)?;
        state.counters.change_queries += 1;
        let mut changes = state.changes.clone();
        changes.sort_by(|a, b| b.id.cmp(&a.id));
        changes.truncate(window);
        Ok(changes)
    }

    async fn sync_workspace(
        &self,
        token: &SessionToken,
        workspace: &str,
        _scope: &str,
    ) -> RemoteResult<Vec<SyncedFile>> {
        let mut state = self.state.lock().unwrap();
        Self::check_token(&state, token)?;
        state.counters.syncs += 1;
        if let Some(message) = &state.fail_sync {
            return Err(RemoteError::Rejected(message.clone()));
        }
        if !state.workspaces.contains_key(workspace) {
            return Err(RemoteError::Rejected(format!(
                "no such workspace: {workspace}"
            )));
        }
        let head = state.changes.iter().map(|c| c.id).max().unwrap_or(0);
        Ok(state
            .files
            .iter()
            .map(|path| SyncedFile {
                depot_path: path.clone(),
                revision: head,
                action: SyncAction::Updated,
            })
            .collect())
    }
}
