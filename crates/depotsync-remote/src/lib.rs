//! Depotsync-Remote: Depot Server Collaborator
//!
//! This crate provides everything depotsync needs from the remote version
//! control server. It owns the wire-level records and the transport trait;
//! the checkout core in `depotsync-core` drives it one call at a time.
//!
//! ## Key Components
//!
//! - `DepotTransport`: the remote operation set (login, workspaces, changes, sync)
//! - `Session`: an authenticated token scoped to one checkout operation
//! - `HttpDepot`: transport implementation against the depot JSON gateway
//! - `fakes::MemoryDepot`: in-memory server for tests

mod error;
pub mod fakes;
mod http;
pub mod protocol;
mod session;

pub use error::RemoteError;
pub use http::HttpDepot;
pub use protocol::{
    ChangeSummary, DepotTransport, LineEnd, SessionToken, SyncAction, SyncOptions, SyncedFile,
    WorkspacePatch, WorkspaceRecord, WorkspaceSummary,
};
pub use session::Session;

/// Result type for remote depot operations
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;
