//! Domain types for the checkout core.

pub mod change;
pub mod error;
pub mod revision;
pub mod workspace;

pub use change::{ChangeSet, DEFAULT_LOOKBACK_WINDOW};
pub use error::CheckoutError;
pub use revision::RevisionMarker;
pub use workspace::{drift_patch, WorkspaceIdentity, WorkspaceSpec};
