//! Depotsync Core Library
//!
//! Re-exports the checkout orchestration and domain types for programmatic
//! embedding in a build orchestrator.

pub mod changelog;
pub mod checkout;
pub mod config;
pub mod domain;
pub mod history;
pub mod report;
pub mod telemetry;

pub use changelog::{ChangelogSink, NoChangelog};
pub use checkout::{Checkout, CheckoutOutcome, FULL_TREE_SCOPE};
pub use config::{CheckoutConfig, ConfigError, NodeIdentity, UNKNOWN_HOST};
pub use domain::{
    drift_patch, ChangeSet, CheckoutError, RevisionMarker, WorkspaceIdentity, WorkspaceSpec,
    DEFAULT_LOOKBACK_WINDOW,
};
pub use history::{last_known, BuildRecord, MemoryBuild, RevisionSink, MAX_HISTORY_DEPTH};
pub use report::{BuildLog, NO_PREVIOUS_BUILDS};
pub use telemetry::{init_tracing, LogFormat};

/// Result type for checkout operations
pub type Result<T> = std::result::Result<T, domain::CheckoutError>;

/// Depotsync version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
