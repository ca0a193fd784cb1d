//! Tracing setup for depotsync binaries.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Output shape of the operator log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-oriented single-line text.
    Text,
    /// Newline-delimited JSON for aggregation pipelines.
    Json,
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides `default_level` when set. The global subscriber
/// can only be installed once per process; repeated calls are no-ops, so
/// embedding code and tests may both call this freely.
pub fn init_tracing(format: LogFormat, default_level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => {
            let _ = registry.with(fmt::layer().with_target(false).json()).try_init();
        }
        LogFormat::Text => {
            let _ = registry.with(fmt::layer().with_target(false)).try_init();
        }
    }
}
