//! depotsync - depot checkouts from the command line
//!
//! The `depotsync` command runs the same checkout the CI integration runs:
//! resolve the per-node workspace, report the change range since the last
//! recorded build, sync to head and record the resulting revision.
//!
//! ## Commands
//!
//! - `checkout`: run one checkout into a working directory
//! - `head`: print the newest change visible on the server

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::Level;

use depotsync_core::{
    init_tracing, BuildLog, Checkout, CheckoutConfig, LogFormat, MemoryBuild, NoChangelog,
    NodeIdentity, RevisionMarker, RevisionSink, FULL_TREE_SCOPE,
};
use depotsync_remote::{HttpDepot, Session};

#[derive(Parser)]
#[command(name = "depotsync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CI checkout runner for centralized depot servers", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ServerArgs {
    /// Depot server address, host:port
    #[arg(long, env = "DEPOT_PORT")]
    port: String,

    /// Depot user
    #[arg(long, env = "DEPOT_USER")]
    user: String,

    /// Credential for the depot user
    #[arg(long, env = "DEPOT_CREDENTIAL", hide_env_values = true)]
    credential: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one checkout into a working directory
    Checkout {
        #[command(flatten)]
        server: ServerArgs,

        /// Base workspace name (node suffix is appended automatically)
        #[arg(long, env = "DEPOT_CLIENT")]
        client: String,

        /// Stream the workspace tracks
        #[arg(long, env = "DEPOT_STREAM")]
        stream: String,

        /// Build working directory
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Node name, when running on a named build node
        #[arg(long, env = "DEPOT_NODE")]
        node: Option<String>,

        /// Where the last recorded revision lives between runs
        /// (default: <root>/.depotsync-state.json)
        #[arg(long)]
        state_file: Option<PathBuf>,
    },

    /// Print the newest change visible on the server
    Head {
        #[command(flatten)]
        server: ServerArgs,
    },
}

/// On-disk stand-in for the orchestrator's build history: one slot
/// holding the marker of the last successful checkout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    revision: Option<RevisionMarker>,
}

impl StateFile {
    fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(StateFile::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading state file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing state file {}", path.display()))
    }

    fn store(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)
            .with_context(|| format!("writing state file {}", path.display()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let format = if cli.json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(format, level);

    match cli.command {
        Commands::Checkout {
            server,
            client,
            stream,
            root,
            node,
            state_file,
        } => run_checkout(server, client, stream, root, node, state_file).await,
        Commands::Head { server } => print_head(server).await,
    }
}

async fn run_checkout(
    server: ServerArgs,
    client: String,
    stream: String,
    root: PathBuf,
    node: Option<String>,
    state_file: Option<PathBuf>,
) -> Result<()> {
    let config = CheckoutConfig {
        port: server.port.clone(),
        user: server.user,
        credential: server.credential,
        client,
        stream,
    };
    let node = NodeIdentity {
        name: node,
        host: std::env::var("HOSTNAME").ok(),
    };

    let state_path = state_file.unwrap_or_else(|| root.join(".depotsync-state.json"));
    let mut state = StateFile::load(&state_path)?;

    let mut previous = MemoryBuild::first();
    if let Some(marker) = state.revision {
        previous.attach_revision(marker);
    }

    let transport = Arc::new(HttpDepot::new(&server.port)?);
    let checkout = Checkout::new(config, node, transport);

    let mut build = MemoryBuild::first();
    let mut log = BuildLog::new(std::io::stdout());
    let outcome = checkout
        .run(&root, Some(&previous), &mut build, &mut NoChangelog, &mut log)
        .await;

    if !outcome.succeeded() {
        // The failure was already written to both logs; the exit code is
        // all that is left to report.
        std::process::exit(1);
    }

    if let Some(marker) = build.marker() {
        state.revision = Some(marker);
        state.store(&state_path)?;
    }
    Ok(())
}

async fn print_head(server: ServerArgs) -> Result<()> {
    let transport: Arc<HttpDepot> = Arc::new(HttpDepot::new(&server.port)?);
    let session = Session::open(transport, &server.user, &server.credential)
        .await
        .context("depot login failed")?;

    let result = session
        .transport()
        .list_changes(session.token(), FULL_TREE_SCOPE, 1)
        .await;
    session.close().await;

    let changes = result.context("change listing failed")?;
    match changes.first() {
        Some(change) => {
            println!("{} {} {}", change.id, change.author, change.description);
            Ok(())
        }
        None => bail!("no changes visible on the server"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let missing = StateFile::load(&path).unwrap();
        assert!(missing.revision.is_none());

        let state = StateFile {
            revision: Some(RevisionMarker::Change(107)),
        };
        state.store(&path).unwrap();

        let back = StateFile::load(&path).unwrap();
        assert_eq!(back.revision, Some(RevisionMarker::Change(107)));
    }
}
