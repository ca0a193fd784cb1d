//! Backward traversal of the externally-owned build history.
//!
//! The orchestrator owns the build records; this core only reads the chain
//! through `BuildRecord` and writes one marker per successful checkout
//! through `RevisionSink`.

use tracing::{debug, warn};

use crate::domain::RevisionMarker;

/// Defensive cap on history traversal depth. The loop normally stops at
/// the first attached marker; the cap only matters for pathological
/// chains with thousands of markerless builds.
pub const MAX_HISTORY_DEPTH: usize = 10_000;

/// Read side of one prior build in the orchestrator's history chain.
pub trait BuildRecord {
    /// The revision marker attached to this build, if any.
    fn revision_marker(&self) -> Option<RevisionMarker>;

    /// The build before this one, or `None` at the root of the chain.
    fn previous(&self) -> Option<&dyn BuildRecord>;
}

/// Write side: where the current build's marker is recorded after a
/// successful sync. Must never be called for a failed sync.
pub trait RevisionSink {
    fn attach_revision(&mut self, marker: RevisionMarker);
}

/// Walk the chain backward from the most recent prior build and return
/// the first attached marker, or `Unknown` when the chain is exhausted
/// (first-ever build, or no prior attempt ever recorded one).
pub fn last_known(start: Option<&dyn BuildRecord>) -> RevisionMarker {
    let mut cursor = start;
    let mut depth = 0usize;
    while let Some(record) = cursor {
        if let Some(marker) = record.revision_marker() {
            debug!(marker = %marker, depth = depth, "found last recorded revision");
            return marker;
        }
        depth += 1;
        if depth >= MAX_HISTORY_DEPTH {
            warn!(
                depth = depth,
                "giving up build-history traversal at depth cap"
            );
            break;
        }
        cursor = record.previous();
    }
    RevisionMarker::Unknown
}

/// A linked in-memory build record. Orchestrators embed their own record
/// types; this one backs tests and the CLI's single-slot history.
#[derive(Debug, Default)]
pub struct MemoryBuild {
    marker: Option<RevisionMarker>,
    previous: Option<Box<MemoryBuild>>,
}

impl MemoryBuild {
    /// A fresh build with no marker and no history.
    pub fn first() -> Self {
        MemoryBuild::default()
    }

    /// A build following `previous`.
    pub fn after(previous: MemoryBuild) -> Self {
        MemoryBuild {
            marker: None,
            previous: Some(Box::new(previous)),
        }
    }

    pub fn marker(&self) -> Option<RevisionMarker> {
        self.marker
    }
}

impl BuildRecord for MemoryBuild {
    fn revision_marker(&self) -> Option<RevisionMarker> {
        self.marker
    }

    fn previous(&self) -> Option<&dyn BuildRecord> {
        self.previous.as_deref().map(|b| b as &dyn BuildRecord)
    }
}

impl RevisionSink for MemoryBuild {
    fn attach_revision(&mut self, marker: RevisionMarker) {
        self.marker = Some(marker);
    }
}
