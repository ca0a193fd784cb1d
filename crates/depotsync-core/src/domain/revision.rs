//! Revision markers: opaque, monotonically increasing change identifiers.

use serde::{Deserialize, Serialize};

/// A point in the depot's change history, as recorded on a build.
///
/// `Unknown` is the sentinel for "no revision recorded yet" (first-ever
/// build, or every prior attempt failed before recording). Markers are
/// created once per successful checkout and never mutated afterwards.
///
/// Ordering: `Unknown` sorts below every real change, and real changes
/// order by change number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum RevisionMarker {
    /// No revision recorded yet.
    #[default]
    Unknown,
    /// A submitted change number.
    Change(u64),
}

impl RevisionMarker {
    /// Whether this marker names a real change.
    pub fn is_known(&self) -> bool {
        matches!(self, RevisionMarker::Change(_))
    }

    /// The change number, if known.
    pub fn change_number(&self) -> Option<u64> {
        match self {
            RevisionMarker::Unknown => None,
            RevisionMarker::Change(id) => Some(*id),
        }
    }
}

impl std::fmt::Display for RevisionMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RevisionMarker::Unknown => write!(f, "unknown"),
            RevisionMarker::Change(id) => write!(f, "{id}"),
        }
    }
}

impl From<u64> for RevisionMarker {
    fn from(id: u64) -> Self {
        RevisionMarker::Change(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_sorts_below_every_change() {
        assert!(RevisionMarker::Unknown < RevisionMarker::Change(0));
        assert!(RevisionMarker::Change(103) < RevisionMarker::Change(107));
    }

    #[test]
    fn display_and_accessors() {
        assert_eq!(RevisionMarker::Change(103).to_string(), "103");
        assert_eq!(RevisionMarker::Unknown.to_string(), "unknown");
        assert_eq!(RevisionMarker::Change(103).change_number(), Some(103));
        assert!(!RevisionMarker::Unknown.is_known());
    }

    #[test]
    fn serde_round_trip() {
        let marker = RevisionMarker::Change(107);
        let json = serde_json::to_string(&marker).unwrap();
        let back: RevisionMarker = serde_json::from_str(&json).unwrap();
        assert_eq!(back, marker);
    }
}
