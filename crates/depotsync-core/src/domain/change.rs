//! Bounded, newest-first change enumeration results.

use depotsync_remote::ChangeSummary;

use crate::domain::revision::RevisionMarker;

/// Default lookback window: the maximum number of most-recent changes one
/// enumeration query returns.
pub const DEFAULT_LOOKBACK_WINDOW: usize = 100;

/// An ordered-by-recency slice of the depot's change history.
///
/// Bounded to the lookback window it was queried with. When the real gap
/// since the last build exceeds the window, older changes in the gap are
/// not present here even though sync still goes to head; that truncation
/// is intentional and documented on `Checkout::enumerate_changes`.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    entries: Vec<ChangeSummary>,
}

impl ChangeSet {
    /// Wrap a newest-first server listing.
    pub fn new(entries: Vec<ChangeSummary>) -> Self {
        debug_assert!(
            entries.windows(2).all(|w| w[0].id >= w[1].id),
            "change listings must be newest first"
        );
        ChangeSet { entries }
    }

    /// The most recent change, if any.
    pub fn newest(&self) -> Option<&ChangeSummary> {
        self.entries.first()
    }

    /// The head revision marker, or `Unknown` for an empty set.
    pub fn head_marker(&self) -> RevisionMarker {
        self.newest()
            .map(|c| RevisionMarker::Change(c.id))
            .unwrap_or(RevisionMarker::Unknown)
    }

    /// Entries newer than the given marker, preserving newest-first order.
    pub fn since(&self, marker: RevisionMarker) -> impl Iterator<Item = &ChangeSummary> {
        let floor = marker.change_number();
        self.entries
            .iter()
            .filter(move |c| floor.map_or(true, |f| c.id > f))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeSummary> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn change(id: u64) -> ChangeSummary {
        ChangeSummary {
            id,
            author: "dev".to_string(),
            description: format!("change {id}"),
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn head_marker_of_empty_set_is_unknown() {
        assert_eq!(ChangeSet::default().head_marker(), RevisionMarker::Unknown);
    }

    #[test]
    fn newest_is_the_first_entry() {
        let set = ChangeSet::new(vec![change(107), change(106), change(105)]);
        assert_eq!(set.newest().unwrap().id, 107);
        assert_eq!(set.head_marker(), RevisionMarker::Change(107));
    }

    #[test]
    fn since_filters_at_the_marker_exclusive() {
        let set = ChangeSet::new(vec![change(107), change(106), change(105), change(104)]);

        let ids: Vec<u64> = set
            .since(RevisionMarker::Change(105))
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![107, 106]);

        let all: Vec<u64> = set.since(RevisionMarker::Unknown).map(|c| c.id).collect();
        assert_eq!(all, vec![107, 106, 105, 104]);
    }
}
