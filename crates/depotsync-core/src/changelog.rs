//! Changelog-file production extension point.
//!
//! Deliberately absent functionality: the surrounding orchestrator names a
//! changelog artifact per build, but nothing produces one yet. The trait
//! exists so an orchestrator adapter can plug a writer in; the default
//! drops the change set.

use std::io;

use crate::domain::ChangeSet;

/// Receives the enumerated change range after a successful checkout.
pub trait ChangelogSink {
    fn write_changelog(&mut self, changes: &ChangeSet) -> io::Result<()>;
}

/// The default sink: produces no changelog artifact.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoChangelog;

impl ChangelogSink for NoChangelog {
    fn write_changelog(&mut self, _changes: &ChangeSet) -> io::Result<()> {
        Ok(())
    }
}
