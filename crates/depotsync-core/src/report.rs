//! Line-oriented build-log writer.
//!
//! This is the human-facing console output of a checkout, separate from
//! `tracing` (which feeds the operator log). Writes are best effort: a
//! console that goes away must not abort the checkout, so I/O errors are
//! swallowed.

use std::fmt::Display;
use std::io::Write;

/// Column the value starts at; labels are padded to it with dots.
const LABEL_WIDTH: usize = 30;

/// Sentinel printed for the last-built revision when no prior build
/// recorded one.
pub const NO_PREVIOUS_BUILDS: &str = "no previous builds";

/// Build-log writer over any `io::Write`.
pub struct BuildLog<W: Write> {
    out: W,
}

impl<W: Write> BuildLog<W> {
    pub fn new(out: W) -> Self {
        BuildLog { out }
    }

    /// A labeled value line: the label padded to a fixed column with `.`
    /// fill, then the value.
    pub fn field(&mut self, label: &str, value: impl Display) {
        let _ = writeln!(self.out, "{label:.<LABEL_WIDTH$}{value}");
    }

    /// A plain line.
    pub fn line(&mut self, text: impl Display) {
        let _ = writeln!(self.out, "{text}");
    }

    /// An error line, prefixed the way the build console highlights them.
    pub fn error(&mut self, stage: &str, message: impl Display) {
        let _ = writeln!(self.out, "*** ERROR ({stage}): {message}");
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}
