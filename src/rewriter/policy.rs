use serde::Deserialize;
use std::fmt;

/// How the rewriter treats an edit that lands on an already-edited range.
///
/// Edits that merely share a boundary never conflict; neither do two
/// inserts at the same position, which stack in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapPolicy {
    /// Refuse the edit with [`RewriteError::Overlap`](super::RewriteError)
    /// and leave the rewriter untouched.
    #[default]
    Reject,
    /// The new edit absorbs every earlier edit it intersects: its tag widens
    /// to cover them and their replacement bytes are dropped.
    LastWriteWins,
}

impl fmt::Display for OverlapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlapPolicy::Reject => write!(f, "reject"),
            OverlapPolicy::LastWriteWins => write!(f, "last-write-wins"),
        }
    }
}
