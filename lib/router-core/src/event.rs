//! Watch event kinds understood by the admission chain

use std::fmt;

/// Kind of change delivered for a route or endpoint set.
///
/// Watch signals that are not object changes (relist markers, bookmarks)
/// never reach the plugin chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Added,
    Modified,
    Deleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Added => "Added",
            EventKind::Modified => "Modified",
            EventKind::Deleted => "Deleted",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
