//! Commands that mutate a session, consumed in arrival order.

use super::collection::PageEntry;
use super::ids::PageId;
use super::rotation::Rotation;

/// A request from the application shell.
#[derive(Debug, Clone)]
pub enum Command {
    /// Add a rendered page at the end of the collection.
    Append(PageEntry),
    /// Remove a page. Unknown ids are ignored.
    Remove(PageId),
    /// Replace the order with this id sequence.
    Reorder(Vec<PageId>),
    /// Turn a page by a multiple of 90 degrees.
    Rotate {
        /// Page to turn.
        page_id: PageId,
        /// Degrees to add, negative for counter-clockwise.
        delta: i32,
    },
    /// Merge the collection as it stands.
    StartMerge,
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Append(_) => "append",
            Self::Remove(_) => "remove",
            Self::Reorder(_) => "reorder",
            Self::Rotate { .. } => "rotate",
            Self::StartMerge => "start_merge",
        }
    }
}

/// What a collection command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The page was appended.
    Appended(PageId),
    /// The page was removed, or was not there (`false`).
    Removed(bool),
    /// The order was replaced; `dropped` ids were unknown or repeated.
    Reordered {
        /// Ids ignored from the requested sequence.
        dropped: usize,
    },
    /// The page's new rotation, or `None` if it was not there.
    Rotated(Option<Rotation>),
}
