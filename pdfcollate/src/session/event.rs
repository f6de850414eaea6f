//! Notifications a session sends to whatever shows them to the user.

use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;

use super::ids::{FileId, PageId};

/// Something the user should hear about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SessionEvent {
    /// Ingestion appended a page.
    #[serde(rename_all = "camelCase")]
    PageAppended {
        /// New page id.
        page_id: PageId,
        /// File the page belongs to.
        file_id: FileId,
        /// 1-based page number within the file.
        page_number: u32,
    },

    /// A page could not be rendered and was skipped.
    #[serde(rename_all = "camelCase")]
    PageRenderFailed {
        /// Name of the file.
        file: String,
        /// 1-based page number.
        page_number: u32,
        /// User-facing message.
        message: String,
    },

    /// A file could not be loaded; none of its pages were added.
    #[serde(rename_all = "camelCase")]
    FileLoadFailed {
        /// Name of the file.
        file: String,
        /// User-facing message.
        message: String,
    },

    /// A merge took its snapshot and started.
    #[serde(rename_all = "camelCase")]
    MergeStarted {
        /// Pages in the snapshot.
        pages: usize,
    },

    /// A merge produced an artifact.
    #[serde(rename_all = "camelCase")]
    MergeFinished {
        /// URL of the published artifact.
        url: String,
        /// Pages in the output.
        pages: usize,
        /// Time from snapshot to artifact.
        #[serde(serialize_with = "crate::utils::serialize_millis")]
        elapsed: Duration,
    },

    /// A merge started but failed.
    #[serde(rename_all = "camelCase")]
    MergeFailed {
        /// User-facing message.
        message: String,
    },

    /// A merge was refused before it started.
    #[serde(rename_all = "camelCase")]
    MergeRejected {
        /// User-facing message.
        message: String,
    },
}

impl SessionEvent {
    /// Whether this event reports a failure.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::PageRenderFailed { .. }
                | Self::FileLoadFailed { .. }
                | Self::MergeFailed { .. }
                | Self::MergeRejected { .. }
        )
    }
}

/// Sending half of a session's event channel.
pub type EventSender = mpsc::UnboundedSender<SessionEvent>;

/// Receiving half of a session's event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = SessionEvent::PageAppended {
            page_id: PageId(4),
            file_id: FileId(2),
            page_number: 1,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "pageAppended");
        assert_eq!(json["pageId"], 4);
        assert_eq!(json["fileId"], 2);
    }

    #[test]
    fn test_merge_finished_elapsed_in_millis() {
        let event = SessionEvent::MergeFinished {
            url: "blob:pdfcollate/x".into(),
            pages: 3,
            elapsed: Duration::from_millis(1500),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["elapsed"], 1500);
    }

    #[test]
    fn test_failures() {
        assert!(
            SessionEvent::MergeRejected {
                message: String::new()
            }
            .is_failure()
        );
        assert!(!SessionEvent::MergeStarted { pages: 2 }.is_failure());
    }
}
