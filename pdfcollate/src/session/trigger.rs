//! The merge button's state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{PdfCollateError, Result};

/// Label shown while the trigger is ready.
pub const READY_LABEL: &str = "Merge PDFs";

/// Label shown while a merge runs.
pub const BUSY_LABEL: &str = "Merging...";

/// Ready/busy flag that makes merges mutually exclusive.
#[derive(Debug, Default)]
pub struct MergeTrigger {
    busy: AtomicBool,
}

impl MergeTrigger {
    /// A trigger in the ready state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip to busy, or fail with [`PdfCollateError::MergeInProgress`].
    ///
    /// The trigger goes back to ready when the guard drops. The guard owns
    /// a handle to the trigger so it can travel with a merge task.
    pub fn acquire(self: &Arc<Self>) -> Result<MergeGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| MergeGuard {
                trigger: Arc::clone(self),
            })
            .map_err(|_| PdfCollateError::MergeInProgress)
    }

    /// Whether a merge may start.
    pub fn is_ready(&self) -> bool {
        !self.busy.load(Ordering::Acquire)
    }

    /// The label a button bound to this trigger shows.
    pub fn label(&self) -> &'static str {
        if self.is_ready() { READY_LABEL } else { BUSY_LABEL }
    }
}

/// Holds the trigger busy.
#[derive(Debug)]
pub struct MergeGuard {
    trigger: Arc<MergeTrigger>,
}

impl Drop for MergeGuard {
    fn drop(&mut self) {
        self.trigger.busy.store(false, Ordering::Release);
    }
}
