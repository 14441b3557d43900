//! Error types for devflow-sync.
//!
//! Outcomes a session is expected to reach (conflict, rollback, partial
//! publish, race) are values of [`crate::SessionOutcome`], not errors. A
//! [`SyncError`] means the run could not reach any documented outcome.

use thiserror::Error;

use devflow_core::{CommitId, PromptError, VcsError};

/// All unexpected failures of a sync, trunk-sync or release run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A git call the run cannot continue without.
    #[error("{step}: {source}")]
    Vcs {
        step: String,
        #[source]
        source: VcsError,
    },

    /// The prompt provider broke (terminal gone, script mismatch).
    #[error("prompt error: {0}")]
    Prompt(#[from] PromptError),

    /// Compaction could not put the private branch back on its anchor.
    #[error(
        "rollback to {anchor} failed; restore it with `git reset --hard {anchor}`: {source}"
    )]
    RollbackFailed {
        anchor: CommitId,
        #[source]
        source: VcsError,
    },

    /// The hard reset ran but HEAD is not where the anchor says.
    #[error("rollback left HEAD at {actual}, expected {anchor}; restore it with `git reset --hard {anchor}`")]
    RollbackMismatch { anchor: CommitId, actual: CommitId },
}

/// Attach a short description of the step to a [`VcsError`].
pub(crate) fn step(step: impl Into<String>) -> impl FnOnce(VcsError) -> SyncError {
    let step = step.into();
    move |source| SyncError::Vcs { step, source }
}
