//! # devflow-sync
//!
//! Branch synchronisation and history compaction.
//!
//! Call [`pipeline::run`] to sync a private branch into a shared one:
//! safety gate, rebase, ahead count, compaction, publish, branch restore.
//! [`trunk::run`] and the [`release`] flows reuse the same stages and VCS
//! adapter.

pub mod compaction;
pub mod error;
pub mod gate;
pub mod message;
pub mod pipeline;
pub mod publish;
pub mod rebase;
pub mod release;
pub mod select;
pub mod trunk;

pub use compaction::{CompactionOutcome, RollbackReason};
pub use error::SyncError;
pub use message::{CommandMessageSource, ManualEntry, MessageSource, Suggestion};
pub use pipeline::{
    AbortReason, Precondition, SessionOutcome, SessionState, SyncContext, SyncOptions, SyncReport,
};
pub use publish::{PublishOutcome, PublishStep};
pub use rebase::{RebaseOutcome, REBASE_REMEDIATION};
pub use release::{FinishOptions, ReleaseContext, ReleaseOutcome, StartOptions};
pub use trunk::TrunkOutcome;
