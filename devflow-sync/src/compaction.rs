//! Compaction stage: collapse the private branch's unpublished commits into
//! one commit, or put the branch back exactly where it was.
//!
//! # Rewrite flow
//!
//! ```text
//! anchor = rev-parse HEAD
//! reset --soft <remote>/<target>      all k commits' changes are now staged
//! diff --cached --name-only           empty → content identical, no commit
//! message (flag → suggestion → prompt)
//! commit -m <message>
//! ```
//!
//! Every abandoned rewrite (cancelled prompt, empty message, failed reset or
//! commit, unexpected error) ends in `reset --hard <anchor>`, and HEAD is
//! verified against the anchor afterwards.

use serde::Serialize;

use devflow_core::{Aheadness, CommitId, Prompter, Session, Vcs};

use crate::error::{step, SyncError};
use crate::message::{MessageSource, Suggestion};

/// Why a rewrite was abandoned and rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RollbackReason {
    /// The operator cancelled the message prompt.
    Cancelled,
    /// The message was empty or whitespace only.
    EmptyMessage,
    ResetFailed { detail: String },
    CommitFailed { detail: String },
}

impl std::fmt::Display for RollbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RollbackReason::Cancelled => write!(f, "commit message cancelled"),
            RollbackReason::EmptyMessage => write!(f, "commit message was empty"),
            RollbackReason::ResetFailed { detail } => write!(f, "soft reset failed: {detail}"),
            RollbackReason::CommitFailed { detail } => write!(f, "commit failed: {detail}"),
        }
    }
}

/// What the stage did to the private branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CompactionOutcome {
    /// `k == 0`.
    NothingToPublish,
    /// `k == 1`; the branch is untouched.
    AlreadyAtomic,
    /// `k > 1` collapsed into `commit`.
    Collapsed { commit: CommitId, squashed: u32 },
    /// `k > 1` commits whose net change is empty; the branch now sits on the
    /// target's remote tip and no commit was created.
    ContentIdentical { squashed: u32 },
    /// The rewrite was abandoned; the branch is back on `anchor`.
    RolledBack {
        anchor: CommitId,
        reason: RollbackReason,
    },
}

/// Inputs that do not live on the [`Session`].
pub struct Compaction<'a> {
    pub vcs: &'a dyn Vcs,
    pub prompter: &'a dyn Prompter,
    pub messages: &'a dyn MessageSource,
    pub remote: &'a str,
    /// `--message`; skips both the suggestion and the prompt.
    pub message: Option<&'a str>,
}

enum Rewrite {
    Committed(CommitId),
    Identical,
    Abandoned(RollbackReason),
}

impl Compaction<'_> {
    /// Run the stage for an already rebased private branch. Records the anchor
    /// on `session` before the first rewriting call.
    pub fn run(&self, session: &mut Session, ahead: Aheadness) -> Result<CompactionOutcome, SyncError> {
        let squashed = match ahead {
            Aheadness::UpToDate => return Ok(CompactionOutcome::NothingToPublish),
            Aheadness::Atomic => return Ok(CompactionOutcome::AlreadyAtomic),
            Aheadness::Fragmented(n) => n,
        };

        let anchor = self
            .vcs
            .rev_parse("HEAD")
            .map_err(step("capture compaction anchor"))?;
        session.anchor = Some(anchor.clone());
        tracing::info!(
            "collapsing {squashed} commits on {} (anchor {})",
            session.private,
            anchor.short()
        );

        match self.rewrite(session) {
            Ok(Rewrite::Committed(commit)) => {
                tracing::info!("collapsed into {}", commit.short());
                Ok(CompactionOutcome::Collapsed { commit, squashed })
            }
            Ok(Rewrite::Identical) => {
                tracing::info!("net change of {squashed} commits is empty; nothing committed");
                Ok(CompactionOutcome::ContentIdentical { squashed })
            }
            Ok(Rewrite::Abandoned(reason)) => {
                tracing::warn!("compaction abandoned ({reason}); restoring {}", anchor.short());
                restore_anchor(self.vcs, &anchor)?;
                Ok(CompactionOutcome::RolledBack { anchor, reason })
            }
            Err(err) => {
                tracing::warn!("compaction failed ({err}); restoring {}", anchor.short());
                restore_anchor(self.vcs, &anchor)?;
                Err(err)
            }
        }
    }

    fn rewrite(&self, session: &Session) -> Result<Rewrite, SyncError> {
        let base = session.target.remote_ref(self.remote);
        if let Err(err) = self.vcs.reset_soft(&base) {
            return Ok(Rewrite::Abandoned(RollbackReason::ResetFailed {
                detail: err.detail(),
            }));
        }

        let staged = self
            .vcs
            .staged_paths()
            .map_err(step("list staged changes"))?;
        if staged.is_empty() {
            return Ok(Rewrite::Identical);
        }

        let message = match self.resolve_message(session, staged.len())? {
            Some(message) => message,
            None => return Ok(Rewrite::Abandoned(RollbackReason::Cancelled)),
        };
        let message = message.trim();
        if message.is_empty() {
            return Ok(Rewrite::Abandoned(RollbackReason::EmptyMessage));
        }

        if let Err(err) = self.vcs.commit(message) {
            return Ok(Rewrite::Abandoned(RollbackReason::CommitFailed {
                detail: err.detail(),
            }));
        }
        let commit = self
            .vcs
            .rev_parse("HEAD")
            .map_err(step("read collapsed commit"))?;
        Ok(Rewrite::Committed(commit))
    }

    /// `None` means cancelled.
    fn resolve_message(&self, session: &Session, files: usize) -> Result<Option<String>, SyncError> {
        if let Some(message) = self.message {
            return Ok(Some(message.to_owned()));
        }
        let suggestion = match self.messages.suggest(self.vcs.workdir()) {
            Suggestion::Message(text) => Some(text),
            Suggestion::Manual => None,
        };
        let question = format!(
            "Commit message for the squashed change on {} ({files} file(s))",
            session.private
        );
        Ok(self.prompter.text(&question, suggestion.as_deref())?)
    }
}

/// `reset --hard <anchor>` and verify HEAD landed on it.
pub fn restore_anchor(vcs: &dyn Vcs, anchor: &CommitId) -> Result<(), SyncError> {
    vcs.reset_hard(anchor.as_str())
        .map_err(|source| SyncError::RollbackFailed {
            anchor: anchor.clone(),
            source,
        })?;
    let actual = vcs
        .rev_parse("HEAD")
        .map_err(|source| SyncError::RollbackFailed {
            anchor: anchor.clone(),
            source,
        })?;
    if &actual != anchor {
        return Err(SyncError::RollbackMismatch {
            anchor: anchor.clone(),
            actual,
        });
    }
    Ok(())
}
