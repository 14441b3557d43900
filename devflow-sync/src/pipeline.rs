//! Session orchestrator for `flow sync`.
//!
//! ```text
//! Init → CleanChecked → BranchChosen → OwnershipConfirmed → TargetChosen
//!      → Rebased → AheadCounted → Compacted → Published → Restored → Terminal
//! ```
//!
//! Every state is entered at most once and only forward; aborts and failures
//! jump straight to `Terminal`. Nothing survives the run: the next invocation
//! starts again at `Init`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use devflow_core::{Aheadness, BranchName, CommitId, FlowConfig, Prompter, Session, Vcs};

use crate::compaction::{Compaction, CompactionOutcome, RollbackReason};
use crate::error::{step, SyncError};
use crate::gate::{self, CleanCheck, Ownership};
use crate::message::MessageSource;
use crate::publish::{self, PublishOutcome, PublishStep};
use crate::rebase::{self, RebaseOutcome};
use crate::select::{self, Selection};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Collaborators a run needs.
pub struct SyncContext<'a> {
    pub vcs: &'a dyn Vcs,
    pub prompter: &'a dyn Prompter,
    pub messages: &'a dyn MessageSource,
    pub config: &'a FlowConfig,
}

/// Answers supplied up front; every `None` is asked interactively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    pub private: Option<BranchName>,
    pub target: Option<BranchName>,
    pub message: Option<String>,
    /// Skip the ownership confirmation.
    pub assume_private: bool,
}

// ---------------------------------------------------------------------------
// States and outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompactStatus {
    Skipped,
    Collapsed,
    Identical,
    RolledBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    Done,
    Partial,
    Race,
    Failed,
}

/// One step of the session trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "status")]
pub enum SessionState {
    Init,
    CleanChecked,
    BranchChosen,
    OwnershipConfirmed,
    TargetChosen,
    /// Only clean rebases are recorded; a conflict ends the run here.
    Rebased,
    AheadCounted(u32),
    Compacted(CompactStatus),
    Published(PublishStatus),
    Restored,
    Terminal,
}

impl SessionState {
    fn rank(&self) -> u8 {
        match self {
            SessionState::Init => 0,
            SessionState::CleanChecked => 1,
            SessionState::BranchChosen => 2,
            SessionState::OwnershipConfirmed => 3,
            SessionState::TargetChosen => 4,
            SessionState::Rebased => 5,
            SessionState::AheadCounted(_) => 6,
            SessionState::Compacted(_) => 7,
            SessionState::Published(_) => 8,
            SessionState::Restored => 9,
            SessionState::Terminal => 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Precondition {
    DirtyTree { paths: Vec<String> },
    NoPrivateBranch,
    UnknownBranch { branch: BranchName },
    NoTargetBranch,
    SameBranch { branch: BranchName },
}

impl std::fmt::Display for Precondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Precondition::DirtyTree { paths } => {
                write!(f, "working tree has uncommitted changes ({} path(s))", paths.len())
            }
            Precondition::NoPrivateBranch => write!(f, "no private branch selected"),
            Precondition::UnknownBranch { branch } => write!(f, "no local branch named {branch}"),
            Precondition::NoTargetBranch => write!(f, "no target branch selected"),
            Precondition::SameBranch { branch } => {
                write!(f, "private and target branch are both {branch}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// The operator did not confirm exclusive ownership.
    NotPrivate,
    /// A prompt was cancelled.
    Cancelled,
}

/// How a run ended. Only [`SessionOutcome::exit_code`] decides the process
/// status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SessionOutcome {
    Published {
        commit: CommitId,
        squashed: u32,
        /// Command the operator should run to update the private branch's
        /// own upstream.
        #[serde(skip_serializing_if = "Option::is_none")]
        upstream_hint: Option<String>,
    },
    NothingToPublish,
    ContentIdentical { squashed: u32 },
    Aborted { reason: AbortReason },
    Precondition { failure: Precondition },
    Conflicted { detail: String },
    RolledBack { anchor: CommitId, reason: RollbackReason },
    PartialFailure { head: CommitId, detail: String },
    Race { detail: String },
    PublishFailed { step: PublishStep, detail: String },
}

impl SessionOutcome {
    /// `0` for success, nothing to do, operator abort and rebase conflict;
    /// `1` otherwise. A cancelled message prompt is an operator abort even
    /// though the branch had to be rolled back first.
    pub fn exit_code(&self) -> u8 {
        match self {
            SessionOutcome::Published { .. }
            | SessionOutcome::NothingToPublish
            | SessionOutcome::ContentIdentical { .. }
            | SessionOutcome::Aborted { .. }
            | SessionOutcome::Conflicted { .. }
            | SessionOutcome::RolledBack {
                reason: RollbackReason::Cancelled,
                ..
            } => 0,
            SessionOutcome::Precondition { .. }
            | SessionOutcome::RolledBack { .. }
            | SessionOutcome::PartialFailure { .. }
            | SessionOutcome::Race { .. }
            | SessionOutcome::PublishFailed { .. } => 1,
        }
    }
}

/// Everything a caller needs to render a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// `None` when the run ended before both branches were known.
    pub session: Option<Session>,
    pub outcome: SessionOutcome,
    pub trail: Vec<SessionState>,
    /// Set when switching back to the private branch failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restore_warning: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    pub fn exit_code(&self) -> u8 {
        self.outcome.exit_code()
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Run one sync session to a terminal outcome.
///
/// `Err` only for failures outside the documented outcomes (git missing,
/// a broken prompt, a rollback that could not be verified). The private
/// branch is still restored on the way out when publish had switched away.
pub fn run(ctx: &SyncContext<'_>, options: SyncOptions) -> Result<SyncReport, SyncError> {
    let started_at = Utc::now();
    let mut run = Run {
        ctx,
        options,
        session: None,
        trail: vec![SessionState::Init],
        left_private: false,
    };

    let result = run.drive();
    let restore_warning = run.restore();
    let outcome = result?;
    run.enter(SessionState::Terminal);

    tracing::info!("sync finished: {:?}", outcome);
    Ok(SyncReport {
        session: run.session,
        outcome,
        trail: run.trail,
        restore_warning,
        started_at,
        finished_at: Utc::now(),
    })
}

struct Run<'c, 'a> {
    ctx: &'c SyncContext<'a>,
    options: SyncOptions,
    session: Option<Session>,
    trail: Vec<SessionState>,
    /// Publish checked out the target.
    left_private: bool,
}

impl Run<'_, '_> {
    fn enter(&mut self, state: SessionState) {
        if let Some(last) = self.trail.last() {
            debug_assert!(
                last.rank() < state.rank(),
                "session moved backwards: {last:?} -> {state:?}"
            );
        }
        tracing::debug!("session state {state:?}");
        self.trail.push(state);
    }

    fn drive(&mut self) -> Result<SessionOutcome, SyncError> {
        let vcs = self.ctx.vcs;
        let config = self.ctx.config;

        // Safety gate
        if let CleanCheck::Dirty { paths } = gate::check_clean(vcs)? {
            return Ok(precondition(Precondition::DirtyTree { paths }));
        }
        self.enter(SessionState::CleanChecked);

        let started_on = vcs.current_branch().map_err(step("read current branch"))?;
        let private = match self.choose_private(started_on.as_ref())? {
            Ok(branch) => branch,
            Err(outcome) => return Ok(outcome),
        };
        self.enter(SessionState::BranchChosen);

        match gate::confirm_ownership(self.ctx.prompter, &private, self.options.assume_private)? {
            Ownership::Confirmed => {}
            Ownership::Declined => return Ok(aborted(AbortReason::NotPrivate)),
            Ownership::Cancelled => return Ok(aborted(AbortReason::Cancelled)),
        }
        self.enter(SessionState::OwnershipConfirmed);

        let target = match self.choose_target()? {
            Ok(branch) => branch,
            Err(outcome) => return Ok(outcome),
        };
        if target == private {
            return Ok(precondition(Precondition::SameBranch { branch: target }));
        }
        let mut session = Session::new(started_on, private, target);
        self.session = Some(session.clone());
        self.enter(SessionState::TargetChosen);

        // Rebase
        let remote = config.remote.as_str();
        if let RebaseOutcome::Conflicted { detail } = rebase::rebase(vcs, &session, remote)? {
            return Ok(SessionOutcome::Conflicted { detail });
        }
        self.enter(SessionState::Rebased);

        let count = vcs
            .rev_list_count(&session.target.remote_ref(remote), session.private.as_str())
            .map_err(step("count unpublished commits"))?;
        let ahead = Aheadness::from_count(count);
        tracing::info!("{} is {count} commit(s) ahead of {}", session.private, session.target);
        session.ahead = Some(ahead);
        self.session = Some(session.clone());
        self.enter(SessionState::AheadCounted(count));

        // Compaction
        let compaction = Compaction {
            vcs,
            prompter: self.ctx.prompter,
            messages: self.ctx.messages,
            remote,
            message: self.options.message.as_deref(),
        };
        let compacted = compaction.run(&mut session, ahead);
        self.session = Some(session.clone());
        let squashed = match compacted? {
            CompactionOutcome::NothingToPublish => return Ok(SessionOutcome::NothingToPublish),
            CompactionOutcome::AlreadyAtomic => {
                self.enter(SessionState::Compacted(CompactStatus::Skipped));
                1
            }
            CompactionOutcome::Collapsed { squashed, .. } => {
                self.enter(SessionState::Compacted(CompactStatus::Collapsed));
                squashed
            }
            CompactionOutcome::ContentIdentical { squashed } => {
                self.enter(SessionState::Compacted(CompactStatus::Identical));
                return Ok(SessionOutcome::ContentIdentical { squashed });
            }
            CompactionOutcome::RolledBack { anchor, reason } => {
                self.enter(SessionState::Compacted(CompactStatus::RolledBack));
                return Ok(SessionOutcome::RolledBack { anchor, reason });
            }
        };

        // Publish
        self.left_private = true;
        let outcome = match publish::publish(vcs, &session, remote)? {
            PublishOutcome::Published { head } => {
                self.enter(SessionState::Published(PublishStatus::Done));
                SessionOutcome::Published {
                    commit: head,
                    squashed,
                    upstream_hint: upstream_hint(vcs, &session.private, remote),
                }
            }
            PublishOutcome::PartialFailure { head, detail } => {
                self.enter(SessionState::Published(PublishStatus::Partial));
                SessionOutcome::PartialFailure { head, detail }
            }
            PublishOutcome::Race { detail } => {
                self.enter(SessionState::Published(PublishStatus::Race));
                SessionOutcome::Race { detail }
            }
            PublishOutcome::Failed { step, detail } => {
                self.enter(SessionState::Published(PublishStatus::Failed));
                SessionOutcome::PublishFailed { step, detail }
            }
        };
        Ok(outcome)
    }

    /// Switch back to the private branch if publish left it. Returns the
    /// failure as a warning.
    fn restore(&mut self) -> Option<String> {
        if !self.left_private {
            return None;
        }
        let private = self.session.as_ref()?.private.clone();
        match publish::restore_branch(self.ctx.vcs, &private) {
            Ok(()) => {
                self.enter(SessionState::Restored);
                None
            }
            Err(warning) => Some(warning),
        }
    }

    fn choose_private(
        &self,
        current: Option<&BranchName>,
    ) -> Result<Result<BranchName, SessionOutcome>, SyncError> {
        let vcs = self.ctx.vcs;
        let branch = match &self.options.private {
            Some(branch) => branch.clone(),
            None => {
                let entries = select::local_candidates(vcs, self.ctx.config.branch_list_limit)?;
                match select::choose_branch(
                    self.ctx.prompter,
                    "Which private branch do you want to sync?",
                    &entries,
                    current,
                )? {
                    Selection::Chosen(branch) => branch,
                    Selection::Empty => return Ok(Err(precondition(Precondition::NoPrivateBranch))),
                    Selection::Cancelled => return Ok(Err(aborted(AbortReason::Cancelled))),
                }
            }
        };
        let exists = vcs
            .local_branch_exists(&branch)
            .map_err(step(format!("look up branch {branch}")))?;
        if !exists {
            return Ok(Err(precondition(Precondition::UnknownBranch { branch })));
        }
        Ok(Ok(branch))
    }

    fn choose_target(&self) -> Result<Result<BranchName, SessionOutcome>, SyncError> {
        if let Some(branch) = &self.options.target {
            return Ok(Ok(branch.clone()));
        }
        let config = self.ctx.config;
        let entries = select::remote_candidates(
            self.ctx.vcs,
            &config.remote,
            &config.feature_prefix,
            config.branch_list_limit,
        )?;
        Ok(
            match select::choose_branch(
                self.ctx.prompter,
                "Which shared branch should receive the change?",
                &entries,
                None,
            )? {
                Selection::Chosen(branch) => Ok(branch),
                Selection::Empty => Err(precondition(Precondition::NoTargetBranch)),
                Selection::Cancelled => Err(aborted(AbortReason::Cancelled)),
            },
        )
    }
}

fn precondition(failure: Precondition) -> SessionOutcome {
    tracing::info!("precondition failed: {failure}");
    SessionOutcome::Precondition { failure }
}

fn aborted(reason: AbortReason) -> SessionOutcome {
    tracing::info!("sync aborted: {reason:?}");
    SessionOutcome::Aborted { reason }
}

/// The rebase rewrote the private branch; if it tracks an upstream, that
/// upstream now needs a forced push.
fn upstream_hint(vcs: &dyn Vcs, private: &BranchName, remote: &str) -> Option<String> {
    match vcs.has_upstream(private) {
        Ok(true) => Some(format!("git push --force-with-lease {remote} {private}")),
        Ok(false) => None,
        Err(err) => {
            tracing::warn!("could not check upstream of {private}: {err}");
            None
        }
    }
}
