//! Rebase stage: replay the private branch onto the target's fresh remote tip.

use devflow_core::{Session, Vcs};

use crate::error::{step, SyncError};
use crate::gate;

/// How the replay ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseOutcome {
    /// History is now linear on top of the target's remote tip.
    Clean,
    /// git stopped mid-rebase; `detail` is its output verbatim. The rebase is
    /// left in progress for the operator to resolve.
    Conflicted { detail: String },
}

/// Manual steps printed after a conflicted rebase.
pub const REBASE_REMEDIATION: &[&str] = &[
    "resolve the conflicts in your editor",
    "git add .",
    "git rebase --continue",
    "run `flow sync` again",
];

/// Check out the private branch, fetch the target and rebase onto
/// `<remote>/<target>`.
///
/// A failed fetch is an error (missing branch, network). A rebase that stops
/// on conflicts is [`RebaseOutcome::Conflicted`]; one git refuses outright is
/// an error. Nothing is retried.
pub fn rebase(vcs: &dyn Vcs, session: &Session, remote: &str) -> Result<RebaseOutcome, SyncError> {
    let current = vcs
        .current_branch()
        .map_err(step("read current branch"))?;
    if current.as_ref() != Some(&session.private) {
        tracing::info!("switching to {}", session.private);
        vcs.checkout(session.private.as_str())
            .map_err(step(format!("switch to {}", session.private)))?;
    }

    let upstream = session.target.remote_ref(remote);
    vcs.fetch(remote, Some(&session.target)).map_err(step(format!(
        "fetch {upstream} (does the branch exist on {remote}?)"
    )))?;

    tracing::info!("rebasing {} onto {upstream}", session.private);
    match vcs.rebase(&upstream) {
        Ok(_) => Ok(RebaseOutcome::Clean),
        Err(err @ devflow_core::VcsError::Spawn { .. }) => Err(step("rebase")(err)),
        Err(err) => {
            let detail = err.detail();
            if !gate::stopped_on_conflict(vcs, &detail) {
                return Err(step(format!("rebase {} onto {upstream}", session.private))(err));
            }
            tracing::warn!("rebase of {} stopped: {err}", session.private);
            Ok(RebaseOutcome::Conflicted { detail })
        }
    }
}
