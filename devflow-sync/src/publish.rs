//! Publish stage: fast-forward the target onto the private branch and push.

use serde::Serialize;

use devflow_core::{BranchName, CommitId, MergeMode, Session, Vcs};

use crate::error::{step, SyncError};

/// The publish call that failed before anything was merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStep {
    Checkout,
    Pull,
    Merge,
}

impl std::fmt::Display for PublishStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PublishStep::Checkout => "checkout",
            PublishStep::Pull => "pull",
            PublishStep::Merge => "merge",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PublishOutcome {
    /// Target advanced to `head` locally and on the remote.
    Published { head: CommitId },
    /// Local target carries `head`; only the push has to be retried.
    PartialFailure { head: CommitId, detail: String },
    /// The target moved in a way the private branch does not contain.
    Race { detail: String },
    /// Nothing was merged.
    Failed { step: PublishStep, detail: String },
}

/// Checkout target, pull, fast-forward merge the private branch, push.
///
/// Leaves the target checked out; the orchestrator restores the operator's
/// branch afterwards.
pub fn publish(vcs: &dyn Vcs, session: &Session, remote: &str) -> Result<PublishOutcome, SyncError> {
    let target = &session.target;
    let private = &session.private;

    tracing::info!("publishing {private} into {target}");
    if let Err(err) = vcs.checkout(target.as_str()) {
        return Ok(failed(PublishStep::Checkout, err));
    }
    if let Err(err) = vcs.pull(remote, target) {
        return Ok(failed(PublishStep::Pull, err));
    }

    // The pull refreshed the tracking ref. Only commits that arrived there
    // count as a race; extra commits on the local target are caught by the
    // fast-forward check below.
    let tracking = target.remote_ref(remote);
    let contained = vcs
        .is_ancestor(&tracking, private.as_str())
        .map_err(step(format!("compare {tracking} with {private}")))?;
    if !contained {
        tracing::warn!("{tracking} moved after the rebase of {private}");
        return Ok(PublishOutcome::Race {
            detail: format!(
                "{tracking} gained commits that {private} does not contain; start a fresh `flow sync`"
            ),
        });
    }

    if let Err(err) = vcs.merge(private.as_str(), MergeMode::FastForwardOnly) {
        tracing::warn!("publish merge failed: {err}");
        let mut detail = err.detail();
        if let Ok(false) = vcs.is_ancestor(target.as_str(), private.as_str()) {
            detail = format!(
                "local {target} has commits that are not on {tracking}; push or drop them first\n{detail}"
            );
        }
        return Ok(PublishOutcome::Failed {
            step: PublishStep::Merge,
            detail,
        });
    }
    let head = vcs
        .rev_parse("HEAD")
        .map_err(step(format!("read {target} after merge")))?;

    match vcs.push(remote, target, false) {
        Ok(_) => {
            tracing::info!("pushed {target} at {}", head.short());
            Ok(PublishOutcome::Published { head })
        }
        Err(err) => {
            tracing::warn!("push of {target} failed: {err}");
            Ok(PublishOutcome::PartialFailure {
                head,
                detail: err.detail(),
            })
        }
    }
}

/// Check `branch` out again. Failure is returned to the caller as a message
/// so it can be reported next to, never instead of, the stage outcome.
pub fn restore_branch(vcs: &dyn Vcs, branch: &BranchName) -> Result<(), String> {
    match vcs.current_branch() {
        Ok(Some(current)) if &current == branch => return Ok(()),
        _ => {}
    }
    vcs.checkout(branch.as_str()).map_err(|err| {
        tracing::warn!("could not switch back to {branch}: {err}");
        format!("could not switch back to {branch}: {}", err.detail())
    })
}

fn failed(step: PublishStep, err: devflow_core::VcsError) -> PublishOutcome {
    tracing::warn!("publish {step} failed: {err}");
    PublishOutcome::Failed {
        step,
        detail: err.detail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_names_match_git_verbs() {
        assert_eq!(PublishStep::Checkout.to_string(), "checkout");
        assert_eq!(PublishStep::Merge.to_string(), "merge");
    }

    #[test]
    fn partial_failure_serializes_head_and_detail() {
        let out = PublishOutcome::PartialFailure {
            head: CommitId::from("deadbeef"),
            detail: "remote rejected".into(),
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["kind"], "partial_failure");
        assert_eq!(json["head"], "deadbeef");
    }
}
