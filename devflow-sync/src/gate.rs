//! Safety gate: clean-tree precondition and the private-branch confirmation.
//!
//! Both checks run before anything is read for planning and before any
//! mutating git call.

use devflow_core::{BranchName, Prompter, Vcs};

use crate::error::{step, SyncError};

/// Result of `status --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanCheck {
    Clean,
    /// Porcelain lines of every offending path.
    Dirty { paths: Vec<String> },
}

/// Answer to "is this branch yours alone?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Confirmed,
    Declined,
    Cancelled,
}

pub fn check_clean(vcs: &dyn Vcs) -> Result<CleanCheck, SyncError> {
    let paths = vcs
        .status_porcelain()
        .map_err(step("read working tree status"))?;
    if paths.is_empty() {
        Ok(CleanCheck::Clean)
    } else {
        tracing::info!("working tree dirty: {} path(s)", paths.len());
        Ok(CleanCheck::Dirty { paths })
    }
}

/// Porcelain codes of paths git could not merge.
const UNMERGED: &[&str] = &["DD", "AU", "UD", "UA", "DU", "AA", "UU"];

/// Whether a failed merge or rebase stopped on conflicts the operator has to
/// resolve, as opposed to being refused outright.
pub fn stopped_on_conflict(vcs: &dyn Vcs, detail: &str) -> bool {
    if detail.contains("CONFLICT") {
        return true;
    }
    match vcs.status_porcelain() {
        Ok(lines) => lines.iter().any(|line| is_unmerged(line)),
        Err(err) => {
            tracing::warn!("could not read status after a failed merge: {err}");
            false
        }
    }
}

fn is_unmerged(line: &str) -> bool {
    line.get(..2).is_some_and(|code| UNMERGED.contains(&code))
}

/// Ask the operator to confirm exclusive ownership of `branch`. The default
/// answer is "yes". `preconfirmed` skips the question (`--yes`).
pub fn confirm_ownership(
    prompter: &dyn Prompter,
    branch: &BranchName,
    preconfirmed: bool,
) -> Result<Ownership, SyncError> {
    if preconfirmed {
        return Ok(Ownership::Confirmed);
    }
    let question = format!(
        "Is {branch} a private branch that only you work on?\n  \
         (squashing a shared branch rewrites commits other people already have)"
    );
    Ok(match prompter.confirm(&question, true)? {
        Some(true) => Ownership::Confirmed,
        Some(false) => Ownership::Declined,
        None => Ownership::Cancelled,
    })
}
