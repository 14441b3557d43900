//! Branch discovery and selection shared by every flow.
//!
//! Candidates come from `for-each-ref`, newest commit first, followed by a
//! manual-entry option.

use devflow_core::{BranchEntry, BranchName, Choice, Prompter, Vcs};

use crate::error::{step, SyncError};

/// Value of the manual-entry choice. Contains a space, so it can never
/// collide with a branch name.
pub const MANUAL_ENTRY: &str = "manual entry";

/// Result of asking the operator for a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Chosen(BranchName),
    /// Manual entry left blank.
    Empty,
    Cancelled,
}

/// Offer `entries` plus manual entry; `default` is pre-selected when listed.
pub fn choose_branch(
    prompter: &dyn Prompter,
    question: &str,
    entries: &[BranchEntry],
    default: Option<&BranchName>,
) -> Result<Selection, SyncError> {
    let mut choices: Vec<Choice> = entries
        .iter()
        .map(|entry| Choice::new(entry.label(), entry.name.as_str()))
        .collect();
    choices.push(Choice::new("Enter a branch name", MANUAL_ENTRY));

    let default = default
        .filter(|d| entries.iter().any(|e| &e.name == *d))
        .map(BranchName::as_str)
        .or_else(|| entries.first().map(|e| e.name.as_str()))
        .unwrap_or(MANUAL_ENTRY);

    let picked = match prompter.select(question, &choices, Some(default))? {
        Some(value) => value,
        None => return Ok(Selection::Cancelled),
    };
    if picked != MANUAL_ENTRY {
        return Ok(Selection::Chosen(BranchName::from(picked)));
    }

    Ok(match prompter.text("Branch name", None)? {
        None => Selection::Cancelled,
        Some(name) if name.trim().is_empty() => Selection::Empty,
        Some(name) => Selection::Chosen(BranchName::from(name.trim())),
    })
}

/// Most recently committed local branches.
pub fn local_candidates(vcs: &dyn Vcs, limit: usize) -> Result<Vec<BranchEntry>, SyncError> {
    vcs.recent_local_branches(limit)
        .map_err(step("list local branches"))
}

/// Refresh `remote` and list its branches under `prefix`. A failed fetch only
/// degrades the list to whatever was fetched before.
pub fn remote_candidates(
    vcs: &dyn Vcs,
    remote: &str,
    prefix: &str,
    limit: usize,
) -> Result<Vec<BranchEntry>, SyncError> {
    if let Err(err) = vcs.fetch(remote, None) {
        tracing::warn!("fetch {remote} failed, branch list may be stale: {err}");
    }
    vcs.recent_remote_branches(remote, prefix, limit)
        .map_err(step(format!("list {remote}/{prefix}* branches")))
}
