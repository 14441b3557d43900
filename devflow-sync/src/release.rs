//! Release flows.
//!
//! - `start`: cut `<release_prefix>v<version>` from a shared feature branch
//!   and push it.
//! - `finish`: tag a release branch `v<version>` (annotated) and push the
//!   branch with its tags.
//!
//! The version is always supplied by the operator or read from a branch
//! name; nothing here computes the next version.

use serde::Serialize;

use devflow_core::{BranchName, Choice, FlowConfig, Prompter, Vcs};

use crate::error::{step, SyncError};
use crate::gate::{self, CleanCheck};
use crate::select::{self, Selection};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ReleaseOutcome {
    Started {
        branch: BranchName,
        from: BranchName,
        version: String,
    },
    Finished {
        branch: BranchName,
        tag: String,
    },
    Aborted,
    Dirty { paths: Vec<String> },
    NoReleaseBranches,
    NoBranchSelected,
    InvalidVersion { input: String },
}

impl ReleaseOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            ReleaseOutcome::Started { .. }
            | ReleaseOutcome::Finished { .. }
            | ReleaseOutcome::Aborted => 0,
            _ => 1,
        }
    }
}

/// Collaborators shared by both flows.
pub struct ReleaseContext<'a> {
    pub vcs: &'a dyn Vcs,
    pub prompter: &'a dyn Prompter,
    pub config: &'a FlowConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartOptions {
    pub from: Option<BranchName>,
    pub version: Option<String>,
    /// Skip the final confirmation.
    pub yes: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinishOptions {
    pub branch: Option<BranchName>,
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

/// Accepts `X.Y.Z` with an optional `v` prefix and an optional `-pre` or
/// `+build` suffix. Returns the version without the `v`.
pub fn parse_version(input: &str) -> Option<String> {
    let version = input.trim();
    let version = version.strip_prefix('v').unwrap_or(version);
    let core_end = version.find(['-', '+']).unwrap_or(version.len());
    let (core, suffix) = version.split_at(core_end);
    if suffix.len() == 1 {
        return None;
    }
    let parts: Vec<&str> = core.split('.').collect();
    let numeric = parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    numeric.then(|| version.to_owned())
}

/// `release/v1.2.3` → `1.2.3`.
pub fn version_from_branch(branch: &BranchName, prefix: &str) -> Option<String> {
    branch.as_str().strip_prefix(prefix).and_then(parse_version)
}

pub fn release_branch(prefix: &str, version: &str) -> BranchName {
    BranchName::from(format!("{prefix}v{version}"))
}

// ---------------------------------------------------------------------------
// Start
// ---------------------------------------------------------------------------

pub fn start(ctx: &ReleaseContext<'_>, options: StartOptions) -> Result<ReleaseOutcome, SyncError> {
    let vcs = ctx.vcs;
    let config = ctx.config;
    let remote = config.remote.as_str();

    if let CleanCheck::Dirty { paths } = gate::check_clean(vcs)? {
        return Ok(ReleaseOutcome::Dirty { paths });
    }

    let from = match options.from {
        Some(branch) => branch,
        None => {
            let entries = select::remote_candidates(
                vcs,
                remote,
                &config.feature_prefix,
                config.branch_list_limit,
            )?;
            match select::choose_branch(ctx.prompter, "Release which feature branch?", &entries, None)? {
                Selection::Chosen(branch) => branch,
                Selection::Empty => return Ok(ReleaseOutcome::NoBranchSelected),
                Selection::Cancelled => return Ok(ReleaseOutcome::Aborted),
            }
        }
    };

    check_out_tracking(vcs, &from, remote)?;

    let input = match options.version {
        Some(version) => version,
        None => match ctx.prompter.text("Release version (e.g. 1.4.0)", None)? {
            Some(version) => version,
            None => return Ok(ReleaseOutcome::Aborted),
        },
    };
    let version = match parse_version(&input) {
        Some(version) => version,
        None => return Ok(ReleaseOutcome::InvalidVersion { input }),
    };
    let branch = release_branch(&config.release_prefix, &version);

    if !clear_prefix_clash(ctx, &config.release_prefix)? {
        return Ok(ReleaseOutcome::Aborted);
    }

    if !options.yes {
        let question = format!("Create {branch} from {from} and push it to {remote}?");
        if ctx.prompter.confirm(&question, true)? != Some(true) {
            return Ok(ReleaseOutcome::Aborted);
        }
    }

    vcs.checkout_new(&branch, "HEAD")
        .map_err(step(format!("create {branch}")))?;
    vcs.push(remote, &branch, false)
        .map_err(step(format!("push {branch}")))?;
    tracing::info!("release branch {branch} created from {from}");
    Ok(ReleaseOutcome::Started {
        branch,
        from,
        version,
    })
}

/// Check out `branch`, creating it from the remote-tracking ref when there is
/// no local copy yet.
fn check_out_tracking(vcs: &dyn Vcs, branch: &BranchName, remote: &str) -> Result<(), SyncError> {
    let exists = vcs
        .local_branch_exists(branch)
        .map_err(step(format!("look up branch {branch}")))?;
    if exists {
        vcs.checkout(branch.as_str())
            .map_err(step(format!("switch to {branch}")))?;
        vcs.pull(remote, branch)
            .map_err(step(format!("pull {branch}")))?;
    } else {
        vcs.checkout_new(branch, &branch.remote_ref(remote))
            .map_err(step(format!("check out {}", branch.remote_ref(remote))))?;
    }
    Ok(())
}

/// A local branch named exactly like the prefix (`release`) makes git refuse
/// to create `release/...`. Returns `false` when the operator cancels.
fn clear_prefix_clash(ctx: &ReleaseContext<'_>, prefix: &str) -> Result<bool, SyncError> {
    let clash = prefix.trim_end_matches('/');
    if clash.is_empty() || clash == prefix {
        return Ok(true);
    }
    let clash = BranchName::from(clash);
    let exists = ctx
        .vcs
        .local_branch_exists(&clash)
        .map_err(step(format!("look up branch {clash}")))?;
    if !exists {
        return Ok(true);
    }

    let backup = BranchName::from(format!("{clash}-backup"));
    let choices = [
        Choice::new(format!("Rename it to {backup}"), "rename"),
        Choice::new("Delete it", "delete"),
        Choice::new("Cancel", "cancel"),
    ];
    let question = format!("A local branch named {clash} blocks creating {prefix}*. What now?");
    match ctx.prompter.select(&question, &choices, Some("rename"))?.as_deref() {
        Some("rename") => {
            ctx.vcs
                .rename_branch(&clash, &backup)
                .map_err(step(format!("rename {clash}")))?;
            tracing::info!("renamed {clash} to {backup}");
            Ok(true)
        }
        Some("delete") => {
            ctx.vcs
                .delete_branch(&clash)
                .map_err(step(format!("delete {clash}")))?;
            tracing::info!("deleted {clash}");
            Ok(true)
        }
        _ => Ok(false),
    }
}

// ---------------------------------------------------------------------------
// Finish
// ---------------------------------------------------------------------------

pub fn finish(ctx: &ReleaseContext<'_>, options: FinishOptions) -> Result<ReleaseOutcome, SyncError> {
    let vcs = ctx.vcs;
    let config = ctx.config;
    let remote = config.remote.as_str();

    if let CleanCheck::Dirty { paths } = gate::check_clean(vcs)? {
        return Ok(ReleaseOutcome::Dirty { paths });
    }

    let branch = match options.branch {
        Some(branch) => branch,
        None => {
            if let Err(err) = vcs.fetch_all() {
                tracing::warn!("fetch --all failed, release list may be stale: {err}");
            }
            let branches = remote_release_branches(vcs, remote, &config.release_prefix)?;
            if branches.is_empty() {
                return Ok(ReleaseOutcome::NoReleaseBranches);
            }
            let choices: Vec<Choice> = branches
                .iter()
                .map(|b| Choice::new(b.as_str(), b.as_str()))
                .collect();
            let default = branches.first().map(BranchName::as_str);
            match ctx
                .prompter
                .select("Finish which release branch?", &choices, default)?
            {
                Some(value) => BranchName::from(value),
                None => return Ok(ReleaseOutcome::Aborted),
            }
        }
    };

    let version = match version_from_branch(&branch, &config.release_prefix) {
        Some(version) => version,
        None => {
            return Ok(ReleaseOutcome::InvalidVersion {
                input: branch.to_string(),
            })
        }
    };

    check_out_tracking(vcs, &branch, remote)?;

    let tag = format!("v{version}");
    vcs.tag_annotated(&tag, &format!("release {tag}"))
        .map_err(step(format!("tag {tag}")))?;
    vcs.push(remote, &branch, true)
        .map_err(step(format!("push {branch} with tags")))?;
    tracing::info!("tagged {branch} as {tag}");
    Ok(ReleaseOutcome::Finished { branch, tag })
}

/// `branch -r` entries under `<remote>/<prefix>`, remote name stripped.
fn remote_release_branches(
    vcs: &dyn Vcs,
    remote: &str,
    prefix: &str,
) -> Result<Vec<BranchName>, SyncError> {
    let namespace = format!("{remote}/{prefix}");
    let strip = format!("{remote}/");
    Ok(vcs
        .remote_branches()
        .map_err(step("list remote branches"))?
        .into_iter()
        .filter(|b| b.starts_with(&namespace))
        .filter_map(|b| b.strip_prefix(&strip).map(BranchName::from))
        .collect())
}
