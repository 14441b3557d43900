//! `flow trunk-sync`: bring the trunk's latest commits into the current
//! branch. Shared branches merge, private branches rebase. Never compacts.

use serde::Serialize;

use devflow_core::{BranchName, Choice, FlowConfig, MergeMode, Prompter, TrunkStrategy, Vcs};

use crate::error::{step, SyncError};
use crate::gate::{self, CleanCheck};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TrunkOutcome {
    Merged { branch: BranchName, trunk: BranchName },
    Rebased { branch: BranchName, trunk: BranchName },
    /// git stopped; the merge or rebase is left in progress.
    Conflicted {
        strategy: TrunkStrategy,
        detail: String,
    },
    /// git refused the merge or rebase without leaving conflicts behind.
    Failed {
        strategy: TrunkStrategy,
        detail: String,
    },
    Aborted,
    Dirty { paths: Vec<String> },
    Detached,
}

impl TrunkOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            TrunkOutcome::Failed { .. } | TrunkOutcome::Dirty { .. } | TrunkOutcome::Detached => 1,
            _ => 0,
        }
    }

    /// Follow-up commands for the operator.
    pub fn hints(&self, remote: &str) -> Vec<String> {
        match self {
            TrunkOutcome::Merged { branch, .. } => {
                vec![format!("git push {remote} {branch}")]
            }
            TrunkOutcome::Rebased { branch, .. } => {
                vec![format!("git push {remote} {branch} --force-with-lease")]
            }
            TrunkOutcome::Conflicted {
                strategy: TrunkStrategy::Merge,
                ..
            } => vec![
                "resolve the conflicts in your editor".into(),
                "git add .".into(),
                "git commit".into(),
            ],
            TrunkOutcome::Conflicted {
                strategy: TrunkStrategy::Rebase,
                ..
            } => vec![
                "resolve the conflicts in your editor".into(),
                "git add .".into(),
                "git rebase --continue".into(),
            ],
            _ => Vec::new(),
        }
    }
}

/// Trunk to sync from: `config.trunk`, else `main` when the remote has it,
/// else `master`.
pub fn detect_trunk(vcs: &dyn Vcs, config: &FlowConfig) -> BranchName {
    if let Some(trunk) = &config.trunk {
        return trunk.clone();
    }
    let main = format!("{}/main", config.remote);
    match vcs.remote_branches() {
        Ok(branches) if branches.iter().any(|b| *b == main) => BranchName::from("main"),
        Ok(_) => BranchName::from("master"),
        Err(err) => {
            tracing::warn!("could not list remote branches, assuming master: {err}");
            BranchName::from("master")
        }
    }
}

pub fn run(
    vcs: &dyn Vcs,
    prompter: &dyn Prompter,
    config: &FlowConfig,
    strategy: Option<TrunkStrategy>,
) -> Result<TrunkOutcome, SyncError> {
    if let CleanCheck::Dirty { paths } = gate::check_clean(vcs)? {
        return Ok(TrunkOutcome::Dirty { paths });
    }
    let branch = match vcs.current_branch().map_err(step("read current branch"))? {
        Some(branch) => branch,
        None => return Ok(TrunkOutcome::Detached),
    };

    let strategy = match strategy {
        Some(strategy) => strategy,
        None => match ask_strategy(prompter, &branch)? {
            Some(strategy) => strategy,
            None => return Ok(TrunkOutcome::Aborted),
        },
    };

    let trunk = detect_trunk(vcs, config);
    let remote = config.remote.as_str();
    let upstream = trunk.remote_ref(remote);
    vcs.fetch(remote, Some(&trunk))
        .map_err(step(format!("fetch {upstream}")))?;

    tracing::info!("{strategy} {upstream} into {branch}");
    let result = match strategy {
        TrunkStrategy::Merge => vcs.merge(&upstream, MergeMode::Default),
        TrunkStrategy::Rebase => vcs.rebase(&upstream),
    };
    match result {
        Ok(_) => Ok(match strategy {
            TrunkStrategy::Merge => TrunkOutcome::Merged { branch, trunk },
            TrunkStrategy::Rebase => TrunkOutcome::Rebased { branch, trunk },
        }),
        Err(err @ devflow_core::VcsError::Spawn { .. }) => Err(step(strategy.to_string())(err)),
        Err(err) => {
            let detail = err.detail();
            if gate::stopped_on_conflict(vcs, &detail) {
                tracing::warn!("{strategy} of {upstream} stopped on conflicts: {err}");
                Ok(TrunkOutcome::Conflicted { strategy, detail })
            } else {
                tracing::warn!("{strategy} of {upstream} failed: {err}");
                Ok(TrunkOutcome::Failed { strategy, detail })
            }
        }
    }
}

fn ask_strategy(
    prompter: &dyn Prompter,
    branch: &BranchName,
) -> Result<Option<TrunkStrategy>, SyncError> {
    let choices = [
        Choice::new("Shared branch (merge, keeps history)", "merge"),
        Choice::new("Private branch (rebase, linear history)", "rebase"),
    ];
    let question = format!("What kind of branch is {branch}?");
    Ok(prompter
        .select(&question, &choices, Some("merge"))?
        .map(|value| match value.as_str() {
            "rebase" => TrunkStrategy::Rebase,
            _ => TrunkStrategy::Merge,
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TrunkOutcome::Merged { branch: "feat/1".into(), trunk: "main".into() }, "git push origin feat/1")]
    #[case(TrunkOutcome::Rebased { branch: "dev".into(), trunk: "main".into() }, "git push origin dev --force-with-lease")]
    fn success_hint_names_push(#[case] outcome: TrunkOutcome, #[case] hint: &str) {
        assert_eq!(outcome.hints("origin"), vec![hint.to_string()]);
        assert_eq!(outcome.exit_code(), 0);
    }

    #[test]
    fn conflict_hint_depends_on_strategy() {
        let merge = TrunkOutcome::Conflicted {
            strategy: TrunkStrategy::Merge,
            detail: String::new(),
        };
        assert_eq!(merge.hints("origin").last().unwrap(), "git commit");
        let rebase = TrunkOutcome::Conflicted {
            strategy: TrunkStrategy::Rebase,
            detail: String::new(),
        };
        assert_eq!(rebase.hints("origin").last().unwrap(), "git rebase --continue");
    }

    #[test]
    fn dirty_tree_and_refused_merge_fail() {
        assert_eq!(TrunkOutcome::Dirty { paths: vec![] }.exit_code(), 1);
        let refused = TrunkOutcome::Failed {
            strategy: TrunkStrategy::Merge,
            detail: "refusing to merge unrelated histories".into(),
        };
        assert_eq!(refused.exit_code(), 1);
        assert!(refused.hints("origin").is_empty());
    }
}
