//! `flow trunk-sync [--strategy merge|rebase]`

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use devflow_core::GitCli;
use devflow_sync::{trunk, TrunkOutcome};

use super::prompt::TerminalPrompter;
use super::{load_config, print_paths, print_steps};
use crate::TrunkStrategyArg;

/// Arguments for `flow trunk-sync`.
#[derive(Args, Debug)]
pub struct TrunkSyncArgs {
    /// merge (shared branch) or rebase (private branch); asked when omitted.
    #[arg(long, short = 's', value_name = "STRATEGY")]
    pub strategy: Option<TrunkStrategyArg>,
}

impl TrunkSyncArgs {
    pub fn run(self, workdir: &Path) -> Result<u8> {
        let config = load_config()?;
        let vcs = GitCli::new(workdir);
        let outcome = trunk::run(
            &vcs,
            &TerminalPrompter,
            &config,
            self.strategy.map(Into::into),
        )
        .context("trunk sync failed")?;

        let hints = outcome.hints(&config.remote);
        match &outcome {
            TrunkOutcome::Merged { branch, trunk } => {
                println!("{} merged {trunk} into {branch}", "✓".green().bold());
                print_steps("Next:", &hints);
            }
            TrunkOutcome::Rebased { branch, trunk } => {
                println!("{} rebased {branch} onto {trunk}", "✓".green().bold());
                print_steps("History was rewritten; push with:", &hints);
            }
            TrunkOutcome::Conflicted { strategy, detail } => {
                eprintln!("{} {strategy} stopped on conflicts", "!".yellow().bold());
                eprintln!("{}", detail.dimmed());
                print_steps("To continue:", &hints);
            }
            TrunkOutcome::Failed { strategy, detail } => {
                eprintln!("{} {strategy} failed", "✗".red().bold());
                eprintln!("{}", detail.dimmed());
            }
            TrunkOutcome::Aborted => println!("{} aborted: cancelled", "·".dimmed()),
            TrunkOutcome::Dirty { paths } => {
                eprintln!("{} working tree has uncommitted changes", "✗".red().bold());
                print_paths(paths);
            }
            TrunkOutcome::Detached => {
                eprintln!("{} HEAD is detached; check out a branch first", "✗".red().bold());
            }
        }
        Ok(outcome.exit_code())
    }
}
