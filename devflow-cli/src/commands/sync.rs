//! `flow sync`: rebase, squash and publish a private branch.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use devflow_core::{BranchName, GitCli};
use devflow_sync::{
    pipeline, AbortReason, CommandMessageSource, ManualEntry, MessageSource, RollbackReason,
    SessionOutcome, SyncContext, SyncOptions, SyncReport, REBASE_REMEDIATION,
};

use super::prompt::TerminalPrompter;
use super::{load_config, print_paths, print_steps};

/// Arguments for `flow sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Private branch to publish (asked when omitted).
    #[arg(long, short = 'p', value_name = "BRANCH")]
    pub private: Option<String>,

    /// Shared branch that receives the change (asked when omitted).
    #[arg(long, short = 't', value_name = "BRANCH")]
    pub target: Option<String>,

    /// Message for the squashed commit; skips the message prompt.
    #[arg(long, short = 'm')]
    pub message: Option<String>,

    /// Confirm up front that the private branch is yours alone.
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Print the session report as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self, workdir: &Path) -> Result<u8> {
        let config = load_config()?;
        let vcs = GitCli::new(workdir);
        let prompter = TerminalPrompter;
        let messages: Box<dyn MessageSource> = match config
            .message_command
            .clone()
            .and_then(CommandMessageSource::new)
        {
            Some(source) => Box::new(source),
            None => Box::new(ManualEntry),
        };

        let ctx = SyncContext {
            vcs: &vcs,
            prompter: &prompter,
            messages: messages.as_ref(),
            config: &config,
        };
        let options = SyncOptions {
            private: self.private.map(BranchName::from),
            target: self.target.map(BranchName::from),
            message: self.message,
            assume_private: self.yes,
        };
        let report = pipeline::run(&ctx, options).context("sync failed")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to render sync report JSON")?
            );
        } else {
            print_report(&report, &config.remote);
        }
        Ok(report.exit_code())
    }
}

fn print_report(report: &SyncReport, remote: &str) {
    let target = report
        .session
        .as_ref()
        .map(|s| s.target.to_string())
        .unwrap_or_default();

    match &report.outcome {
        SessionOutcome::Published {
            commit,
            squashed,
            upstream_hint,
        } => {
            let what = if *squashed > 1 {
                format!("{squashed} commits squashed into {}", commit.short())
            } else {
                format!("commit {}", commit.short())
            };
            println!("{} {what} published to {target}", "✓".green().bold());
            if let Some(hint) = upstream_hint {
                print_steps("Your private branch was rebased; update its upstream:", &[hint]);
            }
        }
        SessionOutcome::NothingToPublish => {
            println!("{} nothing to publish; already in sync with {target}", "✓".green());
        }
        SessionOutcome::ContentIdentical { squashed } => {
            println!(
                "{} the {squashed} commits cancel out; {target} already has this content",
                "✓".green()
            );
        }
        SessionOutcome::Aborted { reason } => {
            let why = match reason {
                AbortReason::NotPrivate => "branch is not private; squashing it would rewrite shared history",
                AbortReason::Cancelled => "cancelled",
            };
            println!("{} aborted: {why}", "·".dimmed());
        }
        SessionOutcome::Precondition { failure } => {
            eprintln!("{} {failure}", "✗".red().bold());
            if let devflow_sync::Precondition::DirtyTree { paths } = failure {
                print_paths(paths);
                print_steps("Commit or stash them first:", &["git stash", "flow sync"]);
            }
        }
        SessionOutcome::Conflicted { detail } => {
            eprintln!("{} rebase stopped on conflicts", "!".yellow().bold());
            eprintln!("{}", detail.dimmed());
            print_steps("To continue:", REBASE_REMEDIATION);
        }
        SessionOutcome::RolledBack {
            anchor,
            reason: RollbackReason::Cancelled,
        } => {
            println!(
                "{} aborted: commit message cancelled; branch restored to {}",
                "·".dimmed(),
                anchor.short()
            );
        }
        SessionOutcome::RolledBack { anchor, reason } => {
            eprintln!(
                "{} squash abandoned ({reason}); branch restored to {}",
                "✗".red().bold(),
                anchor.short()
            );
        }
        SessionOutcome::PartialFailure { head, detail } => {
            eprintln!(
                "{} merged locally at {} but the push of {target} failed",
                "!".yellow().bold(),
                head.short()
            );
            eprintln!("{}", detail.dimmed());
            print_steps("Retry the push:", &[format!("git push {remote} {target}")]);
        }
        SessionOutcome::Race { detail } => {
            eprintln!("{} {detail}", "✗".red().bold());
        }
        SessionOutcome::PublishFailed { step, detail } => {
            eprintln!("{} publish failed at {step}", "✗".red().bold());
            eprintln!("{}", detail.dimmed());
        }
    }

    if let Some(warning) = &report.restore_warning {
        eprintln!("{} {warning}", "!".yellow().bold());
    }
}
