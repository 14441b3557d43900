//! `flow release start|finish`

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use devflow_core::{BranchName, FlowConfig, GitCli};
use devflow_sync::release::{self, ReleaseContext};
use devflow_sync::{FinishOptions, ReleaseOutcome, StartOptions};

use super::prompt::TerminalPrompter;
use super::{load_config, print_paths, print_steps};

#[derive(Subcommand, Debug)]
pub enum ReleaseCommand {
    /// Cut release/v<version> from a feature branch and push it.
    Start(StartArgs),
    /// Tag a release branch v<version> and push it with its tags.
    Finish(FinishArgs),
}

#[derive(Args, Debug)]
pub struct StartArgs {
    /// Feature branch to release (asked when omitted).
    #[arg(long, value_name = "BRANCH")]
    pub from: Option<String>,

    /// Version, e.g. 1.4.0 (asked when omitted).
    #[arg(long = "version", value_name = "VERSION")]
    pub version: Option<String>,

    /// Skip the final confirmation.
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct FinishArgs {
    /// Release branch to finish (asked when omitted).
    #[arg(long, value_name = "BRANCH")]
    pub branch: Option<String>,
}

pub fn run(command: ReleaseCommand, workdir: &Path) -> Result<u8> {
    let config = load_config()?;
    let vcs = GitCli::new(workdir);
    let ctx = ReleaseContext {
        vcs: &vcs,
        prompter: &TerminalPrompter,
        config: &config,
    };

    let outcome = match command {
        ReleaseCommand::Start(args) => release::start(
            &ctx,
            StartOptions {
                from: args.from.map(BranchName::from),
                version: args.version,
                yes: args.yes,
            },
        )
        .context("release start failed")?,
        ReleaseCommand::Finish(args) => release::finish(
            &ctx,
            FinishOptions {
                branch: args.branch.map(BranchName::from),
            },
        )
        .context("release finish failed")?,
    };

    print_outcome(&outcome, &config);
    Ok(outcome.exit_code())
}

fn print_outcome(outcome: &ReleaseOutcome, config: &FlowConfig) {
    match outcome {
        ReleaseOutcome::Started {
            branch,
            from,
            version,
        } => {
            println!(
                "{} {branch} created from {from} and pushed",
                "✓".green().bold()
            );
            print_steps(
                "Next:",
                &[
                    "deploy the release branch to staging".to_string(),
                    format!("flow release finish --branch {branch}"),
                    format!("version {version} is read back from the branch name"),
                ],
            );
        }
        ReleaseOutcome::Finished { branch, tag } => {
            let trunk = config
                .trunk
                .as_ref()
                .map(BranchName::as_str)
                .unwrap_or("main");
            println!("{} {branch} tagged {tag} and pushed", "✓".green().bold());
            print_steps(
                "Next:",
                &[
                    format!("open a pull request {branch} -> {trunk}"),
                    format!("after it ships, delete {branch} and its feature branch"),
                ],
            );
        }
        ReleaseOutcome::Aborted => println!("{} aborted: cancelled", "·".dimmed()),
        ReleaseOutcome::Dirty { paths } => {
            eprintln!("{} working tree has uncommitted changes", "✗".red().bold());
            print_paths(paths);
        }
        ReleaseOutcome::NoReleaseBranches => eprintln!(
            "{} no {}/{}* branches found",
            "✗".red().bold(),
            config.remote,
            config.release_prefix
        ),
        ReleaseOutcome::NoBranchSelected => {
            eprintln!("{} no branch selected", "✗".red().bold())
        }
        ReleaseOutcome::InvalidVersion { input } => eprintln!(
            "{} '{input}' is not a version (expected X.Y.Z)",
            "✗".red().bold()
        ),
    }
}
