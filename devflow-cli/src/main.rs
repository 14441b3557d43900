//! flow: private-branch sync and release helper for git teams.
//!
//! # Usage
//!
//! ```text
//! flow sync [--private <b>] [--target <b>] [-m <msg>] [--yes] [--json]
//! flow trunk-sync [--strategy merge|rebase]
//! flow release start [--from <b>] [--version <v>] [--yes]
//! flow release finish [--branch <b>]
//! flow config show|init
//! ```
//!
//! Global: `-C <dir>` runs in another repository, `-v` turns on debug logs.

mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use commands::{
    config::ConfigCommand, release::ReleaseCommand, sync::SyncArgs, trunk::TrunkSyncArgs,
};
use devflow_core::TrunkStrategy;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "flow",
    version,
    about = "Sync a private branch into a shared one as a single atomic commit",
    long_about = None,
)]
struct Cli {
    /// Run as if started in <DIR>.
    #[arg(short = 'C', global = true, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Log every git call.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rebase, squash and publish a private branch into a shared branch.
    Sync(SyncArgs),

    /// Bring the trunk into the current branch (merge or rebase).
    TrunkSync(TrunkSyncArgs),

    /// Cut or finish a release branch.
    Release {
        #[command(subcommand)]
        command: ReleaseCommand,
    },

    /// Inspect or create ~/.devflow/config.yaml.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Sync(_) => "sync",
            Commands::TrunkSync(_) => "trunk-sync",
            Commands::Release { .. } => "release",
            Commands::Config { .. } => "config",
        }
    }
}

// ---------------------------------------------------------------------------
// Shared TrunkStrategy argument
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse `TrunkStrategy` from CLI args.
#[derive(Debug, Clone, Copy)]
pub struct TrunkStrategyArg(pub TrunkStrategy);

impl FromStr for TrunkStrategyArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "merge" | "shared" => Ok(Self(TrunkStrategy::Merge)),
            "rebase" | "private" => Ok(Self(TrunkStrategy::Rebase)),
            other => Err(format!(
                "unknown strategy '{other}'; expected: merge, rebase"
            )),
        }
    }
}

impl fmt::Display for TrunkStrategyArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<TrunkStrategyArg> for TrunkStrategy {
    fn from(s: TrunkStrategyArg) -> Self {
        s.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let workdir = cli.dir.unwrap_or_else(|| PathBuf::from("."));
    tracing::debug!("flow {} in {}", cli.command.name(), workdir.display());
    let result: Result<u8> = match cli.command {
        Commands::Sync(args) => args.run(&workdir),
        Commands::TrunkSync(args) => args.run(&workdir),
        Commands::Release { command } => commands::release::run(command, &workdir),
        Commands::Config { command } => commands::config::run(command),
    };

    match result {
        Ok(code) => {
            tracing::debug!("exit code {code}");
            ExitCode::from(code)
        }
        Err(err) => {
            tracing::debug!("command failed: {err:?}");
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

/// Engine crates log through the `log` facade; the subscriber picks those
/// records up as well.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn strategy_accepts_branch_kinds_as_aliases() {
        let arg: TrunkStrategyArg = "Private".parse().unwrap();
        assert_eq!(TrunkStrategy::from(arg), TrunkStrategy::Rebase);
        assert!("squash".parse::<TrunkStrategyArg>().is_err());
    }
}
