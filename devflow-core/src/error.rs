//! Error types for devflow-core.

use std::path::PathBuf;

use thiserror::Error;

/// Failures of a single `git` invocation.
#[derive(Debug, Error)]
pub enum VcsError {
    /// The `git` process could not be started at all.
    #[error("failed to run `git {command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// `git` ran and exited non-zero. `stderr`/`stdout` are kept verbatim so
    /// the operator sees exactly what git said.
    #[error("`git {command}` failed ({}): {}", exit_label(.code), first_line(.stderr, .stdout))]
    Failed {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// `git` succeeded but printed something we could not interpret.
    #[error("unexpected output from `git {command}`: {output:?}")]
    Parse { command: String, output: String },
}

impl VcsError {
    /// Everything git printed for a failed call, stderr first.
    pub fn detail(&self) -> String {
        match self {
            VcsError::Failed { stdout, stderr, .. } => {
                let mut out = String::new();
                for part in [stderr.trim(), stdout.trim()] {
                    if part.is_empty() {
                        continue;
                    }
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(part);
                }
                out
            }
            other => other.to_string(),
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit {code}"),
        None => "killed by signal".to_string(),
    }
}

fn first_line<'a>(stderr: &'a str, stdout: &'a str) -> &'a str {
    stderr
        .lines()
        .chain(stdout.lines())
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("no output")
}

/// Errors from loading or saving `~/.devflow/config.yaml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading, writing or chmod-ing a file under `~/.devflow/` failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Malformed YAML on load; includes file path and serde_yaml's location.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Errors from a prompt provider (not cancellation, which is a normal answer).
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A scripted provider was asked something it has no answer for.
    #[error("scripted prompt mismatch at '{message}': {reason}")]
    Script { message: String, reason: String },
}
