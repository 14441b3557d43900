//! Message-producing collaborator for the squashed commit.
//!
//! A source only ever *suggests*; the operator still confirms or edits the
//! text, and any failure degrades to manual entry.

use std::path::Path;
use std::process::Command;

/// What a [`MessageSource`] came back with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suggestion {
    Message(String),
    /// No suggestion; ask the operator.
    Manual,
}

/// Produces a commit message for the currently staged changes.
pub trait MessageSource {
    fn suggest(&self, workdir: &Path) -> Suggestion;
}

/// Always falls back to manual entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualEntry;

impl MessageSource for ManualEntry {
    fn suggest(&self, _workdir: &Path) -> Suggestion {
        Suggestion::Manual
    }
}

/// Runs an external command in the repository; its trimmed stdout is the
/// suggestion.
#[derive(Debug, Clone)]
pub struct CommandMessageSource {
    argv: Vec<String>,
}

impl CommandMessageSource {
    /// `None` when `argv` is empty.
    pub fn new(argv: Vec<String>) -> Option<Self> {
        (!argv.is_empty()).then_some(Self { argv })
    }
}

impl MessageSource for CommandMessageSource {
    fn suggest(&self, workdir: &Path) -> Suggestion {
        let (program, args) = match self.argv.split_first() {
            Some(split) => split,
            None => return Suggestion::Manual,
        };
        let output = match Command::new(program).args(args).current_dir(workdir).output() {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!("message command `{program}` could not start: {err}");
                return Suggestion::Manual;
            }
        };
        if !output.status.success() {
            tracing::warn!(
                "message command `{program}` exited with {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Suggestion::Manual;
        }
        let text = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        if text.is_empty() {
            tracing::warn!("message command `{program}` printed nothing");
            return Suggestion::Manual;
        }
        Suggestion::Message(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source(argv: &[&str]) -> CommandMessageSource {
        CommandMessageSource::new(argv.iter().map(|s| s.to_string()).collect()).expect("argv")
    }

    #[test]
    fn empty_argv_is_rejected() {
        assert!(CommandMessageSource::new(vec![]).is_none());
    }

    #[test]
    fn manual_entry_never_suggests() {
        let dir = TempDir::new().unwrap();
        assert_eq!(ManualEntry.suggest(dir.path()), Suggestion::Manual);
    }

    #[test]
    #[cfg(unix)]
    fn stdout_becomes_trimmed_suggestion() {
        let dir = TempDir::new().unwrap();
        let got = source(&["sh", "-c", "printf '  feat: add login\\n\\n'"]).suggest(dir.path());
        assert_eq!(got, Suggestion::Message("feat: add login".into()));
    }

    #[test]
    #[cfg(unix)]
    fn non_zero_exit_falls_back_to_manual() {
        let dir = TempDir::new().unwrap();
        let got = source(&["sh", "-c", "echo nope; exit 3"]).suggest(dir.path());
        assert_eq!(got, Suggestion::Manual);
    }

    #[test]
    #[cfg(unix)]
    fn blank_output_falls_back_to_manual() {
        let dir = TempDir::new().unwrap();
        assert_eq!(source(&["true"]).suggest(dir.path()), Suggestion::Manual);
    }

    #[test]
    fn missing_program_falls_back_to_manual() {
        let dir = TempDir::new().unwrap();
        let got = source(&["devflow-no-such-program-xyz"]).suggest(dir.path());
        assert_eq!(got, Suggestion::Manual);
    }
}
