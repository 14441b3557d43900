//! VCS adapter: the narrow set of git operations the sync engine needs.
//!
//! Every operation maps to one `git` subprocess. The exit status is the only
//! success signal; output is captured and returned (or carried inside
//! [`VcsError::Failed`]) so callers can surface it verbatim.
//!
//! Stages take `&dyn Vcs`, which lets tests wrap [`GitCli`] to record calls
//! or inject failures without touching the engine.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::VcsError;
use crate::types::{BranchEntry, BranchName, CommitId};

/// Captured output of a successful git call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    /// stdout and stderr joined, trimmed; what an operator would have seen.
    pub fn combined(&self) -> String {
        [self.stdout.trim(), self.stderr.trim()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// How `merge` is allowed to integrate the other branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// `--ff-only`: refuse anything but a pointer advance.
    FastForwardOnly,
    /// Plain `merge`; may create a merge commit.
    Default,
}

/// Atomic git operations used by every stage.
pub trait Vcs {
    /// Repository working directory.
    fn workdir(&self) -> &Path;

    /// Lines of `status --porcelain`; empty means a clean tree.
    fn status_porcelain(&self) -> Result<Vec<String>, VcsError>;

    /// `branch --show-current`; `None` on a detached HEAD.
    fn current_branch(&self) -> Result<Option<BranchName>, VcsError>;

    /// `fetch <remote> [<branch>]`.
    fn fetch(&self, remote: &str, branch: Option<&BranchName>) -> Result<(), VcsError>;

    /// `fetch --all`.
    fn fetch_all(&self) -> Result<(), VcsError>;

    /// `checkout <reference>`.
    fn checkout(&self, reference: &str) -> Result<(), VcsError>;

    /// `checkout -b <branch> <start>`.
    fn checkout_new(&self, branch: &BranchName, start: &str) -> Result<(), VcsError>;

    /// `rebase <upstream>`. On conflict git leaves the rebase in progress.
    fn rebase(&self, upstream: &str) -> Result<GitOutput, VcsError>;

    /// `merge [--ff-only] <reference>`.
    fn merge(&self, reference: &str, mode: MergeMode) -> Result<GitOutput, VcsError>;

    /// `pull <remote> <branch>`.
    fn pull(&self, remote: &str, branch: &BranchName) -> Result<GitOutput, VcsError>;

    /// `push [--follow-tags] <remote> <branch>`.
    fn push(&self, remote: &str, branch: &BranchName, follow_tags: bool)
        -> Result<GitOutput, VcsError>;

    /// `reset --soft <reference>`: move the branch, keep index and tree.
    fn reset_soft(&self, reference: &str) -> Result<(), VcsError>;

    /// `reset --hard <reference>`: move the branch, index and tree.
    fn reset_hard(&self, reference: &str) -> Result<(), VcsError>;

    /// `diff --cached --name-only`.
    fn staged_paths(&self) -> Result<Vec<String>, VcsError>;

    /// `commit -m <message>`; the message is a single argv element.
    fn commit(&self, message: &str) -> Result<GitOutput, VcsError>;

    /// `branch -r`, trimmed, symbolic `HEAD ->` lines dropped.
    fn remote_branches(&self) -> Result<Vec<String>, VcsError>;

    /// `rev-list --count <from>..<to>`.
    fn rev_list_count(&self, from: &str, to: &str) -> Result<u32, VcsError>;

    /// `rev-parse --verify <reference>^{commit}`.
    fn rev_parse(&self, reference: &str) -> Result<CommitId, VcsError>;

    /// `merge-base --is-ancestor <ancestor> <descendant>`.
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool, VcsError>;

    /// Whether `<branch>@{u}` resolves.
    fn has_upstream(&self, branch: &BranchName) -> Result<bool, VcsError>;

    /// Local branches, most recently committed first.
    fn recent_local_branches(&self, limit: usize) -> Result<Vec<BranchEntry>, VcsError>;

    /// Remote-tracking branches of `remote` under `prefix` (e.g. `feat/`),
    /// most recently committed first, with the remote name stripped.
    fn recent_remote_branches(
        &self,
        remote: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<BranchEntry>, VcsError>;

    /// `branch --list <branch>` is non-empty.
    fn local_branch_exists(&self, branch: &BranchName) -> Result<bool, VcsError>;

    /// `branch -m <from> <to>`.
    fn rename_branch(&self, from: &BranchName, to: &BranchName) -> Result<(), VcsError>;

    /// `branch -D <branch>`.
    fn delete_branch(&self, branch: &BranchName) -> Result<(), VcsError>;

    /// `tag -a <tag> -m <message>`.
    fn tag_annotated(&self, tag: &str, message: &str) -> Result<(), VcsError>;
}

// ---------------------------------------------------------------------------
// GitCli
// ---------------------------------------------------------------------------

/// [`Vcs`] backed by the `git` executable on `PATH`.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
}

impl GitCli {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Run git and fail on a non-zero exit.
    fn run(&self, args: &[&str]) -> Result<GitOutput, VcsError> {
        let output = self.spawn(args)?;
        let captured = captured(&output);
        if output.status.success() {
            Ok(captured)
        } else {
            Err(VcsError::Failed {
                command: args.join(" "),
                code: output.status.code(),
                stdout: captured.stdout,
                stderr: captured.stderr,
            })
        }
    }

    /// Run git and hand back the raw exit code for calls where a non-zero
    /// exit is an answer rather than a failure.
    fn run_status(&self, args: &[&str]) -> Result<(Option<i32>, GitOutput), VcsError> {
        let output = self.spawn(args)?;
        Ok((output.status.code(), captured(&output)))
    }

    fn spawn(&self, args: &[&str]) -> Result<Output, VcsError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            // Merges and pulls must never park on an editor we cannot see.
            .env("GIT_MERGE_AUTOEDIT", "no")
            .output()
            .map_err(|source| VcsError::Spawn {
                command: args.join(" "),
                source,
            })?;
        tracing::debug!("git {} -> {:?}", args.join(" "), output.status.code());
        Ok(output)
    }

    fn stdout_lines(&self, args: &[&str]) -> Result<Vec<String>, VcsError> {
        Ok(self
            .run(args)?
            .stdout
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .map(str::to_owned)
            .collect())
    }

    fn for_each_ref(
        &self,
        namespace: &str,
        limit: usize,
        strip: Option<&str>,
    ) -> Result<Vec<BranchEntry>, VcsError> {
        let count = format!("--count={limit}");
        let lines = self.stdout_lines(&[
            "for-each-ref",
            "--sort=-committerdate",
            &count,
            "--format=%(refname:short)|%(committerdate:relative)|%(subject)",
            namespace,
        ])?;
        Ok(lines
            .iter()
            .filter_map(|line| parse_ref_line(line, strip))
            .collect())
    }
}

impl Vcs for GitCli {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn status_porcelain(&self) -> Result<Vec<String>, VcsError> {
        self.stdout_lines(&["status", "--porcelain"])
    }

    fn current_branch(&self) -> Result<Option<BranchName>, VcsError> {
        let out = self.run(&["branch", "--show-current"])?;
        let name = out.stdout.trim();
        Ok((!name.is_empty()).then(|| BranchName::from(name)))
    }

    fn fetch(&self, remote: &str, branch: Option<&BranchName>) -> Result<(), VcsError> {
        match branch {
            Some(branch) => self.run(&["fetch", remote, branch.as_str()])?,
            None => self.run(&["fetch", remote])?,
        };
        Ok(())
    }

    fn fetch_all(&self) -> Result<(), VcsError> {
        self.run(&["fetch", "--all"])?;
        Ok(())
    }

    fn checkout(&self, reference: &str) -> Result<(), VcsError> {
        self.run(&["checkout", reference])?;
        Ok(())
    }

    fn checkout_new(&self, branch: &BranchName, start: &str) -> Result<(), VcsError> {
        self.run(&["checkout", "-b", branch.as_str(), start])?;
        Ok(())
    }

    fn rebase(&self, upstream: &str) -> Result<GitOutput, VcsError> {
        self.run(&["rebase", upstream])
    }

    fn merge(&self, reference: &str, mode: MergeMode) -> Result<GitOutput, VcsError> {
        match mode {
            MergeMode::FastForwardOnly => self.run(&["merge", "--ff-only", reference]),
            MergeMode::Default => self.run(&["merge", reference]),
        }
    }

    fn pull(&self, remote: &str, branch: &BranchName) -> Result<GitOutput, VcsError> {
        self.run(&["pull", remote, branch.as_str()])
    }

    fn push(
        &self,
        remote: &str,
        branch: &BranchName,
        follow_tags: bool,
    ) -> Result<GitOutput, VcsError> {
        if follow_tags {
            self.run(&["push", "--follow-tags", remote, branch.as_str()])
        } else {
            self.run(&["push", remote, branch.as_str()])
        }
    }

    fn reset_soft(&self, reference: &str) -> Result<(), VcsError> {
        self.run(&["reset", "--soft", reference])?;
        Ok(())
    }

    fn reset_hard(&self, reference: &str) -> Result<(), VcsError> {
        self.run(&["reset", "--hard", reference])?;
        Ok(())
    }

    fn staged_paths(&self) -> Result<Vec<String>, VcsError> {
        self.stdout_lines(&["diff", "--cached", "--name-only"])
    }

    fn commit(&self, message: &str) -> Result<GitOutput, VcsError> {
        self.run(&["commit", "-m", message])
    }

    fn remote_branches(&self) -> Result<Vec<String>, VcsError> {
        Ok(self
            .stdout_lines(&["branch", "-r"])?
            .into_iter()
            .map(|line| line.trim().to_owned())
            .filter(|line| !line.contains(" -> "))
            .collect())
    }

    fn rev_list_count(&self, from: &str, to: &str) -> Result<u32, VcsError> {
        let range = format!("{from}..{to}");
        let out = self.run(&["rev-list", "--count", &range])?;
        let text = out.stdout.trim();
        text.parse().map_err(|_| VcsError::Parse {
            command: format!("rev-list --count {range}"),
            output: text.to_owned(),
        })
    }

    fn rev_parse(&self, reference: &str) -> Result<CommitId, VcsError> {
        let revspec = format!("{reference}^{{commit}}");
        let out = self.run(&["rev-parse", "--verify", &revspec])?;
        let id = out.stdout.trim();
        if id.is_empty() {
            return Err(VcsError::Parse {
                command: format!("rev-parse --verify {revspec}"),
                output: out.stdout,
            });
        }
        Ok(CommitId::from(id))
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool, VcsError> {
        let args = ["merge-base", "--is-ancestor", ancestor, descendant];
        match self.run_status(&args)? {
            (Some(0), _) => Ok(true),
            (Some(1), _) => Ok(false),
            (code, out) => Err(VcsError::Failed {
                command: args.join(" "),
                code,
                stdout: out.stdout,
                stderr: out.stderr,
            }),
        }
    }

    fn has_upstream(&self, branch: &BranchName) -> Result<bool, VcsError> {
        let revspec = format!("{}@{{u}}", branch.as_str());
        let (code, _) = self.run_status(&["rev-parse", "--abbrev-ref", &revspec])?;
        Ok(code == Some(0))
    }

    fn recent_local_branches(&self, limit: usize) -> Result<Vec<BranchEntry>, VcsError> {
        self.for_each_ref("refs/heads/", limit, None)
    }

    fn recent_remote_branches(
        &self,
        remote: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<BranchEntry>, VcsError> {
        let namespace = format!("refs/remotes/{remote}/{prefix}");
        let strip = format!("{remote}/");
        self.for_each_ref(&namespace, limit, Some(&strip))
    }

    fn local_branch_exists(&self, branch: &BranchName) -> Result<bool, VcsError> {
        Ok(!self
            .stdout_lines(&["branch", "--list", branch.as_str()])?
            .is_empty())
    }

    fn rename_branch(&self, from: &BranchName, to: &BranchName) -> Result<(), VcsError> {
        self.run(&["branch", "-m", from.as_str(), to.as_str()])?;
        Ok(())
    }

    fn delete_branch(&self, branch: &BranchName) -> Result<(), VcsError> {
        self.run(&["branch", "-D", branch.as_str()])?;
        Ok(())
    }

    fn tag_annotated(&self, tag: &str, message: &str) -> Result<(), VcsError> {
        self.run(&["tag", "-a", tag, "-m", message])?;
        Ok(())
    }
}

fn captured(output: &Output) -> GitOutput {
    GitOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

/// Parse one `name|age|subject` line; the subject may itself contain `|`.
fn parse_ref_line(line: &str, strip: Option<&str>) -> Option<BranchEntry> {
    let mut parts = line.trim().splitn(3, '|');
    let name = parts.next()?.trim();
    if name.is_empty() {
        return None;
    }
    let name = strip
        .and_then(|prefix| name.strip_prefix(prefix))
        .unwrap_or(name);
    Some(BranchEntry {
        name: BranchName::from(name),
        age: parts.next().unwrap_or_default().trim().to_owned(),
        subject: parts.next().unwrap_or_default().trim().to_owned(),
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
