//! Throw-away repositories for the integration tests.
//!
//! Layout under one `TempDir`:
//!
//! ```text
//! remote.git   bare, branches main and feat/1.0.0
//! work/        clone the engine runs in; local dev branched off feat/1.0.0
//! other/       second clone standing in for a teammate
//! ```

#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use devflow_core::{
    BranchEntry, BranchName, CommitId, GitCli, GitOutput, MergeMode, Vcs, VcsError,
};
use tempfile::TempDir;

pub const TARGET: &str = "feat/1.0.0";
pub const PRIVATE: &str = "dev";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Run git in `dir`, panic on failure, return trimmed stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_MERGE_AUTOEDIT", "no")
        .output()
        .expect("spawn git");
    assert!(
        out.status.success(),
        "git {} failed in {}: {}",
        args.join(" "),
        dir.display(),
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_owned()
}

fn configure(dir: &Path) {
    git(dir, &["config", "user.name", "Test Dev"]);
    git(dir, &["config", "user.email", "dev@example.com"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
    git(dir, &["config", "tag.gpgsign", "false"]);
    git(dir, &["config", "pull.rebase", "false"]);
}

pub struct Fixture {
    _root: TempDir,
    pub remote: PathBuf,
    pub work: PathBuf,
    pub other: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        init_logging();
        let root = TempDir::new().expect("tempdir");
        let remote = root.path().join("remote.git");
        let work = root.path().join("work");
        let other = root.path().join("other");

        git(root.path(), &["init", "-q", "--bare", "-b", "main", "remote.git"]);
        git(root.path(), &["clone", "-q", "remote.git", "work"]);
        configure(&work);
        git(&work, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        write(&work, "README.md", "# demo\n");
        git(&work, &["add", "."]);
        git(&work, &["commit", "-q", "-m", "initial"]);
        git(&work, &["push", "-q", "-u", "origin", "main"]);

        git(&work, &["checkout", "-q", "-b", TARGET]);
        write(&work, "app.txt", "base\n");
        git(&work, &["add", "."]);
        git(&work, &["commit", "-q", "-m", "feat: scaffold"]);
        git(&work, &["push", "-q", "-u", "origin", TARGET]);
        git(&work, &["checkout", "-q", "-b", PRIVATE]);

        git(root.path(), &["clone", "-q", "remote.git", "other"]);
        configure(&other);

        Self {
            _root: root,
            remote,
            work,
            other,
        }
    }

    pub fn vcs(&self) -> GitCli {
        GitCli::new(&self.work)
    }

    /// Commit `contents` to `name` on whatever is checked out in `dir`.
    pub fn commit(&self, dir: &Path, name: &str, contents: &str, message: &str) -> String {
        commit_in(dir, name, contents, message)
    }

    /// `other` pushes one commit to `branch`.
    pub fn teammate_pushes(&self, branch: &str, name: &str, contents: &str) {
        teammate_push(&self.other, branch, name, contents);
    }

    pub fn head(&self, reference: &str) -> String {
        git(&self.work, &["rev-parse", reference])
    }

    /// Tip of `branch` on the bare remote.
    pub fn remote_head(&self, branch: &str) -> String {
        git(&self.remote, &["rev-parse", branch])
    }

    pub fn current_branch(&self) -> String {
        git(&self.work, &["branch", "--show-current"])
    }

    pub fn count(&self, range: &str) -> u32 {
        git(&self.work, &["rev-list", "--count", range])
            .parse()
            .expect("count")
    }

    pub fn reject_pushes(&self) {
        install_hook(&self.remote.join("hooks"), "pre-receive", "push rejected by hook");
    }

    pub fn reject_commits(&self) {
        install_hook(&self.work.join(".git").join("hooks"), "pre-commit", "commit rejected by hook");
    }

    pub fn in_rebase(&self) -> bool {
        let git_dir = self.work.join(".git");
        git_dir.join("rebase-merge").exists() || git_dir.join("rebase-apply").exists()
    }
}

pub fn commit_in(dir: &Path, name: &str, contents: &str, message: &str) -> String {
    write(dir, name, contents);
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-q", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
}

/// Push one commit to `branch` from the clone at `other`.
pub fn teammate_push(other: &Path, branch: &str, name: &str, contents: &str) {
    git(other, &["fetch", "-q", "origin"]);
    git(other, &["checkout", "-q", "-B", branch, &format!("origin/{branch}")]);
    commit_in(other, name, contents, &format!("teammate: {name}"));
    git(other, &["push", "-q", "origin", branch]);
}

pub fn write(dir: &Path, name: &str, contents: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, contents).expect("write file");
}

fn install_hook(dir: &Path, name: &str, message: &str) {
    fs::create_dir_all(dir).expect("hooks dir");
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\necho \"{message}\" >&2\nexit 1\n")).expect("hook");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
    }
}

// ---------------------------------------------------------------------------
// RecordingVcs
// ---------------------------------------------------------------------------

const MUTATING: &[&str] = &[
    "fetch",
    "fetch_all",
    "checkout",
    "checkout_new",
    "rebase",
    "merge",
    "pull",
    "push",
    "reset_soft",
    "reset_hard",
    "commit",
    "rename_branch",
    "delete_branch",
    "tag_annotated",
];

type Hook = Box<dyn FnOnce()>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Fault {
    /// Return a failed git call without running git.
    Fail,
    /// Report success without running git.
    Skip,
}

/// [`GitCli`] wrapper that records every call, can run an action right
/// before a given checkout, and can break chosen calls.
pub struct RecordingVcs {
    inner: GitCli,
    calls: RefCell<Vec<String>>,
    before_checkout: RefCell<Option<(String, Hook)>>,
    faults: RefCell<Vec<(String, Fault)>>,
}

impl RecordingVcs {
    pub fn new(inner: GitCli) -> Self {
        Self {
            inner,
            calls: RefCell::new(Vec::new()),
            before_checkout: RefCell::new(None),
            faults: RefCell::new(Vec::new()),
        }
    }

    /// Calls matching `call` (`"method"` or `"method arg"`) fail with exit 1
    /// and `injected failure` on stderr.
    pub fn fail(&self, call: &str) {
        self.faults.borrow_mut().push((call.to_owned(), Fault::Fail));
    }

    /// Calls matching `call` succeed without touching the repository.
    pub fn skip(&self, call: &str) {
        self.faults.borrow_mut().push((call.to_owned(), Fault::Skip));
    }

    /// Record the call and look up a fault for it. `Ok(true)` means skip.
    fn enter(&self, method: &str, args: &[&str]) -> Result<bool, VcsError> {
        self.record(method, args);
        let line = self.calls.borrow().last().cloned().unwrap_or_default();
        let fault = self
            .faults
            .borrow()
            .iter()
            .find(|(call, _)| line == *call || line.starts_with(&format!("{call} ")))
            .map(|(_, fault)| *fault);
        match fault {
            Some(Fault::Fail) => Err(VcsError::Failed {
                command: line,
                code: Some(1),
                stdout: String::new(),
                stderr: "injected failure".to_owned(),
            }),
            Some(Fault::Skip) => Ok(true),
            None => Ok(false),
        }
    }

    pub fn before_checkout(&self, reference: &str, hook: impl FnOnce() + 'static) {
        *self.before_checkout.borrow_mut() = Some((reference.to_owned(), Box::new(hook)));
    }

    /// `"method arg1 arg2"` per call, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn mutating_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| {
                let method = call.split_whitespace().next().unwrap_or_default();
                MUTATING.contains(&method)
            })
            .collect()
    }

    fn record(&self, method: &str, args: &[&str]) {
        let mut line = method.to_owned();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.calls.borrow_mut().push(line);
    }
}

impl Vcs for RecordingVcs {
    fn workdir(&self) -> &Path {
        self.inner.workdir()
    }

    fn status_porcelain(&self) -> Result<Vec<String>, VcsError> {
        self.record("status_porcelain", &[]);
        self.inner.status_porcelain()
    }

    fn current_branch(&self) -> Result<Option<BranchName>, VcsError> {
        self.record("current_branch", &[]);
        self.inner.current_branch()
    }

    fn fetch(&self, remote: &str, branch: Option<&BranchName>) -> Result<(), VcsError> {
        self.record("fetch", &[remote, branch.map(BranchName::as_str).unwrap_or_default()]);
        self.inner.fetch(remote, branch)
    }

    fn fetch_all(&self) -> Result<(), VcsError> {
        self.record("fetch_all", &[]);
        self.inner.fetch_all()
    }

    fn checkout(&self, reference: &str) -> Result<(), VcsError> {
        if self.enter("checkout", &[reference])? {
            return Ok(());
        }
        let hook = {
            let mut slot = self.before_checkout.borrow_mut();
            match slot.as_ref() {
                Some((wanted, _)) if wanted == reference => slot.take().map(|(_, hook)| hook),
                _ => None,
            }
        };
        if let Some(hook) = hook {
            hook();
        }
        self.inner.checkout(reference)
    }

    fn checkout_new(&self, branch: &BranchName, start: &str) -> Result<(), VcsError> {
        self.record("checkout_new", &[branch.as_str(), start]);
        self.inner.checkout_new(branch, start)
    }

    fn rebase(&self, upstream: &str) -> Result<GitOutput, VcsError> {
        self.record("rebase", &[upstream]);
        self.inner.rebase(upstream)
    }

    fn merge(&self, reference: &str, mode: MergeMode) -> Result<GitOutput, VcsError> {
        if self.enter("merge", &[reference])? {
            return Ok(GitOutput::default());
        }
        self.inner.merge(reference, mode)
    }

    fn pull(&self, remote: &str, branch: &BranchName) -> Result<GitOutput, VcsError> {
        if self.enter("pull", &[remote, branch.as_str()])? {
            return Ok(GitOutput::default());
        }
        self.inner.pull(remote, branch)
    }

    fn push(
        &self,
        remote: &str,
        branch: &BranchName,
        follow_tags: bool,
    ) -> Result<GitOutput, VcsError> {
        self.record("push", &[remote, branch.as_str()]);
        self.inner.push(remote, branch, follow_tags)
    }

    fn reset_soft(&self, reference: &str) -> Result<(), VcsError> {
        if self.enter("reset_soft", &[reference])? {
            return Ok(());
        }
        self.inner.reset_soft(reference)
    }

    fn reset_hard(&self, reference: &str) -> Result<(), VcsError> {
        if self.enter("reset_hard", &[reference])? {
            return Ok(());
        }
        self.inner.reset_hard(reference)
    }

    fn staged_paths(&self) -> Result<Vec<String>, VcsError> {
        self.record("staged_paths", &[]);
        self.inner.staged_paths()
    }

    fn commit(&self, message: &str) -> Result<GitOutput, VcsError> {
        if self.enter("commit", &[message])? {
            return Ok(GitOutput::default());
        }
        self.inner.commit(message)
    }

    fn remote_branches(&self) -> Result<Vec<String>, VcsError> {
        self.record("remote_branches", &[]);
        self.inner.remote_branches()
    }

    fn rev_list_count(&self, from: &str, to: &str) -> Result<u32, VcsError> {
        self.record("rev_list_count", &[from, to]);
        self.inner.rev_list_count(from, to)
    }

    fn rev_parse(&self, reference: &str) -> Result<CommitId, VcsError> {
        self.record("rev_parse", &[reference]);
        self.inner.rev_parse(reference)
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool, VcsError> {
        self.record("is_ancestor", &[ancestor, descendant]);
        self.inner.is_ancestor(ancestor, descendant)
    }

    fn has_upstream(&self, branch: &BranchName) -> Result<bool, VcsError> {
        self.record("has_upstream", &[branch.as_str()]);
        self.inner.has_upstream(branch)
    }

    fn recent_local_branches(&self, limit: usize) -> Result<Vec<BranchEntry>, VcsError> {
        self.record("recent_local_branches", &[]);
        self.inner.recent_local_branches(limit)
    }

    fn recent_remote_branches(
        &self,
        remote: &str,
        prefix: &str,
        limit: usize,
    ) -> Result<Vec<BranchEntry>, VcsError> {
        self.record("recent_remote_branches", &[remote, prefix]);
        self.inner.recent_remote_branches(remote, prefix, limit)
    }

    fn local_branch_exists(&self, branch: &BranchName) -> Result<bool, VcsError> {
        self.record("local_branch_exists", &[branch.as_str()]);
        self.inner.local_branch_exists(branch)
    }

    fn rename_branch(&self, from: &BranchName, to: &BranchName) -> Result<(), VcsError> {
        self.record("rename_branch", &[from.as_str(), to.as_str()]);
        self.inner.rename_branch(from, to)
    }

    fn delete_branch(&self, branch: &BranchName) -> Result<(), VcsError> {
        self.record("delete_branch", &[branch.as_str()]);
        self.inner.delete_branch(branch)
    }

    fn tag_annotated(&self, tag: &str, message: &str) -> Result<(), VcsError> {
        self.record("tag_annotated", &[tag, message]);
        self.inner.tag_annotated(tag, message)
    }
}
