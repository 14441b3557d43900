//! Domain types for the sync engine.
//!
//! Branch and commit references are newtypes over `String`; never pass a bare
//! `&str` where a [`BranchName`] or [`CommitId`] is meant.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed local branch name (`feat/1.2.0`, `alice/login`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchName(pub String);

impl BranchName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The remote-tracking ref for this branch, e.g. `origin/feat/1.2.0`.
    pub fn remote_ref(&self, remote: &str) -> String {
        format!("{remote}/{}", self.0)
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for BranchName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BranchName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A full commit object id as printed by `git rev-parse`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(pub String);

impl CommitId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for operator-facing output.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(8);
        &self.0[..end]
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for CommitId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CommitId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How far the private branch is ahead of the target's remote tip, measured
/// after the rebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "commits")]
pub enum Aheadness {
    /// Nothing to publish.
    UpToDate,
    /// Exactly one commit; publish as is.
    Atomic,
    /// More than one commit; compaction candidate.
    Fragmented(u32),
}

impl Aheadness {
    pub fn from_count(count: u32) -> Self {
        match count {
            0 => Aheadness::UpToDate,
            1 => Aheadness::Atomic,
            n => Aheadness::Fragmented(n),
        }
    }

    pub fn count(&self) -> u32 {
        match self {
            Aheadness::UpToDate => 0,
            Aheadness::Atomic => 1,
            Aheadness::Fragmented(n) => *n,
        }
    }
}

/// Strategy for bringing trunk changes into the current branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrunkStrategy {
    /// Shared branch: merge trunk in, history is preserved.
    Merge,
    /// Private branch: replay onto trunk, history stays linear.
    Rebase,
}

impl fmt::Display for TrunkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrunkStrategy::Merge => write!(f, "merge"),
            TrunkStrategy::Rebase => write!(f, "rebase"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A branch offered for selection, as listed by `for-each-ref`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchEntry {
    pub name: BranchName,
    /// Relative committer date, e.g. `"3 days ago"`.
    pub age: String,
    /// Subject line of the tip commit.
    pub subject: String,
}

impl BranchEntry {
    pub fn label(&self) -> String {
        format!("{:<20} ({}) - {}", self.name.0, self.age, self.subject)
    }
}

/// One run of the sync pipeline. Created once both branches are known,
/// discarded at the end of the run; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Branch checked out when the run started (`None` on a detached HEAD).
    pub started_on: Option<BranchName>,
    pub private: BranchName,
    pub target: BranchName,
    /// Private-branch tip captured right before compaction rewrites it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<CommitId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ahead: Option<Aheadness>,
}

impl Session {
    pub fn new(started_on: Option<BranchName>, private: BranchName, target: BranchName) -> Self {
        Self {
            started_on,
            private,
            target,
            anchor: None,
            ahead: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
