//! devflow core library: domain types, VCS adapter, prompt surface, config.
//!
//! - [`types`] newtypes and session structs
//! - [`error`] [`VcsError`], [`ConfigError`], [`PromptError`]
//! - [`vcs`] the [`Vcs`] trait and its `git` subprocess implementation
//! - [`prompt`] the [`Prompter`] trait and a scripted provider
//! - [`config`] `~/.devflow/config.yaml`

pub mod config;
pub mod error;
pub mod prompt;
pub mod types;
pub mod vcs;

pub use config::FlowConfig;
pub use error::{ConfigError, PromptError, VcsError};
pub use prompt::{Answer, Choice, Prompter, ScriptedPrompter};
pub use types::{Aheadness, BranchEntry, BranchName, CommitId, Session, TrunkStrategy};
pub use vcs::{GitCli, GitOutput, MergeMode, Vcs};
