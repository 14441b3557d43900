//! Human-input surface used by the pipeline.
//!
//! Every question returns `Ok(None)` when the operator cancels; callers map
//! that uniformly to an aborted session. Errors are reserved for a broken
//! provider (terminal I/O failure, script mismatch).

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::error::PromptError;

/// One option of a single-choice select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub value: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Injected provider for every question the pipeline may ask.
pub trait Prompter {
    /// Pick one of `choices`; returns the chosen [`Choice::value`].
    fn select(
        &self,
        message: &str,
        choices: &[Choice],
        default: Option<&str>,
    ) -> Result<Option<String>, PromptError>;

    /// Free-text entry; an empty answer yields `default` when one is given.
    fn text(&self, message: &str, default: Option<&str>) -> Result<Option<String>, PromptError>;

    /// Yes/no.
    fn confirm(&self, message: &str, default: bool) -> Result<Option<bool>, PromptError>;
}

// ---------------------------------------------------------------------------
// Scripted provider
// ---------------------------------------------------------------------------

/// A canned answer for [`ScriptedPrompter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Select(String),
    Text(String),
    Confirm(bool),
    /// Accept whatever default the question offers.
    Default,
    Cancel,
}

/// Non-interactive [`Prompter`] that replays a fixed list of answers in
/// order and records every question it was asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: RefCell<VecDeque<Answer>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: RefCell::new(answers.into_iter().collect()),
            asked: RefCell::new(Vec::new()),
        }
    }

    /// Questions asked so far, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }

    /// Answers not yet consumed.
    pub fn remaining(&self) -> usize {
        self.answers.borrow().len()
    }

    fn next(&self, message: &str) -> Result<Answer, PromptError> {
        self.asked.borrow_mut().push(message.to_owned());
        self.answers
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| mismatch(message, "no scripted answer left"))
    }
}

fn mismatch(message: &str, reason: impl Into<String>) -> PromptError {
    PromptError::Script {
        message: message.to_owned(),
        reason: reason.into(),
    }
}

impl Prompter for ScriptedPrompter {
    fn select(
        &self,
        message: &str,
        choices: &[Choice],
        default: Option<&str>,
    ) -> Result<Option<String>, PromptError> {
        match self.next(message)? {
            Answer::Select(value) => {
                if choices.iter().any(|c| c.value == value) {
                    Ok(Some(value))
                } else {
                    Err(mismatch(message, format!("'{value}' is not an offered choice")))
                }
            }
            Answer::Default => default
                .map(|d| Some(d.to_owned()))
                .ok_or_else(|| mismatch(message, "select has no default")),
            Answer::Cancel => Ok(None),
            other => Err(mismatch(message, format!("expected a select answer, got {other:?}"))),
        }
    }

    fn text(&self, message: &str, default: Option<&str>) -> Result<Option<String>, PromptError> {
        match self.next(message)? {
            Answer::Text(value) if value.is_empty() => {
                Ok(Some(default.unwrap_or_default().to_owned()))
            }
            Answer::Text(value) => Ok(Some(value)),
            Answer::Default => Ok(Some(default.unwrap_or_default().to_owned())),
            Answer::Cancel => Ok(None),
            other => Err(mismatch(message, format!("expected a text answer, got {other:?}"))),
        }
    }

    fn confirm(&self, message: &str, default: bool) -> Result<Option<bool>, PromptError> {
        match self.next(message)? {
            Answer::Confirm(value) => Ok(Some(value)),
            Answer::Default => Ok(Some(default)),
            Answer::Cancel => Ok(None),
            other => Err(mismatch(message, format!("expected a confirm answer, got {other:?}"))),
        }
    }
}
