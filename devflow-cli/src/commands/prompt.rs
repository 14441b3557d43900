//! Line-based terminal [`Prompter`]: questions go to stderr, answers come
//! from stdin. End of input cancels every question; `q` cancels a select.

use std::io::{self, BufRead, Write};

use colored::Colorize;
use devflow_core::{Choice, PromptError, Prompter};

pub struct TerminalPrompter;

impl TerminalPrompter {
    /// `None` on end of input.
    fn read_line(&self) -> Result<Option<String>, PromptError> {
        io::stderr().flush()?;
        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_owned()))
    }
}

impl Prompter for TerminalPrompter {
    fn select(
        &self,
        message: &str,
        choices: &[Choice],
        default: Option<&str>,
    ) -> Result<Option<String>, PromptError> {
        let default_index = default.and_then(|d| choices.iter().position(|c| c.value == d));
        eprintln!("{} {}", "?".green().bold(), message.bold());
        for (i, choice) in choices.iter().enumerate() {
            let marker = if Some(i) == default_index { ">" } else { " " };
            eprintln!("  {marker} {}) {}", i + 1, choice.label);
        }
        loop {
            match default_index {
                Some(i) => eprint!("  choose 1-{} [{}], q to cancel: ", choices.len(), i + 1),
                None => eprint!("  choose 1-{}, q to cancel: ", choices.len()),
            }
            let answer = match self.read_line()? {
                Some(answer) => answer,
                None => return Ok(None),
            };
            let answer = answer.trim();
            if answer.eq_ignore_ascii_case("q") {
                return Ok(None);
            }
            if answer.is_empty() {
                if let Some(i) = default_index {
                    return Ok(Some(choices[i].value.clone()));
                }
                continue;
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=choices.len()).contains(&n) => {
                    return Ok(Some(choices[n - 1].value.clone()))
                }
                _ => eprintln!("  {}", "not a listed number".yellow()),
            }
        }
    }

    fn text(&self, message: &str, default: Option<&str>) -> Result<Option<String>, PromptError> {
        match default {
            Some(d) => eprint!("{} {} [{}]: ", "?".green().bold(), message.bold(), d.dimmed()),
            None => eprint!("{} {}: ", "?".green().bold(), message.bold()),
        }
        Ok(self.read_line()?.map(|answer| {
            if answer.trim().is_empty() {
                default.unwrap_or_default().to_owned()
            } else {
                answer
            }
        }))
    }

    fn confirm(&self, message: &str, default: bool) -> Result<Option<bool>, PromptError> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            eprint!("{} {} [{hint}]: ", "?".green().bold(), message.bold());
            let answer = match self.read_line()? {
                Some(answer) => answer,
                None => return Ok(None),
            };
            match answer.trim().to_ascii_lowercase().as_str() {
                "" => return Ok(Some(default)),
                "y" | "yes" => return Ok(Some(true)),
                "n" | "no" => return Ok(Some(false)),
                _ => eprintln!("  {}", "answer y or n".yellow()),
            }
        }
    }
}
