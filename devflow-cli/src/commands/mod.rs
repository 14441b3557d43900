pub mod config;
pub mod prompt;
pub mod release;
pub mod sync;
pub mod trunk;

use anyhow::{Context, Result};
use colored::Colorize;
use devflow_core::FlowConfig;

pub fn load_config() -> Result<FlowConfig> {
    devflow_core::config::load().context("failed to load ~/.devflow/config.yaml")
}

/// Numbered follow-up steps under a heading.
pub fn print_steps(heading: &str, steps: &[impl AsRef<str>]) {
    if steps.is_empty() {
        return;
    }
    println!("{}", heading.bold());
    for (i, step) in steps.iter().enumerate() {
        println!("  {}. {}", i + 1, step.as_ref().cyan());
    }
}

pub fn print_paths(paths: &[String]) {
    for path in paths {
        println!("  {}", path.yellow());
    }
}
