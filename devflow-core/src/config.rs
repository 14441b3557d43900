//! User configuration at `~/.devflow/config.yaml`.
//!
//! # API pattern
//!
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! A missing file is not an error: every field has a default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::BranchName;

/// Workflow settings. Every field may be omitted from the YAML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Remote used for fetch, pull and push.
    pub remote: String,
    /// Prefix of shared feature branches on the remote.
    pub feature_prefix: String,
    /// Prefix of release branches.
    pub release_prefix: String,
    /// Explicit trunk branch; detected from the remote when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trunk: Option<BranchName>,
    /// How many recent branches to offer in a select.
    pub branch_list_limit: usize,
    /// argv of an external command whose stdout suggests a commit message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_command: Option<Vec<String>>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            feature_prefix: "feat/".to_string(),
            release_prefix: "release/".to_string(),
            trunk: None,
            branch_list_limit: 5,
            message_command: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.devflow/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".devflow").join("config.yaml")
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Load the config, falling back to [`FlowConfig::default`] when absent.
///
/// Returns `ConfigError::Parse` (with path and line context) on malformed YAML.
pub fn load_at(home: &Path) -> Result<FlowConfig, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        tracing::debug!("no config at {}, using defaults", path.display());
        return Ok(FlowConfig::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    if contents.trim().is_empty() {
        return Ok(FlowConfig::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<FlowConfig, ConfigError> {
    load_at(&home()?)
}

/// Atomically write the config.
///
/// Write flow: serialize → `config.yaml.tmp` → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, config: &FlowConfig) -> Result<PathBuf, ConfigError> {
    let path = config_path_at(home);
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
            set_dir_permissions(dir)?;
        }
    }
    let tmp = path.with_file_name("config.yaml.tmp");
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(path)
}

/// `save_at` convenience wrapper.
pub fn save(config: &FlowConfig) -> Result<PathBuf, ConfigError> {
    save_at(&home()?, config)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
