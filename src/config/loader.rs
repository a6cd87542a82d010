// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Config file discovery, parsing, and writing.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ConfigError;

use super::types::{RatePreset, StoreBackend, WorkspaceConfig};

/// Workspace config file names, highest priority first.
pub const CONFIG_FILES: &[&str] = &[
    ".parkmeter.json",
    ".parkmeter/config.json",
    "parkmeter.config.json",
    ".parkmeter.yaml",
    ".parkmeter.yml",
];

/// Per-machine overrides, e.g. a kiosk's own store path.
pub const LOCAL_CONFIG_FILE: &str = ".parkmeter.local.json";

/// Directory under the home directory holding global config and default stores.
pub const GLOBAL_CONFIG_DIR: &str = ".parkmeter";

pub const GLOBAL_CONFIG_FILE: &str = "config.json";

/// `~/.parkmeter`, if a home directory is known.
pub fn get_global_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(GLOBAL_CONFIG_DIR))
}

pub fn get_global_config_path() -> Option<PathBuf> {
    get_global_config_dir().map(|dir| dir.join(GLOBAL_CONFIG_FILE))
}

/// Load `path` if it exists. An absent layer is not an error.
fn load_if_present(path: &Path) -> Result<Option<WorkspaceConfig>, ConfigError> {
    if !path.is_file() {
        return Ok(None);
    }
    debug!(path = %path.display(), "Loading config layer");
    load_config_file(path).map(Some)
}

pub fn load_global_config() -> Result<Option<WorkspaceConfig>, ConfigError> {
    match get_global_config_path() {
        Some(path) => load_if_present(&path),
        None => Ok(None),
    }
}

/// Load the first workspace config file found in `workspace_root`.
pub fn load_workspace_config(workspace_root: &Path) -> Result<Option<WorkspaceConfig>, ConfigError> {
    match workspace_config_path(workspace_root) {
        Some(path) => load_if_present(&path),
        None => Ok(None),
    }
}

pub fn load_local_config(workspace_root: &Path) -> Result<Option<WorkspaceConfig>, ConfigError> {
    load_if_present(&workspace_root.join(LOCAL_CONFIG_FILE))
}

fn workspace_config_path(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

/// Parse a config file; `.yaml`/`.yml` as YAML, anything else as JSON.
pub fn load_config_file(path: &Path) -> Result<WorkspaceConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    if is_yaml(path) {
        Ok(serde_yaml::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(&content)?)
    }
}

/// Write `config` into `workspace_root`, as YAML when `filename` says so.
pub fn save_workspace_config(
    workspace_root: &Path,
    config: &WorkspaceConfig,
    filename: Option<&str>,
) -> Result<PathBuf, ConfigError> {
    let path = workspace_root.join(filename.unwrap_or(CONFIG_FILES[0]));
    let content = if is_yaml(&path) {
        serde_yaml::to_string(config)?
    } else {
        serde_json::to_string_pretty(config)?
    };
    std::fs::write(&path, content)?;
    Ok(path)
}

/// Write the example lot config, refusing to replace an existing one.
pub fn init_config(
    workspace_root: &Path,
    config: Option<WorkspaceConfig>,
) -> Result<PathBuf, ConfigError> {
    if let Some(existing) = workspace_config_path(workspace_root) {
        return Err(ConfigError::invalid(
            existing.display().to_string(),
            "a workspace config already exists",
        ));
    }
    let config = config.unwrap_or_else(get_example_config);
    save_workspace_config(workspace_root, &config, None)
}

/// Nearest ancestor of `start` (inclusive) holding a workspace config file.
pub fn find_workspace_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| workspace_config_path(dir).is_some())
        .map(Path::to_path_buf)
}

/// A single-lot setup: hourly billing into a JSON file next to the config.
pub fn get_example_config() -> WorkspaceConfig {
    WorkspaceConfig {
        rate_preset: Some(RatePreset::Hourly),
        store_backend: Some(StoreBackend::Json),
        store_path: Some(PathBuf::from("parking-sessions.json")),
        recent_exits_limit: Some(5),
        currency_symbol: Some("$".to_string()),
        ..Default::default()
    }
}
