// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration module for parkmeter.
//!
//! Handles loading, merging, and validation of configuration from multiple sources:
//! - Global config: ~/.parkmeter/config.json
//! - Workspace config: .parkmeter.json, .parkmeter/config.json, parkmeter.config.json,
//!   or .parkmeter.yaml
//! - Local config: .parkmeter.local.json (per-machine overrides)
//! - CLI options: command-line arguments
//!
//! Configuration is merged with precedence (CLI > local > workspace > global > defaults).

mod loader;
mod merger;
mod types;

pub use loader::{
    find_workspace_root, get_example_config, get_global_config_dir, get_global_config_path,
    init_config, load_config_file, load_global_config, load_local_config, load_workspace_config,
    save_workspace_config, CONFIG_FILES, GLOBAL_CONFIG_DIR, GLOBAL_CONFIG_FILE, LOCAL_CONFIG_FILE,
};

pub use merger::{default_config, merge_config, CliOptions};

pub use types::{RatePreset, ResolvedConfig, StoreBackend, WorkspaceConfig};

use crate::error::ConfigError;
use std::path::Path;

/// Load, merge, and validate all configuration sources for a workspace.
pub fn load_config(
    workspace_root: &Path,
    cli_options: CliOptions,
) -> Result<ResolvedConfig, ConfigError> {
    let global = load_global_config()?;
    let workspace = load_workspace_config(workspace_root)?;
    let local = load_local_config(workspace_root)?;

    let config = merge_config(global, workspace, local, cli_options);
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_with_no_files() {
        let temp = TempDir::new().unwrap();
        let result = load_config(temp.path(), CliOptions::default());
        // A global config may exist on the host; it must still resolve
        assert!(result.is_ok());
    }

    #[test]
    fn test_load_config_with_workspace_and_local() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".parkmeter.json"),
            r#"{"ratePreset": "half-hour", "storeBackend": "memory"}"#,
        )
        .unwrap();
        std::fs::write(
            temp.path().join(LOCAL_CONFIG_FILE),
            r#"{"recentExitsLimit": 8}"#,
        )
        .unwrap();

        let config = load_config(temp.path(), CliOptions::default()).unwrap();
        assert_eq!(config.rate_preset, RatePreset::HalfHour);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.recent_exits_limit, 8);
    }

    #[test]
    fn test_load_config_cli_override() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".parkmeter.json"),
            r#"{"storeBackend": "json"}"#,
        )
        .unwrap();

        let cli = CliOptions {
            backend: Some(StoreBackend::Sqlite),
            ..Default::default()
        };

        let config = load_config(temp.path(), cli).unwrap();
        assert_eq!(config.store_backend, StoreBackend::Sqlite); // CLI wins
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".parkmeter.json"),
            r#"{"unitMinutes": 0}"#,
        )
        .unwrap();

        let result = load_config(temp.path(), CliOptions::default());
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
