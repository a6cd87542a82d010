// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration merging.
//!
//! Handles merging configurations from different sources with proper precedence.

use std::path::PathBuf;

use super::types::{RatePreset, ResolvedConfig, StoreBackend, WorkspaceConfig};

/// CLI options that can override configuration.
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub preset: Option<RatePreset>,
    pub unit_minutes: Option<u32>,
    pub unit_price: Option<f64>,
    pub backend: Option<StoreBackend>,
    pub store_path: Option<PathBuf>,
}

/// Default configuration values.
pub fn default_config() -> ResolvedConfig {
    ResolvedConfig::default()
}

/// Merge multiple configurations with precedence.
///
/// Precedence (highest to lowest):
/// 1. CLI options
/// 2. Local config (.parkmeter.local.json)
/// 3. Workspace config (.parkmeter.json)
/// 4. Global config (~/.parkmeter/config.json)
/// 5. Default values
pub fn merge_config(
    global: Option<WorkspaceConfig>,
    workspace: Option<WorkspaceConfig>,
    local: Option<WorkspaceConfig>,
    cli: CliOptions,
) -> ResolvedConfig {
    let mut result = default_config();

    for config in [global, workspace, local].into_iter().flatten() {
        apply_workspace_config(&mut result, &config);
    }

    apply_cli_options(&mut result, &cli);

    result
}

fn apply_workspace_config(result: &mut ResolvedConfig, config: &WorkspaceConfig) {
    if let Some(preset) = config.rate_preset {
        // A new preset resets unit overrides from lower layers
        result.rate_preset = preset;
        result.unit_minutes = None;
        result.unit_price = None;
    }

    if config.unit_minutes.is_some() {
        result.unit_minutes = config.unit_minutes;
    }

    if config.unit_price.is_some() {
        result.unit_price = config.unit_price;
    }

    if let Some(backend) = config.store_backend {
        result.store_backend = backend;
    }

    if config.store_path.is_some() {
        result.store_path = config.store_path.clone();
    }

    if let Some(limit) = config.recent_exits_limit {
        result.recent_exits_limit = limit;
    }

    if let Some(ref symbol) = config.currency_symbol {
        result.currency_symbol = symbol.clone();
    }
}

fn apply_cli_options(result: &mut ResolvedConfig, cli: &CliOptions) {
    if let Some(preset) = cli.preset {
        result.rate_preset = preset;
        result.unit_minutes = None;
        result.unit_price = None;
    }

    if cli.unit_minutes.is_some() {
        result.unit_minutes = cli.unit_minutes;
    }

    if cli.unit_price.is_some() {
        result.unit_price = cli.unit_price;
    }

    if let Some(backend) = cli.backend {
        result.store_backend = backend;
    }

    if cli.store_path.is_some() {
        result.store_path = cli.store_path.clone();
    }
}
