// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration type definitions.
//!
//! Defines the structure of workspace and resolved configuration,
//! supporting JSON and YAML formats.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::parking::{Money, RateSpec, DEFAULT_RECENT_EXITS};

/// Named billing policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RatePreset {
    /// $5.00 per started hour.
    #[default]
    Hourly,
    /// $0.50 per started half hour.
    HalfHour,
}

impl RatePreset {
    pub fn rate(self) -> RateSpec {
        match self {
            Self::Hourly => RateSpec::HOURLY,
            Self::HalfHour => RateSpec::HALF_HOUR,
        }
    }
}

impl fmt::Display for RatePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hourly => write!(f, "hourly"),
            Self::HalfHour => write!(f, "half-hour"),
        }
    }
}

/// Where sessions are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Json,
    Sqlite,
    /// Nothing survives the process; for demos and dry runs.
    Memory,
}

impl StoreBackend {
    /// File name used when no explicit store path is configured.
    pub fn default_file_name(self) -> Option<&'static str> {
        match self {
            Self::Json => Some("sessions.json"),
            Self::Sqlite => Some("sessions.db"),
            Self::Memory => None,
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Sqlite => write!(f, "sqlite"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Workspace configuration for parkmeter.
/// Can be defined in .parkmeter.json or .parkmeter/config.json in the lot's directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    /// Billing preset (hourly, half-hour)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_preset: Option<RatePreset>,

    /// Billing unit length in minutes, overriding the preset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_minutes: Option<u32>,

    /// Price per unit in major currency units, overriding the preset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_backend: Option<StoreBackend>,

    /// Path of the session file or database
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,

    /// Number of exits on the dashboard
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_exits_limit: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_symbol: Option<String>,
}

/// Fully resolved configuration after merging all sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfig {
    pub rate_preset: RatePreset,
    pub unit_minutes: Option<u32>,
    pub unit_price: Option<f64>,
    pub store_backend: StoreBackend,
    pub store_path: Option<PathBuf>,
    pub recent_exits_limit: usize,
    pub currency_symbol: String,
}

impl ResolvedConfig {
    /// Billing policy: the preset with any explicit unit overrides applied.
    pub fn rate(&self) -> Result<RateSpec, ConfigError> {
        let base = self.rate_preset.rate();
        let minutes = self.unit_minutes.unwrap_or(base.unit_minutes());
        let price = match self.unit_price {
            Some(amount) => Money::from_major(amount)
                .ok_or_else(|| ConfigError::invalid("unitPrice", "must be a finite amount"))?,
            None => base.unit_price(),
        };

        if minutes == 0 {
            return Err(ConfigError::invalid("unitMinutes", "must be greater than zero"));
        }
        RateSpec::new(minutes, price)
            .map_err(|e| ConfigError::invalid("unitPrice", e.to_string()))
    }

    /// Store location, falling back to the global parkmeter directory.
    pub fn resolved_store_path(&self) -> Option<PathBuf> {
        if self.store_backend == StoreBackend::Memory {
            return None;
        }
        if let Some(path) = &self.store_path {
            return Some(path.clone());
        }
        let file_name = self.store_backend.default_file_name()?;
        super::loader::get_global_config_dir().map(|dir| dir.join(file_name))
    }

    /// Check every value that could make a later command fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rate()?;
        if self.recent_exits_limit == 0 {
            return Err(ConfigError::invalid("recentExitsLimit", "must be at least 1"));
        }
        if self.currency_symbol.trim().is_empty() {
            return Err(ConfigError::invalid("currencySymbol", "must not be empty"));
        }
        Ok(())
    }
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            rate_preset: RatePreset::Hourly,
            unit_minutes: None,
            unit_price: None,
            store_backend: StoreBackend::Json,
            store_path: None,
            recent_exits_limit: DEFAULT_RECENT_EXITS,
            currency_symbol: "$".to_string(),
        }
    }
}
