// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for parkmeter.
//!
//! This module provides strongly-typed errors for the parking core and the
//! configuration layer, using `thiserror` for ergonomic error definitions and
//! `anyhow` for error propagation in the CLI.

use thiserror::Error;

/// Errors that can occur during parking operations.
///
/// Every variant is recoverable at the call site; the presentation layer turns
/// them into messages and lets the operator retry.
#[derive(Error, Debug)]
pub enum ParkingError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Vehicle {plate} is already in the parking area")]
    DuplicateEntry { plate: String },

    #[error("No active parking record found for {plate}")]
    NotFound { plate: String },

    #[error("No parking session with id {id}")]
    SessionNotFound { id: String },

    #[error("Session {id} has already exited")]
    AlreadyClosed { id: String },

    #[error("Session store is corrupted: {0}")]
    CorruptStore(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl ParkingError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a corrupt-store error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptStore(message.into())
    }

    /// Check if the operator can fix this by changing input or retrying later.
    ///
    /// Store failures are not: retrying without intervention repeats them.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::DuplicateEntry { .. }
                | Self::NotFound { .. }
                | Self::SessionNotFound { .. }
                | Self::AlreadyClosed { .. }
        )
    }
}

impl From<std::io::Error> for ParkingError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<rusqlite::Error> for ParkingError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Io(format!("sqlite: {}", err))
    }
}

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config format: {0}")]
    InvalidFormat(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("IO error reading config: {0}")]
    IoError(String),

    #[error("YAML parsing error: {0}")]
    YamlError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),
}

impl ConfigError {
    /// Create an invalid-value error for a named field.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::YamlError(err.to_string())
    }
}

/// Result type alias using anyhow for flexible error handling.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parking_error_user_correctable() {
        assert!(ParkingError::validation("empty plate").is_user_correctable());
        assert!(ParkingError::DuplicateEntry { plate: "ABC-123".to_string() }.is_user_correctable());
        assert!(ParkingError::NotFound { plate: "ABC-123".to_string() }.is_user_correctable());
        assert!(ParkingError::SessionNotFound { id: "s9".to_string() }.is_user_correctable());
        assert!(ParkingError::AlreadyClosed { id: "s1".to_string() }.is_user_correctable());
        assert!(!ParkingError::corrupt("bad json").is_user_correctable());
        assert!(!ParkingError::Io("disk full".to_string()).is_user_correctable());
    }

    #[test]
    fn test_session_not_found_names_the_id() {
        let err = ParkingError::SessionNotFound { id: "s9".to_string() };
        assert_eq!(err.to_string(), "No parking session with id s9");
    }

    #[test]
    fn test_parking_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ParkingError = io_err.into();
        assert!(matches!(err, ParkingError::Io(_)));
    }

    #[test]
    fn test_config_error_from_json() {
        let result: std::result::Result<serde_json::Value, _> = serde_json::from_str("invalid json");
        let json_err = result.unwrap_err();
        let config_err: ConfigError = json_err.into();
        assert!(matches!(config_err, ConfigError::JsonError(_)));
    }

    #[test]
    fn test_config_error_from_io_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let config_err: ConfigError = io_err.into();
        assert!(matches!(config_err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_error_display() {
        let err = ParkingError::DuplicateEntry {
            plate: "ABC-123".to_string(),
        };
        assert_eq!(err.to_string(), "Vehicle ABC-123 is already in the parking area");

        let err = ConfigError::invalid("unitMinutes", "must be greater than zero");
        let display = format!("{}", err);
        assert!(display.contains("unitMinutes"));
        assert!(display.contains("greater than zero"));
    }
}
