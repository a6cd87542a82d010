// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Parkmeter - parking lot entry, exit, and billing.
//!
//! Logs vehicles in and out by plate number, bills each stay by started
//! time unit, and keeps the session history in a pluggable store.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`parking`] - Session types, billing rules, stores, receipts, and the service
//! - [`error`] - Error types and result aliases
//! - [`config`] - Configuration loading and merging
//! - [`telemetry`] - Tracing setup and in-process metrics
//!
//! # Example
//!
//! ```rust,ignore
//! use parkmeter::config::{load_config, CliOptions};
//! use parkmeter::parking::{MemoryStore, ParkingService};
//!
//! let config = load_config(".".as_ref(), CliOptions::default())?;
//! let service = ParkingService::new(Box::new(MemoryStore::new()), config.rate()?);
//! service.enter("ABC-123").await?;
//! ```

pub mod config;
pub mod error;
pub mod parking;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use error::{ConfigError, ParkingError, Result};
pub use parking::{
    Dashboard, JsonFileStore, MemoryStore, Money, ParkedVehicle, ParkingService, ParkingSession,
    PlateNumber, RateSpec, Receipt, SessionId, SessionStore, SqliteStore,
};

/// Parkmeter version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
