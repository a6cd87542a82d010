// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Telemetry: structured logging and in-process metrics.
//!
//! - **Tracing**: `tracing` events from the store and service, rendered by
//!   `tracing-subscriber` with an `EnvFilter` (`RUST_LOG` wins)
//! - **Metrics**: operation timings and parking counters
//!
//! # Usage
//!
//! ```rust,ignore
//! use parkmeter::telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(&TelemetryConfig::default())?;
//! ```
//!
//! Timing calls are compiled in with the `telemetry` feature (on by default).

mod init;
pub mod metrics;

pub use init::{init_telemetry, TelemetryConfig, TelemetryGuard};
pub use metrics::{Histogram, Metrics, MetricsSnapshot, OperationMetrics, GLOBAL_METRICS};
