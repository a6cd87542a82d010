// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tracing subscriber setup for the CLI.
//!
//! Log lines go to stderr; stdout carries command output (text or JSON) only.

use std::io;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// How the CLI logs.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Level used when neither `filter_directive` nor `RUST_LOG` applies.
    pub default_level: Level,

    /// Log span enter/close, e.g. around `parking.enter`.
    pub include_span_events: bool,

    pub include_file_line: bool,
    pub include_target: bool,
    pub ansi_colors: bool,
    pub compact: bool,

    /// Explicit `EnvFilter` directive; wins over `RUST_LOG`.
    pub filter_directive: Option<String>,

    /// Print the metrics report to stderr when the guard drops.
    pub report_metrics: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_level: Level::WARN,
            include_span_events: false,
            include_file_line: false,
            include_target: true,
            ansi_colors: true,
            compact: true,
            filter_directive: None,
            report_metrics: false,
        }
    }
}

impl TelemetryConfig {
    /// `--debug`: store loads, saves, and every flow with its spans.
    pub fn development() -> Self {
        Self {
            default_level: Level::DEBUG,
            include_span_events: true,
            include_file_line: true,
            compact: false,
            ..Self::default()
        }
    }

    /// Unattended kiosks: errors only, no colors.
    pub fn production() -> Self {
        Self {
            default_level: Level::ERROR,
            include_target: false,
            ansi_colors: false,
            ..Self::default()
        }
    }

    /// Everything from this crate, uncolored for captured test output.
    pub fn testing() -> Self {
        Self {
            default_level: Level::TRACE,
            ansi_colors: false,
            filter_directive: Some("parkmeter=trace".to_string()),
            ..Self::development()
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter_directive = Some(filter.into());
        self
    }

    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi_colors = ansi;
        self
    }

    pub fn with_metrics_report(mut self, report: bool) -> Self {
        self.report_metrics = report;
        self
    }

    /// Directive precedence: explicit filter, then `RUST_LOG`, then the default level.
    fn env_filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(self.default_level.to_string());
        match &self.filter_directive {
            Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|_| fallback()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback()),
        }
    }

    fn span_events(&self) -> FmtSpan {
        if self.include_span_events {
            FmtSpan::ENTER | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// Held by `main` until exit; prints the metrics report on drop when asked to.
pub struct TelemetryGuard {
    report_metrics: bool,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        #[cfg(feature = "telemetry")]
        if self.report_metrics {
            let report = super::metrics::GLOBAL_METRICS.snapshot().format_report();
            eprintln!("{}", report);
        }
        #[cfg(not(feature = "telemetry"))]
        let _ = self.report_metrics;
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_telemetry(config: &TelemetryConfig) -> io::Result<TelemetryGuard> {
    let fmt_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .with_file(config.include_file_line)
        .with_line_number(config.include_file_line)
        .with_span_events(config.span_events());

    let registry = tracing_subscriber::registry().with(config.env_filter());
    let installed = if config.compact {
        registry.with(fmt_layer.compact()).try_init()
    } else {
        registry.with(fmt_layer).try_init()
    };
    installed.map_err(|e| io::Error::other(e.to_string()))?;

    Ok(TelemetryGuard {
        report_metrics: config.report_metrics,
    })
}
