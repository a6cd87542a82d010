// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Exit receipts.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::billing::{compute_live_duration, RateSpec};
use super::types::{LiveDuration, Money, ParkingSession, PlateNumber};

static RECEIPT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Generate a receipt id: `RCP-{unix millis}-{sequence}`.
///
/// The sequence is process-wide and monotonic, so two exits in the same
/// millisecond still get distinct ids.
pub fn generate_receipt_id() -> String {
    let seq = RECEIPT_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("RCP-{}-{:04}", Utc::now().timestamp_millis(), seq)
}

/// What the operator hands the driver at exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub receipt_id: String,
    pub plate_number: PlateNumber,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub payment: Money,
    pub duration: LiveDuration,
    pub rate: RateSpec,
}

impl Receipt {
    /// Build a receipt from a closed session. Returns `None` for an open one.
    pub fn for_session(session: &ParkingSession, rate: RateSpec) -> Option<Self> {
        let exit_time = session.exit_time()?;
        let payment = session.payment()?;
        Some(Self {
            receipt_id: generate_receipt_id(),
            plate_number: session.plate_number().clone(),
            entry_time: session.entry_time(),
            exit_time,
            payment,
            duration: compute_live_duration(session.entry_time(), exit_time),
            rate,
        })
    }

    /// Plain-text rendering for terminals and printers.
    pub fn render_text(&self, currency: &str) -> String {
        let mut out = String::new();
        let rule = "-".repeat(36);
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "{:^36}", "PARKING RECEIPT");
        let _ = writeln!(out, "{:^36}", self.receipt_id);
        let _ = writeln!(out, "Issued: {}", self.exit_time.format("%Y-%m-%d %H:%M:%S UTC"));
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "{:<12}{:>24}", "Plate", self.plate_number.as_str());
        let _ = writeln!(out, "{:<12}{:>24}", "Entry", self.entry_time.format("%Y-%m-%d %H:%M").to_string());
        let _ = writeln!(out, "{:<12}{:>24}", "Exit", self.exit_time.format("%Y-%m-%d %H:%M").to_string());
        let _ = writeln!(out, "{:<12}{:>24}", "Duration", self.duration.to_string());
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "{:<12}{:>24}", "Rate", self.rate.describe(currency));
        let _ = writeln!(out, "{:<12}{:>24}", "TOTAL", self.payment.format_with(currency));
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "Thank you for your payment!");
        let _ = write!(out, "Please keep this receipt for your records.");
        out
    }
}
