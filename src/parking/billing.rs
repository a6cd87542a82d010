// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Billing engine: duration and fee arithmetic plus session-state queries.
//!
//! Every function here is pure. Wall-clock readings are passed in by the
//! caller, so the same inputs always give the same answer.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ParkingError;

use super::types::{LiveDuration, Money, ParkingSession, PlateNumber, SessionId};

/// A billing policy: a unit length and the price charged per started unit.
///
/// Deserialization goes through [`RateSpec::new`], so a zero-length unit or a
/// free unit never reaches the fee arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateSpec {
    unit_minutes: u32,
    unit_price: Money,
}

impl RateSpec {
    /// $5.00 per started hour.
    pub const HOURLY: RateSpec = RateSpec {
        unit_minutes: 60,
        unit_price: Money::from_cents(500),
    };

    /// $0.50 per started half hour.
    pub const HALF_HOUR: RateSpec = RateSpec {
        unit_minutes: 30,
        unit_price: Money::from_cents(50),
    };

    pub fn new(unit_minutes: u32, unit_price: Money) -> Result<Self, ParkingError> {
        if unit_minutes == 0 {
            return Err(ParkingError::validation("billing unit must be at least one minute"));
        }
        if !unit_price.is_positive() {
            return Err(ParkingError::validation("unit price must be greater than zero"));
        }
        Ok(Self {
            unit_minutes,
            unit_price,
        })
    }

    pub fn unit_minutes(&self) -> u32 {
        self.unit_minutes
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    /// Human-readable policy, e.g. `$0.50 per 30 minutes`.
    pub fn describe(&self, currency: &str) -> String {
        let price = self.unit_price.format_with(currency);
        match self.unit_minutes {
            1 => format!("{} per minute", price),
            60 => format!("{} per hour", price),
            n => format!("{} per {} minutes", price, n),
        }
    }
}

impl<'de> Deserialize<'de> for RateSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct RawRateSpec {
            unit_minutes: u32,
            unit_price: Money,
        }

        let raw = RawRateSpec::deserialize(deserializer)?;
        RateSpec::new(raw.unit_minutes, raw.unit_price).map_err(serde::de::Error::custom)
    }
}

impl Default for RateSpec {
    fn default() -> Self {
        Self::HOURLY
    }
}

/// Whole minutes billed between two instants, partial minutes rounded up.
///
/// Negative spans (clock skew) count as zero.
pub fn billable_minutes(entry_time: DateTime<Utc>, exit_time: DateTime<Utc>) -> u64 {
    let elapsed = exit_time.signed_duration_since(entry_time);
    let seconds = elapsed.num_seconds();
    if seconds < 0 || (seconds == 0 && elapsed.subsec_nanos() <= 0) {
        return 0;
    }
    let whole = (seconds / 60) as u64;
    if seconds % 60 != 0 || elapsed.subsec_nanos() > 0 {
        whole + 1
    } else {
        whole
    }
}

/// Fee owed for a stay, rounded up to whole units with a one-unit minimum.
pub fn compute_fee(entry_time: DateTime<Utc>, exit_time: DateTime<Utc>, rate: &RateSpec) -> Money {
    let minutes = billable_minutes(entry_time, exit_time);
    let unit = u64::from(rate.unit_minutes);
    let units = minutes.div_ceil(unit).max(1);
    rate.unit_price.times(i64::try_from(units).unwrap_or(i64::MAX))
}

/// Elapsed whole minutes since entry (floored), never negative.
pub fn compute_live_duration(entry_time: DateTime<Utc>, now: DateTime<Utc>) -> LiveDuration {
    let minutes = now.signed_duration_since(entry_time).num_minutes().max(0);
    LiveDuration::from_minutes(minutes as u64)
}

/// Current fee for a session: the estimate while open, the final payment once closed.
pub fn live_fee(session: &ParkingSession, rate: &RateSpec, now: DateTime<Utc>) -> Money {
    match session.payment() {
        Some(payment) => payment,
        None => compute_fee(session.entry_time(), now, rate),
    }
}

/// Whether any open session carries this plate (case-insensitive).
pub fn is_plate_currently_parked(sessions: &[ParkingSession], plate_number: &str) -> bool {
    sessions
        .iter()
        .any(|s| s.is_open() && s.plate_number().matches(plate_number))
}

/// Find the open session for a plate (case-insensitive).
pub fn find_open_session<'a>(
    sessions: &'a [ParkingSession],
    plate_number: &str,
) -> Result<&'a ParkingSession, ParkingError> {
    sessions
        .iter()
        .find(|s| s.is_open() && s.plate_number().matches(plate_number))
        .ok_or_else(|| ParkingError::NotFound {
            plate: plate_number.trim().to_uppercase(),
        })
}

/// Find any session by id.
pub fn find_session<'a>(
    sessions: &'a [ParkingSession],
    id: &SessionId,
) -> Option<&'a ParkingSession> {
    sessions.iter().find(|s| s.id() == id)
}

/// Produce a new open session for a plate that is not currently parked.
pub fn open_session(
    sessions: &[ParkingSession],
    raw_plate: &str,
    now: DateTime<Utc>,
) -> Result<ParkingSession, ParkingError> {
    let plate = PlateNumber::parse(raw_plate)?;
    if is_plate_currently_parked(sessions, plate.as_str()) {
        return Err(ParkingError::DuplicateEntry {
            plate: plate.to_string(),
        });
    }
    Ok(ParkingSession::open(SessionId::generate(), plate, now))
}

/// Close an open session at `now`, fixing its fee.
///
/// The exit time never precedes the entry time; a skewed clock is clamped.
pub fn close_session(
    session: &ParkingSession,
    rate: &RateSpec,
    now: DateTime<Utc>,
) -> Result<ParkingSession, ParkingError> {
    if !session.is_open() {
        return Err(ParkingError::AlreadyClosed {
            id: session.id().to_string(),
        });
    }
    let exit_time = now.max(session.entry_time());
    let payment = compute_fee(session.entry_time(), exit_time, rate);
    Ok(session.clone().into_closed(exit_time, payment))
}

/// Closed sessions, most recent exit first.
pub fn recent_exits(sessions: &[ParkingSession], limit: usize) -> Vec<&ParkingSession> {
    let mut exits: Vec<&ParkingSession> = sessions.iter().filter(|s| !s.is_open()).collect();
    exits.sort_by(|a, b| b.exit_time().cmp(&a.exit_time()));
    exits.truncate(limit);
    exits
}

/// Check collection-level invariants on loaded data.
pub fn validate_sessions(sessions: &[ParkingSession]) -> Result<(), ParkingError> {
    let mut ids = HashSet::new();
    let mut open_plates = HashSet::new();

    for session in sessions {
        session.validate()?;
        if !ids.insert(session.id()) {
            return Err(ParkingError::corrupt(format!("duplicate session id {}", session.id())));
        }
        if session.is_open() && !open_plates.insert(session.plate_number().as_str()) {
            return Err(ParkingError::corrupt(format!(
                "plate {} has more than one open session",
                session.plate_number()
            )));
        }
    }
    Ok(())
}

/// Summary figures for the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingStats {
    pub currently_parked: usize,
    pub completed: usize,
    pub total_revenue: Money,
}

impl ParkingStats {
    pub fn from_sessions(sessions: &[ParkingSession]) -> Self {
        let currently_parked = sessions.iter().filter(|s| s.is_open()).count();
        Self {
            currently_parked,
            completed: sessions.len() - currently_parked,
            total_revenue: sessions.iter().filter_map(ParkingSession::payment).sum(),
        }
    }
}
