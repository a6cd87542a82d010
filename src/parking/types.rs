// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Parking session types: identifiers, plates, money, and the session record.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParkingError;

/// Unique identifier of a parking session.
///
/// New identifiers are UUID v4 strings. Older records used numeric
/// timestamp-derived ids; those load as their decimal string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Self(text),
            RawId::Number(number) => Self(number.to_string()),
        })
    }
}

/// A normalized license plate: trimmed, non-empty, upper-cased.
///
/// Stored plates go through the same normalization on load, so padded or
/// lower-case legacy values compare equal to fresh input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PlateNumber(String);

impl PlateNumber {
    /// Normalize raw operator input into a plate number.
    pub fn parse(raw: &str) -> Result<Self, ParkingError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ParkingError::validation("Please enter a valid plate number"));
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    /// Case-insensitive comparison against raw input.
    pub fn matches(&self, raw: &str) -> bool {
        self.0 == raw.trim().to_uppercase()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for PlateNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for PlateNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A monetary amount in minor units (cents).
///
/// Persisted as a JSON number in major units (`0.5`, `10.0`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Convert a major-unit amount, rounding to the nearest cent.
    pub fn from_major(amount: f64) -> Option<Self> {
        if !amount.is_finite() {
            return None;
        }
        let cents = (amount * 100.0).round();
        if cents.abs() > i64::MAX as f64 {
            return None;
        }
        Some(Self(cents as i64))
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn as_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Multiply by a whole number of billing units, saturating on overflow.
    pub fn times(self, units: i64) -> Self {
        Self(self.0.saturating_mul(units))
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Render with a currency symbol, always two decimals.
    pub fn format_with(self, symbol: &str) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{}{}{}.{:02}", sign, symbol, abs / 100, abs % 100)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_with("$"))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.as_major())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let amount = f64::deserialize(deserializer)?;
        Money::from_major(amount)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid amount: {}", amount)))
    }
}

/// Whether a session is still parked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No exit recorded yet.
    Open,
    /// Exit time and payment are set.
    Closed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Elapsed parking time split for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveDuration {
    pub hours: u64,
    pub minutes: u64,
}

impl LiveDuration {
    pub fn from_minutes(total: u64) -> Self {
        Self {
            hours: total / 60,
            minutes: total % 60,
        }
    }

    pub fn total_minutes(&self) -> u64 {
        self.hours * 60 + self.minutes
    }
}

impl fmt::Display for LiveDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hours > 0 {
            write!(f, "{}h {}m", self.hours, self.minutes)
        } else {
            write!(f, "{}m", self.minutes)
        }
    }
}

/// One vehicle visit, from entry to exit.
///
/// Fields are read-only outside the crate: a session is opened by
/// [`open_session`](super::billing::open_session) and closed exactly once by
/// [`close_session`](super::billing::close_session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingSession {
    id: SessionId,
    plate_number: PlateNumber,
    entry_time: DateTime<Utc>,
    #[serde(default)]
    exit_time: Option<DateTime<Utc>>,
    #[serde(default)]
    payment: Option<Money>,
}

impl ParkingSession {
    pub(crate) fn open(id: SessionId, plate_number: PlateNumber, entry_time: DateTime<Utc>) -> Self {
        Self {
            id,
            plate_number,
            entry_time,
            exit_time: None,
            payment: None,
        }
    }

    /// Exit time and payment are always set together.
    pub(crate) fn into_closed(self, exit_time: DateTime<Utc>, payment: Money) -> Self {
        Self {
            exit_time: Some(exit_time),
            payment: Some(payment),
            ..self
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn plate_number(&self) -> &PlateNumber {
        &self.plate_number
    }

    pub fn entry_time(&self) -> DateTime<Utc> {
        self.entry_time
    }

    pub fn exit_time(&self) -> Option<DateTime<Utc>> {
        self.exit_time
    }

    pub fn payment(&self) -> Option<Money> {
        self.payment
    }

    pub fn status(&self) -> SessionStatus {
        if self.exit_time.is_none() {
            SessionStatus::Open
        } else {
            SessionStatus::Closed
        }
    }

    pub fn is_open(&self) -> bool {
        self.status() == SessionStatus::Open
    }

    /// Check the record-level invariants of a loaded session.
    pub fn validate(&self) -> Result<(), ParkingError> {
        if self.plate_number.as_str().trim().is_empty() {
            return Err(ParkingError::corrupt(format!("session {} has an empty plate", self.id)));
        }
        match (self.exit_time, self.payment) {
            (None, None) => Ok(()),
            (Some(exit), Some(payment)) => {
                if exit < self.entry_time {
                    return Err(ParkingError::corrupt(format!(
                        "session {} exits before it enters",
                        self.id
                    )));
                }
                if payment.cents() < 0 {
                    return Err(ParkingError::corrupt(format!(
                        "session {} has a negative payment",
                        self.id
                    )));
                }
                Ok(())
            }
            _ => Err(ParkingError::corrupt(format!(
                "session {} has exit time and payment out of step",
                self.id
            ))),
        }
    }
}
