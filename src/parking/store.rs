// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session store abstraction and the in-memory backend.

#[cfg(feature = "telemetry")]
use std::time::Instant;

use tracing::{debug, warn};

use crate::error::ParkingError;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use super::billing::validate_sessions;
use super::types::ParkingSession;

/// Durable, ordered collection of parking sessions.
///
/// Implementations only move data; all business rules live in the billing
/// engine. Insertion order is preserved across load and save.
#[cfg_attr(test, mockall::automock)]
pub trait SessionStore: Send {
    /// Load every session. A store with no data yet yields an empty list.
    fn load_all(&self) -> Result<Vec<ParkingSession>, ParkingError>;

    /// Replace the whole persisted collection.
    fn save_all(&mut self, sessions: &[ParkingSession]) -> Result<(), ParkingError>;

    /// Replace the session with the same id, or append it.
    fn upsert(&mut self, session: &ParkingSession) -> Result<(), ParkingError> {
        let mut sessions = self.load_all()?;
        match sessions.iter_mut().find(|s| s.id() == session.id()) {
            Some(existing) => *existing = session.clone(),
            None => sessions.push(session.clone()),
        }
        self.save_all(&sessions)
    }

    /// Short description of the backend for logs and status output.
    fn describe(&self) -> String;
}

/// Decode a persisted collection.
///
/// Blank input is a fresh store. Anything unparsable or violating a session
/// invariant is reported as corrupt rather than discarded.
pub fn decode_sessions(raw: &str) -> Result<Vec<ParkingSession>, ParkingError> {
    #[cfg(feature = "telemetry")]
    let start = Instant::now();

    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let sessions: Vec<ParkingSession> = serde_json::from_str(raw).map_err(|e| {
        warn!(error = %e, "Stored sessions could not be parsed");
        ParkingError::corrupt(e.to_string())
    })?;
    validate_sessions(&sessions).inspect_err(|e| {
        warn!(error = %e, "Stored sessions failed validation");
    })?;

    #[cfg(feature = "telemetry")]
    GLOBAL_METRICS.record_operation("store.decode", start.elapsed());

    debug!(count = sessions.len(), "Decoded sessions");
    Ok(sessions)
}

/// Encode a collection for persistence.
pub fn encode_sessions(sessions: &[ParkingSession]) -> Result<String, ParkingError> {
    serde_json::to_string_pretty(sessions)
        .map_err(|e| ParkingError::Io(format!("Failed to serialize sessions: {}", e)))
}

/// Session store held in memory as a single serialized blob.
///
/// Useful for tests and throwaway runs; it round-trips through the same
/// codec as the durable backends.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    blob: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with raw persisted text.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self {
            blob: Some(raw.into()),
        }
    }

    /// Seed the store with existing sessions.
    pub fn with_sessions(sessions: &[ParkingSession]) -> Result<Self, ParkingError> {
        Ok(Self {
            blob: Some(encode_sessions(sessions)?),
        })
    }

    pub fn raw(&self) -> Option<&str> {
        self.blob.as_deref()
    }
}

impl SessionStore for MemoryStore {
    fn load_all(&self) -> Result<Vec<ParkingSession>, ParkingError> {
        match &self.blob {
            Some(raw) => decode_sessions(raw),
            None => Ok(Vec::new()),
        }
    }

    fn save_all(&mut self, sessions: &[ParkingSession]) -> Result<(), ParkingError> {
        self.blob = Some(encode_sessions(sessions)?);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parking::billing::{close_session, open_session, RateSpec};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_empty_store_loads_nothing() {
        let store = MemoryStore::new();
        assert!(store.load_all().unwrap().is_empty());

        let store = MemoryStore::from_raw("   \n");
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_blob_is_reported() {
        let store = MemoryStore::from_raw("{not json");
        assert!(matches!(store.load_all(), Err(ParkingError::CorruptStore(_))));

        let store = MemoryStore::from_raw(r#"{"plateNumber": "ABC"}"#);
        assert!(matches!(store.load_all(), Err(ParkingError::CorruptStore(_))));
    }

    #[test]
    fn test_plates_differing_only_in_padding_are_one_plate() {
        let store = MemoryStore::from_raw(
            r#"[
                {"id": "a", "plateNumber": "abc-123 ", "entryTime": "2024-01-01T10:00:00Z"},
                {"id": "b", "plateNumber": "ABC-123", "entryTime": "2024-01-01T10:05:00Z"}
            ]"#,
        );
        assert!(matches!(store.load_all(), Err(ParkingError::CorruptStore(_))));
    }

    #[test]
    fn test_save_then_load_preserves_order() {
        let mut store = MemoryStore::new();
        let a = open_session(&[], "AAA", at(10, 0)).unwrap();
        let b = open_session(&[], "BBB", at(9, 0)).unwrap();
        let c = open_session(&[], "CCC", at(11, 0)).unwrap();
        store.save_all(&[a.clone(), b.clone(), c.clone()]).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded, vec![a, b, c]);
    }

    #[test]
    fn test_upsert_appends_then_replaces() {
        let mut store = MemoryStore::new();
        let open = open_session(&[], "ABC-123", at(10, 0)).unwrap();
        let other = open_session(&[], "XYZ-999", at(10, 5)).unwrap();
        store.upsert(&open).unwrap();
        store.upsert(&other).unwrap();
        assert_eq!(store.load_all().unwrap().len(), 2);

        let closed = close_session(&open, &RateSpec::HOURLY, at(11, 15)).unwrap();
        store.upsert(&closed).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], closed);
        assert_eq!(loaded[1], other);
    }

    #[test]
    fn test_with_sessions_seeds_store() {
        let open = open_session(&[], "ABC-123", at(10, 0)).unwrap();
        let store = MemoryStore::with_sessions(std::slice::from_ref(&open)).unwrap();
        assert!(store.raw().unwrap().contains("ABC-123"));
        assert_eq!(store.load_all().unwrap(), vec![open]);
    }
}
