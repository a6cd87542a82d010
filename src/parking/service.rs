// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Parking service: entry, exit, search, and dashboard flows over a store.

use std::sync::Arc;
#[cfg(feature = "telemetry")]
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::error::ParkingError;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use super::billing::{
    close_session, compute_live_duration, find_open_session, find_session, live_fee, open_session,
    recent_exits, ParkingStats, RateSpec,
};
use super::receipt::Receipt;
use super::store::SessionStore;
use super::types::{LiveDuration, Money, ParkingSession, SessionId};

/// Default number of exits shown on the dashboard.
pub const DEFAULT_RECENT_EXITS: usize = 5;

/// An open session with its live values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkedVehicle {
    pub session: ParkingSession,
    pub duration: LiveDuration,
    pub estimated_fee: Money,
}

impl ParkedVehicle {
    fn at(session: &ParkingSession, rate: &RateSpec, now: DateTime<Utc>) -> Self {
        Self {
            session: session.clone(),
            duration: compute_live_duration(session.entry_time(), now),
            estimated_fee: live_fee(session, rate, now),
        }
    }
}

/// Everything the operator overview shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub stats: ParkingStats,
    pub rate: RateSpec,
    pub parked: Vec<ParkedVehicle>,
    pub recent_exits: Vec<ParkingSession>,
    pub generated_at: DateTime<Utc>,
}

/// Parking service.
///
/// Every mutating flow holds the store lock for its whole
/// load, compute, save sequence, so two concurrent entries for one plate or
/// two concurrent exits of one session cannot both succeed.
pub struct ParkingService {
    store: Arc<Mutex<Box<dyn SessionStore>>>,
    rate: RateSpec,
    recent_exits_limit: usize,
}

impl ParkingService {
    /// Create a service billing with `rate`.
    pub fn new(store: Box<dyn SessionStore>, rate: RateSpec) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            rate,
            recent_exits_limit: DEFAULT_RECENT_EXITS,
        }
    }

    pub fn with_recent_exits_limit(mut self, limit: usize) -> Self {
        self.recent_exits_limit = limit;
        self
    }

    pub fn rate(&self) -> RateSpec {
        self.rate
    }

    /// Backend description, e.g. `json:/home/op/.parkmeter/sessions.json`.
    pub async fn describe_store(&self) -> String {
        self.store.lock().await.describe()
    }

    /// All sessions in insertion order.
    pub async fn sessions(&self) -> Result<Vec<ParkingSession>, ParkingError> {
        self.store.lock().await.load_all()
    }

    /// Log a vehicle entering now.
    pub async fn enter(&self, plate: &str) -> Result<ParkingSession, ParkingError> {
        self.enter_at(plate, Utc::now()).await
    }

    /// Log a vehicle entering at `now`.
    #[instrument(skip(self))]
    pub async fn enter_at(
        &self,
        plate: &str,
        now: DateTime<Utc>,
    ) -> Result<ParkingSession, ParkingError> {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let result = {
            let mut store = self.store.lock().await;
            store.load_all().and_then(|sessions| {
                let session = open_session(&sessions, plate, now)?;
                store.upsert(&session)?;
                Ok(session)
            })
        };

        match &result {
            Ok(session) => {
                info!(plate = %session.plate_number(), id = %session.id(), "Vehicle entered");
                #[cfg(feature = "telemetry")]
                GLOBAL_METRICS.record_entry();
            }
            Err(e) => note_rejection("enter", e),
        }

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("parking.enter", start.elapsed());

        result
    }

    /// Exit the open session for a plate now.
    pub async fn exit(&self, plate: &str) -> Result<Receipt, ParkingError> {
        self.exit_at(plate, Utc::now()).await
    }

    /// Exit the open session for a plate at `now`.
    #[instrument(skip(self))]
    pub async fn exit_at(&self, plate: &str, now: DateTime<Utc>) -> Result<Receipt, ParkingError> {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let result = {
            let mut store = self.store.lock().await;
            store.load_all().and_then(|sessions| {
                let open = find_open_session(&sessions, plate)?;
                let closed = close_session(open, &self.rate, now)?;
                self.commit_exit(&mut **store, closed)
            })
        };

        self.finish_exit("exit", &result);

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("parking.exit", start.elapsed());

        result
    }

    /// Exit a specific session now.
    pub async fn exit_session(&self, id: &SessionId) -> Result<Receipt, ParkingError> {
        self.exit_session_at(id, Utc::now()).await
    }

    /// Exit a specific session at `now`.
    ///
    /// A session that already exited keeps its original exit time and payment.
    #[instrument(skip(self))]
    pub async fn exit_session_at(
        &self,
        id: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<Receipt, ParkingError> {
        let result = {
            let mut store = self.store.lock().await;
            store.load_all().and_then(|sessions| {
                let session =
                    find_session(&sessions, id).ok_or_else(|| ParkingError::SessionNotFound {
                        id: id.to_string(),
                    })?;
                let closed = close_session(session, &self.rate, now)?;
                self.commit_exit(&mut **store, closed)
            })
        };

        self.finish_exit("exit_session", &result);
        result
    }

    fn commit_exit(
        &self,
        store: &mut dyn SessionStore,
        closed: ParkingSession,
    ) -> Result<Receipt, ParkingError> {
        store.upsert(&closed)?;
        Receipt::for_session(&closed, self.rate)
            .ok_or_else(|| ParkingError::corrupt(format!("session {} did not close", closed.id())))
    }

    fn finish_exit(&self, op: &str, result: &Result<Receipt, ParkingError>) {
        match result {
            Ok(receipt) => {
                info!(
                    plate = %receipt.plate_number,
                    payment = %receipt.payment,
                    receipt = %receipt.receipt_id,
                    "Vehicle exited"
                );
                #[cfg(feature = "telemetry")]
                GLOBAL_METRICS.record_exit(receipt.payment);
            }
            Err(e) => note_rejection(op, e),
        }
    }

    /// Look up the open session for a plate, with live values now.
    pub async fn search(&self, plate: &str) -> Result<ParkedVehicle, ParkingError> {
        self.search_at(plate, Utc::now()).await
    }

    /// Look up the open session for a plate, with live values at `now`.
    pub async fn search_at(
        &self,
        plate: &str,
        now: DateTime<Utc>,
    ) -> Result<ParkedVehicle, ParkingError> {
        let sessions = self.sessions().await?;
        let session = find_open_session(&sessions, plate)?;
        Ok(ParkedVehicle::at(session, &self.rate, now))
    }

    /// Build the dashboard now.
    pub async fn dashboard(&self) -> Result<Dashboard, ParkingError> {
        self.dashboard_at(Utc::now()).await
    }

    /// Build the dashboard at `now`.
    pub async fn dashboard_at(&self, now: DateTime<Utc>) -> Result<Dashboard, ParkingError> {
        let sessions = self.sessions().await?;
        Ok(Dashboard {
            stats: ParkingStats::from_sessions(&sessions),
            rate: self.rate,
            parked: sessions
                .iter()
                .filter(|s| s.is_open())
                .map(|s| ParkedVehicle::at(s, &self.rate, now))
                .collect(),
            recent_exits: recent_exits(&sessions, self.recent_exits_limit)
                .into_iter()
                .cloned()
                .collect(),
            generated_at: now,
        })
    }

    /// Closed sessions, most recent exit first.
    pub async fn history(&self, limit: usize) -> Result<Vec<ParkingSession>, ParkingError> {
        let sessions = self.sessions().await?;
        Ok(recent_exits(&sessions, limit).into_iter().cloned().collect())
    }
}

fn note_rejection(op: &str, err: &ParkingError) {
    if err.is_user_correctable() {
        warn!(op, error = %err, "Parking operation rejected");
    } else {
        warn!(op, error = %err, "Parking operation failed");
    }
    #[cfg(feature = "telemetry")]
    GLOBAL_METRICS.record_rejection();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parking::store::{MemoryStore, MockSessionStore};
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    fn service(rate: RateSpec) -> ParkingService {
        ParkingService::new(Box::new(MemoryStore::new()), rate)
    }

    #[tokio::test]
    async fn test_entry_then_exit_hourly() {
        let svc = service(RateSpec::HOURLY);
        let entered = svc.enter_at("ABC-123", at(10, 0)).await.unwrap();
        assert!(entered.is_open());

        let receipt = svc.exit_at("abc-123", at(11, 15)).await.unwrap();
        assert_eq!(receipt.payment, Money::from_cents(1000));
        assert_eq!(receipt.plate_number.as_str(), "ABC-123");

        let sessions = svc.sessions().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].exit_time(), Some(at(11, 15)));
    }

    #[tokio::test]
    async fn test_half_hour_minimum() {
        let svc = service(RateSpec::HALF_HOUR);
        svc.enter_at("ABC-123", at(10, 0)).await.unwrap();
        let receipt = svc.exit_at("ABC-123", at(10, 20)).await.unwrap();
        assert_eq!(receipt.payment, Money::from_cents(50));
    }

    #[tokio::test]
    async fn test_duplicate_entry_rejected() {
        let svc = service(RateSpec::HOURLY);
        svc.enter_at("ABC-123", at(10, 0)).await.unwrap();
        let err = svc.enter_at("abc-123", at(10, 5)).await.unwrap_err();
        assert!(matches!(err, ParkingError::DuplicateEntry { .. }));
        assert_eq!(svc.sessions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_plate_rejected() {
        let svc = service(RateSpec::HOURLY);
        let err = svc.enter_at("   ", at(10, 0)).await.unwrap_err();
        assert!(matches!(err, ParkingError::Validation(_)));
    }

    #[tokio::test]
    async fn test_exit_unknown_plate_not_found() {
        let svc = service(RateSpec::HOURLY);
        let err = svc.exit_at("NOPE", at(10, 0)).await.unwrap_err();
        assert!(matches!(err, ParkingError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_exit_session_twice_already_closed() {
        let svc = service(RateSpec::HOURLY);
        let entered = svc.enter_at("ABC-123", at(10, 0)).await.unwrap();
        let first = svc.exit_session_at(entered.id(), at(11, 15)).await.unwrap();

        let err = svc.exit_session_at(entered.id(), at(14, 0)).await.unwrap_err();
        assert!(matches!(err, ParkingError::AlreadyClosed { .. }));

        let sessions = svc.sessions().await.unwrap();
        assert_eq!(sessions[0].exit_time(), Some(first.exit_time));
        assert_eq!(sessions[0].payment(), Some(first.payment));
    }

    #[tokio::test]
    async fn test_exit_session_unknown_id() {
        let svc = service(RateSpec::HOURLY);
        let err = svc
            .exit_session_at(&SessionId::from("missing"), at(10, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ParkingError::SessionNotFound { ref id } if id == "missing"));
    }

    #[tokio::test]
    async fn test_search_reports_live_values() {
        let svc = service(RateSpec::HALF_HOUR);
        svc.enter_at("ABC-123", at(10, 0)).await.unwrap();

        let found = svc.search_at("abc-123", at(10, 45)).await.unwrap();
        assert_eq!(found.duration, LiveDuration { hours: 0, minutes: 45 });
        assert_eq!(found.estimated_fee, Money::from_cents(100));

        assert!(matches!(
            svc.search_at("XYZ", at(10, 45)).await,
            Err(ParkingError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_dashboard() {
        let svc = service(RateSpec::HOURLY).with_recent_exits_limit(2);
        for plate in ["A", "B", "C", "D"] {
            svc.enter_at(plate, at(9, 0)).await.unwrap();
        }
        svc.exit_at("A", at(10, 0)).await.unwrap();
        svc.exit_at("B", at(11, 30)).await.unwrap();
        svc.exit_at("C", at(10, 30)).await.unwrap();

        let dash = svc.dashboard_at(at(12, 0)).await.unwrap();
        assert_eq!(dash.stats.currently_parked, 1);
        assert_eq!(dash.stats.completed, 3);
        // 1h + 3h + 2h at $5
        assert_eq!(dash.stats.total_revenue, Money::from_cents(3000));
        assert_eq!(dash.parked.len(), 1);
        assert_eq!(dash.parked[0].estimated_fee, Money::from_cents(1500));
        assert_eq!(dash.recent_exits.len(), 2);
        assert_eq!(dash.recent_exits[0].plate_number().as_str(), "B");
        assert_eq!(dash.recent_exits[1].plate_number().as_str(), "C");
    }

    #[tokio::test]
    async fn test_concurrent_entries_single_winner() {
        let svc = Arc::new(service(RateSpec::HOURLY));
        let mut handles = Vec::new();
        for i in 0..16 {
            let svc = Arc::clone(&svc);
            let plate = if i % 2 == 0 { "abc-123" } else { "ABC-123" };
            handles.push(tokio::spawn(async move { svc.enter_at(plate, at(10, 0)).await }));
        }

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert!(matches!(e, ParkingError::DuplicateEntry { .. })),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(svc.sessions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_exits_single_winner() {
        let svc = Arc::new(service(RateSpec::HOURLY));
        let entered = svc.enter_at("ABC-123", at(10, 0)).await.unwrap();

        let mut handles = Vec::new();
        for minute in 0..8u32 {
            let svc = Arc::clone(&svc);
            let id = entered.id().clone();
            handles.push(tokio::spawn(async move {
                svc.exit_session_at(&id, at(11, minute)).await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert!(matches!(e, ParkingError::AlreadyClosed { .. })),
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn test_corrupt_store_surfaces() {
        let svc = ParkingService::new(
            Box::new(MemoryStore::from_raw("garbage")),
            RateSpec::HOURLY,
        );
        assert!(matches!(
            svc.enter_at("ABC", at(10, 0)).await,
            Err(ParkingError::CorruptStore(_))
        ));
        assert!(matches!(svc.dashboard_at(at(10, 0)).await, Err(ParkingError::CorruptStore(_))));
    }

    #[tokio::test]
    async fn test_store_write_failure_propagates() {
        let mut mock = MockSessionStore::new();
        mock.expect_load_all().returning(|| Ok(Vec::new()));
        mock.expect_upsert()
            .times(1)
            .returning(|_| Err(ParkingError::Io("disk full".to_string())));

        let svc = ParkingService::new(Box::new(mock), RateSpec::HOURLY);
        let err = svc.enter_at("ABC-123", at(10, 0)).await.unwrap_err();
        assert!(matches!(err, ParkingError::Io(_)));
        assert!(!err.is_user_correctable());
    }

    #[tokio::test]
    async fn test_rejected_entry_never_writes() {
        let existing = open_session(&[], "ABC-123", at(9, 0)).unwrap();
        let mut mock = MockSessionStore::new();
        mock.expect_load_all()
            .returning(move || Ok(vec![existing.clone()]));
        mock.expect_upsert().never();

        let svc = ParkingService::new(Box::new(mock), RateSpec::HOURLY);
        let err = svc.enter_at("abc-123", at(10, 0)).await.unwrap_err();
        assert!(matches!(err, ParkingError::DuplicateEntry { .. }));
    }

    #[tokio::test]
    async fn test_padded_legacy_plate_is_found_and_blocks_reentry() {
        let svc = ParkingService::new(
            Box::new(MemoryStore::from_raw(
                r#"[{"id": 1704103200000, "plateNumber": "abc-123 ", "entryTime": "2024-01-01T10:00:00.000Z", "exitTime": null, "payment": null}]"#,
            )),
            RateSpec::HOURLY,
        );

        let err = svc.enter_at("abc-123", at(10, 30)).await.unwrap_err();
        assert!(matches!(err, ParkingError::DuplicateEntry { .. }));

        let receipt = svc.exit_at("ABC-123", at(11, 0)).await.unwrap();
        assert_eq!(receipt.plate_number.as_str(), "ABC-123");

        let sessions = svc.sessions().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert!(sessions.iter().all(|s| !s.is_open()));
    }
}
