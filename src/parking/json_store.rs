// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! JSON file session store.
//!
//! The collection lives in one JSON array. Saves use the write-rename
//! pattern: bytes go to `{path}.tmp`, are synced, and the temp file is renamed
//! over the target, so a reader sees either the old collection or the new one.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
#[cfg(feature = "telemetry")]
use std::time::Instant;

use tracing::{debug, warn};

use crate::error::ParkingError;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use super::store::{decode_sessions, encode_sessions, SessionStore};
use super::types::ParkingSession;

/// Session store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Use the file at `path`. It is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl SessionStore for JsonFileStore {
    fn load_all(&self) -> Result<Vec<ParkingSession>, ParkingError> {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No session file yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        let sessions = decode_sessions(&raw)?;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("store.json.load", start.elapsed());

        Ok(sessions)
    }

    fn save_all(&mut self, sessions: &[ParkingSession]) -> Result<(), ParkingError> {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let data = encode_sessions(sessions)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.tmp_path();
        let written = File::create(&tmp_path)
            .and_then(|mut file| {
                file.write_all(data.as_bytes())?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&tmp_path, &self.path));
        if let Err(e) = written {
            // Target is untouched; drop the partial temp file
            let _ = fs::remove_file(&tmp_path);
            warn!(path = %self.path.display(), error = %e, "Failed to save sessions");
            return Err(e.into());
        }

        debug!(path = %self.path.display(), count = sessions.len(), "Saved sessions");

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("store.json.save", start.elapsed());

        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parking::billing::{close_session, open_session, RateSpec};
    use chrono::{DateTime, TimeZone, Utc};
    use tempfile::TempDir;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = JsonFileStore::new(temp.path().join("sessions.json"));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_save_creates_parent_and_leaves_no_tmp() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("sessions.json");
        let mut store = JsonFileStore::new(&path);

        let open = open_session(&[], "ABC-123", at(10, 0)).unwrap();
        store.save_all(std::slice::from_ref(&open)).unwrap();

        assert!(path.exists());
        assert!(!store.tmp_path().exists());
        assert_eq!(store.load_all().unwrap(), vec![open]);
    }

    #[test]
    fn test_upsert_round_trip() {
        let temp = TempDir::new().unwrap();
        let mut store = JsonFileStore::new(temp.path().join("sessions.json"));

        let open = open_session(&[], "ABC-123", at(10, 0)).unwrap();
        store.upsert(&open).unwrap();
        let closed = close_session(&open, &RateSpec::HOURLY, at(11, 15)).unwrap();
        store.upsert(&closed).unwrap();

        let reopened = JsonFileStore::new(store.path());
        assert_eq!(reopened.load_all().unwrap(), vec![closed]);
    }

    #[test]
    fn test_corrupt_file_is_reported_and_kept() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sessions.json");
        fs::write(&path, "[{\"id\": ").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load_all(), Err(ParkingError::CorruptStore(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), "[{\"id\": ");
    }

    #[test]
    fn test_reads_legacy_records() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sessions.json");
        fs::write(
            &path,
            r#"[
                {"id": 1704103200000, "plateNumber": "ABC-123", "entryTime": "2024-01-01T10:00:00.000Z", "exitTime": null, "payment": null},
                {"id": 1704103300000, "plateNumber": "XYZ-9", "entryTime": "2024-01-01T10:00:00.000Z", "exitTime": "2024-01-01T11:15:00.000Z", "payment": 10}
            ]"#,
        )
        .unwrap();

        let sessions = JsonFileStore::new(&path).load_all().unwrap();
        assert_eq!(sessions.len(), 2);
        assert!(sessions[0].is_open());
        assert_eq!(sessions[1].payment().map(|p| p.cents()), Some(1000));
    }

    #[test]
    fn test_failed_save_removes_tmp() {
        let temp = TempDir::new().unwrap();
        // A directory in place of the file makes the final rename fail
        let path = temp.path().join("sessions.json");
        fs::create_dir(&path).unwrap();

        let mut store = JsonFileStore::new(&path);
        let session = open_session(&[], "ABC-123", at(10, 0)).unwrap();
        let err = store.save_all(&[session]).unwrap_err();

        assert!(matches!(err, ParkingError::Io(_)));
        assert!(!store.tmp_path().exists());
        assert!(path.is_dir());
    }
}
