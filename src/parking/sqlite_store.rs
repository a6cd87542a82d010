// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! SQLite key-value session store.
//!
//! The whole collection is one JSON value under a single key, the same shape
//! a browser's local storage would hold. Saves run in a transaction.

use std::path::{Path, PathBuf};
#[cfg(feature = "telemetry")]
use std::time::Instant;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::ParkingError;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use super::store::{decode_sessions, encode_sessions, SessionStore};
use super::types::ParkingSession;

/// Key holding the session collection.
pub const SESSIONS_KEY: &str = "parkingEntries";

/// Session store using a SQLite key-value table.
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    /// Open or create a store database at a specific path.
    pub fn open_at(db_path: &Path) -> Result<Self, ParkingError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self {
            conn,
            path: db_path.to_path_buf(),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, ParkingError> {
        let store = Self {
            conn: Connection::open_in_memory()?,
            path: PathBuf::from(":memory:"),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), ParkingError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Read a raw value.
    pub fn get(&self, key: &str) -> Result<Option<String>, ParkingError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    /// Write a raw value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ParkingError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO kv (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for SqliteStore {
    fn load_all(&self) -> Result<Vec<ParkingSession>, ParkingError> {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let sessions = match self.get(SESSIONS_KEY)? {
            Some(raw) => decode_sessions(&raw)?,
            None => Vec::new(),
        };

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("store.sqlite.load", start.elapsed());

        Ok(sessions)
    }

    fn save_all(&mut self, sessions: &[ParkingSession]) -> Result<(), ParkingError> {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let data = encode_sessions(sessions)?;
        self.set(SESSIONS_KEY, &data)?;
        debug!(path = %self.path.display(), count = sessions.len(), "Saved sessions");

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("store.sqlite.save", start.elapsed());

        Ok(())
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }
}
