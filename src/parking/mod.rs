// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Parking sessions: lifecycle, billing, and persistence.
//!
//! - **Types**: ParkingSession, PlateNumber, Money, LiveDuration
//! - **Billing**: fee and duration arithmetic, open/closed queries
//! - **Storage**: the `SessionStore` trait with memory, JSON file, and SQLite backends
//! - **Service**: entry, exit, search, and dashboard flows
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   ParkingService                     │
//! │   (enter, exit, exit_session, search, dashboard)     │
//! └──────────────────────────────────────────────────────┘
//!                  │                      │
//!                  ▼                      ▼
//!        ┌──────────────────┐   ┌──────────────────────┐
//!        │  billing (pure)  │   │  dyn SessionStore    │
//!        │  fees, durations │   │ memory / json / sqlite│
//!        └──────────────────┘   └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use parkmeter::parking::{JsonFileStore, ParkingService, RateSpec};
//!
//! let service = ParkingService::new(
//!     Box::new(JsonFileStore::new("sessions.json")),
//!     RateSpec::HOURLY,
//! );
//! service.enter("ABC-123").await?;
//! let receipt = service.exit("abc-123").await?;
//! println!("{}", receipt.render_text("$"));
//! ```

pub mod billing;
pub mod json_store;
pub mod receipt;
pub mod service;
pub mod sqlite_store;
pub mod store;
pub mod types;

pub use billing::{
    billable_minutes, close_session, compute_fee, compute_live_duration, find_open_session,
    find_session, is_plate_currently_parked, live_fee, open_session, recent_exits,
    validate_sessions, ParkingStats, RateSpec,
};
pub use json_store::JsonFileStore;
pub use receipt::{generate_receipt_id, Receipt};
pub use service::{Dashboard, ParkedVehicle, ParkingService, DEFAULT_RECENT_EXITS};
pub use sqlite_store::{SqliteStore, SESSIONS_KEY};
pub use store::{decode_sessions, encode_sessions, MemoryStore, SessionStore};
pub use types::{LiveDuration, Money, ParkingSession, PlateNumber, SessionId, SessionStatus};
