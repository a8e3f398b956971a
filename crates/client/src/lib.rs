//! Manual-testing client for a WebSocket session-aggregation service.
//!
//! This crate intentionally exposes a small surface:
//! - OTP verification and WebSocket session bootstrap, per role
//! - a live connection handle with observable lifecycle phases
//! - a role-scoped, persisted log of sent messages with replay lookup

pub mod connection;
pub mod error;
pub mod history;
pub mod role;
pub mod session;
pub mod wire;
pub mod workbench;

pub use connection::Connection;
pub use error::{ClientError, Result};
pub use history::{HistoryDecode, HistoryStore};
pub use role::Role;
pub use session::{Bootstrapper, ConnectConfig, SessionCredentials, SessionPhase};
pub use wire::{MessageRecord, RegistrationExtras};
pub use workbench::Workbench;
