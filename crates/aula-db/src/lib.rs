//! Source-platform database access.
//!
//! The training-management platform is the system of record for groups,
//! modules, people and enrolments. This crate owns the read side (pending
//! rows, filtered by their NULL link fields) and the write side (persisting
//! the LMS link back onto each source row).
//!
//! All access goes through [`SourceStore`] so the engine can be exercised
//! against in-memory fakes; [`PgSourceStore`] is the production Postgres
//! implementation.

pub mod config;
pub mod error;
pub mod models;
pub mod store;

pub use config::SourceConfig;
pub use error::{StoreError, StoreResult};
pub use store::{PgSourceStore, SourceStore};
