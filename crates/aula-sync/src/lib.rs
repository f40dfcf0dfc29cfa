//! Synchronization engine.
//!
//! One-way, idempotent reconciliation from the training-management platform
//! into the LMS, plus statistics reporting back over HTTP. The engine walks
//! the entity types in dependency order — containers, people, enrolments —
//! creating what is missing on the LMS and persisting each new LMS id back
//! onto its source row, so repeated runs only process the delta.
//!
//! Entry point: [`run::SyncJob`].

pub mod config;
pub mod courses;
pub mod enrolments;
pub mod error;
pub mod persons;
pub mod report;
pub mod run;
pub mod summary;
pub mod usage;

#[cfg(test)]
pub(crate) mod testing;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use run::{RunSummary, SyncJob};
