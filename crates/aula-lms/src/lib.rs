//! Target-LMS collaborator interface.
//!
//! The LMS owns courses, categories, sections, accounts, enrolments and the
//! activity log. The sync engine only ever talks to it through the traits in
//! [`api`]; [`pg`] carries the Postgres implementation used in production.

pub mod api;
pub mod error;
pub mod models;
pub mod pg;

pub use api::{ActivityLog, LmsApi, SettingsStore};
pub use error::{LmsError, LmsResult};
pub use models::{
    CourseContext, EventAction, NewAccount, NewCategory, NewCourse, StatRow, UsageEvent,
};
pub use pg::PgLms;
