//! Strongly Typed Identifiers
//!
//! Newtype wrappers around the `bigint` keys used by both platforms.
//! They prevent accidental misuse of different ID types at compile time:
//! an `AccountId` cannot be passed where a `CourseId` is expected.
//!
//! # Example
//!
//! ```
//! use aula_core::{AccountId, CourseId};
//!
//! let course = CourseId::new(42);
//! let account = AccountId::new(7);
//!
//! fn requires_course(id: CourseId) -> String {
//!     id.to_string()
//! }
//!
//! let result = requires_course(course);
//! // requires_course(account); // This would not compile!
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Macro to define a strongly-typed ID type backed by `i64`.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            Serialize, Deserialize, sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw platform key.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the underlying key.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }
    };
}

define_id! {
    /// An LMS course identifier.
    CourseId
}

define_id! {
    /// An LMS course-category identifier.
    CategoryId
}

define_id! {
    /// An LMS user-account identifier.
    AccountId
}

define_id! {
    /// An LMS user-enrolment identifier.
    EnrolmentId
}

impl CourseId {
    /// The LMS front-page pseudo-course. Activity logged against it is
    /// site-level, never course time.
    pub const SITE: CourseId = CourseId(1);

    /// Whether this id denotes a real course rather than the site itself.
    #[must_use]
    pub fn is_course(self) -> bool {
        self != Self::SITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_raw_key() {
        assert_eq!(CourseId::new(42).to_string(), "42");
        assert_eq!(AccountId::new(7).to_string(), "7");
    }

    #[test]
    fn test_round_trip_through_i64() {
        let id = EnrolmentId::from(99);
        assert_eq!(i64::from(id), 99);
        assert_eq!(id.get(), 99);
    }

    #[test]
    fn test_site_course_sentinel() {
        assert!(!CourseId::SITE.is_course());
        assert!(CourseId::new(2).is_course());
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&CategoryId::new(5)).unwrap();
        assert_eq!(json, "5");
        let back: CategoryId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CategoryId::new(5));
    }

    #[test]
    fn test_ordering_follows_keys() {
        let mut ids = vec![CourseId::new(9), CourseId::new(2), CourseId::new(5)];
        ids.sort();
        assert_eq!(ids, vec![CourseId::new(2), CourseId::new(5), CourseId::new(9)]);
    }
}
