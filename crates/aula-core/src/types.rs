//! Domain enums shared by the source-platform and LMS crates.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// LMS role assigned by an enrolment.
///
/// The numeric values are the LMS role-table keys and are part of the
/// platform contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Course participant.
    Student,
    /// Editing teacher.
    Teacher,
    /// Platform administrator.
    Admin,
}

impl Role {
    /// The LMS role id for this role.
    #[must_use]
    pub const fn id(self) -> i64 {
        match self {
            Role::Student => 5,
            Role::Teacher => 3,
            Role::Admin => 1,
        }
    }

    /// Maps an LMS role id back onto a known role.
    #[must_use]
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            5 => Some(Role::Student),
            3 => Some(Role::Teacher),
            1 => Some(Role::Admin),
            _ => None,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Teacher => write!(f, "teacher"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Day-part bucket used by the usage statistics.
///
/// Derived from the hour of day an event was logged: 07-14 is morning,
/// 15-22 is afternoon, the rest is night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Turn {
    Morning,
    Afternoon,
    Night,
}

impl Turn {
    /// Buckets an hour of day (0-23).
    #[must_use]
    pub const fn from_hour(hour: u32) -> Self {
        match hour {
            7..=14 => Turn::Morning,
            15..=22 => Turn::Afternoon,
            _ => Turn::Night,
        }
    }

    /// The numeric wire value (0 morning, 1 afternoon, 2 night).
    #[must_use]
    pub const fn index(self) -> i64 {
        match self {
            Turn::Morning => 0,
            Turn::Afternoon => 1,
            Turn::Night => 2,
        }
    }

    /// The report-importer column this bucket feeds.
    #[must_use]
    pub const fn usage_column(self) -> &'static str {
        match self {
            Turn::Morning => "usage_morning_minutes",
            Turn::Afternoon => "usage_afternoon_minutes",
            Turn::Night => "usage_night_minutes",
        }
    }
}

impl Display for Turn {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// The enrolment categories reconciled against the LMS.
///
/// Each category is computed by its own pending query and writes its link
/// through its own column on its own source table; a student link and a
/// teacher link on the same person/course pair are independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrolmentKind {
    /// Student enrolled on a certificate-course specialty.
    CertificateStudent,
    /// Student enrolled on an ordinary group course.
    OrdinaryStudent,
    /// Teacher assigned to a certificate specialty.
    CertificateTeacher,
    /// Tutor of a training group.
    GroupTutor,
    /// Trainer responsible for a certificate specialty.
    SpecialtyTrainer,
    /// Trainer responsible for an ordinary group.
    GroupTrainer,
    /// Synthetic auxiliary account (proxy student/tutor/admin).
    Auxiliary,
}

impl EnrolmentKind {
    /// Stable tag used in logs and summaries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EnrolmentKind::CertificateStudent => "certificate-student",
            EnrolmentKind::OrdinaryStudent => "ordinary-student",
            EnrolmentKind::CertificateTeacher => "certificate-teacher",
            EnrolmentKind::GroupTutor => "group-tutor",
            EnrolmentKind::SpecialtyTrainer => "specialty-trainer",
            EnrolmentKind::GroupTrainer => "group-trainer",
            EnrolmentKind::Auxiliary => "auxiliary",
        }
    }

    /// Auxiliary enrolments are recorded as three-column rows in a dedicated
    /// table rather than a link-field update.
    #[must_use]
    pub const fn uses_proxy_table(self) -> bool {
        matches!(self, EnrolmentKind::Auxiliary)
    }
}

impl Display for EnrolmentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
