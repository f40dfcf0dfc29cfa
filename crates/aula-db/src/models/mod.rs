//! Source-platform row models and their queries.

pub mod course_module;
pub mod enrolment;
pub mod person;
pub mod settings;
pub mod training_group;

pub use course_module::{CourseModule, SubSpecialty};
pub use enrolment::EnrolmentRequest;
pub use person::Person;
pub use settings::PlatformSetting;
pub use training_group::TrainingGroup;
