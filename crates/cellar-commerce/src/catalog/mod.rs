//! Course catalog types.

mod course;
mod policy;

pub use course::{Course, CourseStatus};
pub use policy::EnrollmentPolicy;
