//! Enrollment-open policy.

use crate::catalog::CourseStatus;
use serde::{Deserialize, Serialize};

/// Which course statuses accept new checkouts.
///
/// The open set is deployment policy, not code: a site that sells waitlist
/// seats can include `Full`, one that only sells after launch can drop
/// `Announced`. Deserializable so it can come straight from configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrollmentPolicy {
    /// Statuses in which checkout may begin.
    pub open_statuses: Vec<CourseStatus>,
}

impl Default for EnrollmentPolicy {
    fn default() -> Self {
        Self {
            open_statuses: vec![CourseStatus::Enrolling, CourseStatus::Announced],
        }
    }
}

impl EnrollmentPolicy {
    /// Policy that only accepts checkouts while actively enrolling.
    pub fn enrolling_only() -> Self {
        Self {
            open_statuses: vec![CourseStatus::Enrolling],
        }
    }

    /// Check whether a course status is open for enrollment.
    pub fn is_open(&self, status: CourseStatus) -> bool {
        self.open_statuses.contains(&status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = EnrollmentPolicy::default();
        assert!(policy.is_open(CourseStatus::Enrolling));
        assert!(policy.is_open(CourseStatus::Announced));
        assert!(!policy.is_open(CourseStatus::Full));
        assert!(!policy.is_open(CourseStatus::Draft));
        assert!(!policy.is_open(CourseStatus::Finished));
    }

    #[test]
    fn test_enrolling_only_policy() {
        let policy = EnrollmentPolicy::enrolling_only();
        assert!(policy.is_open(CourseStatus::Enrolling));
        assert!(!policy.is_open(CourseStatus::Announced));
    }

    #[test]
    fn test_policy_from_config() {
        let policy: EnrollmentPolicy =
            serde_json::from_str(r#"{"open_statuses": ["Enrolling", "Full"]}"#).unwrap();
        assert!(policy.is_open(CourseStatus::Full));
        assert!(!policy.is_open(CourseStatus::Announced));
    }
}
