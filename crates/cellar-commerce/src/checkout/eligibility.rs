//! Enrollment eligibility gate.
//!
//! Pure check with no side effects. It runs once when checkout starts and
//! the capacity portion runs again inside order finalization, which closes
//! the race between two buyers taking the last seat.

use crate::catalog::{Course, EnrollmentPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a user may not start checkout for a course.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockReason {
    /// User already holds an enrollment for this course.
    #[error("Already enrolled in this course")]
    AlreadyEnrolled,
    /// Every seat is taken.
    #[error("Course is full")]
    CourseFull,
    /// Course status is outside the policy's open set.
    #[error("Course is not open for enrollment")]
    CourseClosed,
    /// Enrollment deadline has passed.
    #[error("Enrollment deadline has passed")]
    DeadlinePassed,
}

/// The facts the gate evaluates, read from the store by the caller.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityFacts {
    /// Whether a non-cancelled enrollment exists for this (user, course).
    pub already_enrolled: bool,
    /// Confirmed enrollments counted against capacity.
    pub confirmed_enrollments: u32,
    /// Evaluation instant.
    pub now: i64,
}

/// Decide whether checkout may begin.
///
/// Checks run in a fixed order and the first match wins, so the buyer gets
/// the most informative reason: an already-enrolled user is told so even if
/// the course has meanwhile closed.
pub fn check_eligibility(
    course: &Course,
    policy: &EnrollmentPolicy,
    facts: EligibilityFacts,
) -> Result<(), BlockReason> {
    if facts.already_enrolled {
        return Err(BlockReason::AlreadyEnrolled);
    }
    if !policy.is_open(course.status) {
        return Err(BlockReason::CourseClosed);
    }
    if course.deadline_passed(facts.now) {
        return Err(BlockReason::DeadlinePassed);
    }
    if course.at_capacity(facts.confirmed_enrollments) {
        return Err(BlockReason::CourseFull);
    }
    Ok(())
}
