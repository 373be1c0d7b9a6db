//! Course types.

use crate::ids::CourseId;
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Course lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CourseStatus {
    /// Being prepared, not visible for sale.
    #[default]
    Draft,
    /// Publicly announced, enrollment may open soon.
    Announced,
    /// Actively accepting enrollments.
    Enrolling,
    /// Capacity reached.
    Full,
    /// Classes underway.
    InProgress,
    /// Course concluded.
    Finished,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Draft => "draft",
            CourseStatus::Announced => "announced",
            CourseStatus::Enrolling => "enrolling",
            CourseStatus::Full => "full",
            CourseStatus::InProgress => "in_progress",
            CourseStatus::Finished => "finished",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CourseStatus::Draft => "Draft",
            CourseStatus::Announced => "Announced",
            CourseStatus::Enrolling => "Enrolling",
            CourseStatus::Full => "Full",
            CourseStatus::InProgress => "In Progress",
            CourseStatus::Finished => "Finished",
        }
    }
}

/// A sellable course.
///
/// Prices are two independent ledgers: `price_usd` and `price_uyu` are both
/// list prices, not FX-linked views of one another.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Course {
    /// Unique course identifier.
    pub id: CourseId,
    /// URL-friendly identifier.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// List price in USD cents.
    pub price_usd: Money,
    /// List price in UYU cents.
    pub price_uyu: Money,
    /// Maximum seats (None = unlimited).
    pub max_capacity: Option<u32>,
    /// Last moment enrollment is accepted (None = no deadline).
    pub enrollment_deadline: Option<i64>,
    /// Lifecycle status.
    pub status: CourseStatus,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Course {
    /// Create a new course in draft status.
    pub fn new(
        slug: impl Into<String>,
        title: impl Into<String>,
        price_usd_cents: i64,
        price_uyu_cents: i64,
    ) -> Self {
        let now = current_timestamp();
        Self {
            id: CourseId::generate(),
            slug: slug.into(),
            title: title.into(),
            price_usd: Money::new(price_usd_cents, Currency::USD),
            price_uyu: Money::new(price_uyu_cents, Currency::UYU),
            max_capacity: None,
            enrollment_deadline: None,
            status: CourseStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the seat limit.
    pub fn with_capacity(mut self, seats: u32) -> Self {
        self.max_capacity = Some(seats);
        self
    }

    /// Set the enrollment deadline.
    pub fn with_deadline(mut self, deadline: i64) -> Self {
        self.enrollment_deadline = Some(deadline);
        self
    }

    /// Set the lifecycle status.
    pub fn with_status(mut self, status: CourseStatus) -> Self {
        self.status = status;
        self
    }

    /// Get the list price for a ledger currency.
    pub fn price_in(&self, currency: Currency) -> Money {
        match currency {
            Currency::USD => self.price_usd,
            Currency::UYU => self.price_uyu,
        }
    }

    /// Check if the enrollment deadline has passed.
    pub fn deadline_passed(&self, now: i64) -> bool {
        self.enrollment_deadline
            .map(|deadline| now > deadline)
            .unwrap_or(false)
    }

    /// Check if a confirmed-enrollment count fills the course.
    pub fn at_capacity(&self, confirmed_enrollments: u32) -> bool {
        self.max_capacity
            .map(|cap| confirmed_enrollments >= cap)
            .unwrap_or(false)
    }
}

/// Get current Unix timestamp.
fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
