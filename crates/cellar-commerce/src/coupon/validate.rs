//! Read-only coupon validation.
//!
//! Validation never touches the usage counter: a checkout page may
//! re-validate the same code any number of times without consuming a use.
//! The counter moves only inside order finalization.

use crate::coupon::{Coupon, CouponSnapshot};
use crate::ids::CourseId;
use crate::money::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a coupon code was refused. Each check has its own variant so the
/// caller can tell the buyer exactly what went wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CouponRejection {
    /// No coupon with this code.
    #[error("Coupon code not found")]
    NotFound,
    /// Coupon exists but is disabled.
    #[error("Coupon is not active")]
    Inactive,
    /// Validity window has not opened.
    #[error("Coupon is not valid yet")]
    NotYetValid,
    /// Validity window has closed.
    #[error("Coupon has expired")]
    Expired,
    /// All redemptions used.
    #[error("Coupon usage limit reached")]
    Exhausted,
    /// Bound to a different buyer email.
    #[error("Coupon is reserved for another user")]
    EmailMismatch,
    /// Bound to a different course.
    #[error("Coupon does not apply to this course")]
    CourseMismatch,
    /// Purchase below the coupon's minimum.
    #[error("Purchase amount is below the coupon minimum")]
    BelowMinimum,
}

/// Validate a coupon lookup result against a purchase.
///
/// `purchase_usd` is the pre-discount amount in USD terms, whatever ledger
/// the order itself is placed in. Checks run in a fixed order; the first
/// failure wins.
pub fn validate_coupon(
    coupon: Option<&Coupon>,
    course_id: &CourseId,
    buyer_email: &str,
    purchase_usd: Money,
    now: i64,
) -> Result<CouponSnapshot, CouponRejection> {
    let coupon = coupon.ok_or(CouponRejection::NotFound)?;

    if !coupon.is_active {
        return Err(CouponRejection::Inactive);
    }
    if coupon.is_not_yet_valid(now) {
        return Err(CouponRejection::NotYetValid);
    }
    if coupon.is_expired(now) {
        return Err(CouponRejection::Expired);
    }
    if coupon.is_exhausted() {
        return Err(CouponRejection::Exhausted);
    }
    if let Some(email) = &coupon.restricted_to_email {
        if !email.eq_ignore_ascii_case(buyer_email) {
            return Err(CouponRejection::EmailMismatch);
        }
    }
    if let Some(course) = &coupon.restricted_to_course {
        if course != course_id {
            return Err(CouponRejection::CourseMismatch);
        }
    }
    if let Some(minimum) = &coupon.min_purchase_usd {
        if purchase_usd.amount_cents < minimum.amount_cents {
            return Err(CouponRejection::BelowMinimum);
        }
    }

    Ok(coupon.snapshot())
}
