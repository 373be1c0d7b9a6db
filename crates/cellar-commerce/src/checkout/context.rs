//! Checkout read model for the presentation layer.

use crate::catalog::Course;
use crate::checkout::PriceBreakdown;
use crate::coupon::CouponSnapshot;
use crate::ids::CourseId;
use crate::money::Currency;
use serde::{Deserialize, Serialize};

/// Everything a checkout page needs to render: the course, the coupon as
/// applied (if any), and the priced terms in the chosen ledger currency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutContext {
    /// Course being purchased.
    pub course_id: CourseId,
    /// Course title for display.
    pub course_title: String,
    /// Ledger currency of this checkout.
    pub currency: Currency,
    /// Priced terms.
    pub pricing: PriceBreakdown,
    /// Applied coupon terms (None when no coupon).
    pub coupon: Option<CouponSnapshot>,
}

impl CheckoutContext {
    /// Build the context from a course and an optional validated coupon.
    pub fn build(course: &Course, coupon: Option<CouponSnapshot>, currency: Currency) -> Self {
        let pricing = PriceBreakdown::quote(course, coupon.as_ref(), currency);
        Self {
            course_id: course.id.clone(),
            course_title: course.title.clone(),
            currency,
            pricing,
            coupon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CourseStatus;
    use crate::coupon::Coupon;

    #[test]
    fn test_context_carries_coupon_and_pricing() {
        let course = Course::new("vinification", "Winemaking Basics", 30000, 1200000)
            .with_status(CourseStatus::Enrolling);
        let snapshot = Coupon::new("MALBEC20", 20, 10).snapshot();

        let ctx = CheckoutContext::build(&course, Some(snapshot), Currency::USD);
        assert_eq!(ctx.course_title, "Winemaking Basics");
        assert_eq!(ctx.pricing.final_amount.amount_cents, 24000);
        assert_eq!(ctx.coupon.as_ref().unwrap().code, "MALBEC20");
    }
}
