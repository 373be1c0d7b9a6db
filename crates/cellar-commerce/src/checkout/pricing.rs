//! Checkout pricing.

use crate::catalog::Course;
use crate::coupon::CouponSnapshot;
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// The priced terms of a checkout, in one ledger currency.
///
/// USD and UYU are quoted independently: a coupon's percentage applies
/// uniformly to whichever ledger the order is placed in, and nothing here
/// reads the other ledger's price.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceBreakdown {
    /// List price in the order currency.
    pub original_price: Money,
    /// Percentage off (0 when no coupon).
    pub discount_percent: u8,
    /// `round(original * percent / 100)`.
    pub discount_amount: Money,
    /// `original - discount`, floored at zero.
    pub final_amount: Money,
}

impl PriceBreakdown {
    /// Quote a course in a ledger currency, with an optional validated coupon.
    pub fn quote(course: &Course, coupon: Option<&CouponSnapshot>, currency: Currency) -> Self {
        let original_price = course.price_in(currency);
        let discount_percent = coupon.map(|c| c.discount_percent).unwrap_or(0);
        let discount_amount = original_price.percentage(discount_percent);
        let final_amount = original_price
            .saturating_subtract(&discount_amount)
            .unwrap_or_else(|| Money::zero(currency));

        Self {
            original_price,
            discount_percent,
            discount_amount,
            final_amount,
        }
    }

    /// Whether this checkout owes nothing and must route down the free path.
    pub fn is_free(&self) -> bool {
        self.final_amount.is_zero()
    }
}
