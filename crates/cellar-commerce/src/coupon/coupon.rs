//! Coupon types.

use crate::ids::{CouponId, CourseId};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// A discount coupon.
///
/// The live record counts redemptions and carries eligibility rules. Orders
/// never reference it directly; they carry a [`CouponSnapshot`] taken at
/// validation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coupon {
    /// Unique coupon identifier.
    pub id: CouponId,
    /// Redemption code (e.g., "MALBEC20").
    pub code: String,
    /// Percentage off, 1-100.
    pub discount_percent: u8,
    /// Maximum number of redemptions.
    pub max_uses: u32,
    /// Redemptions so far. Never exceeds `max_uses`.
    pub current_uses: u32,
    /// Start of validity window (None = immediately valid).
    pub valid_from: Option<i64>,
    /// End of validity window (None = never expires).
    pub expires_at: Option<i64>,
    /// Single-user binding, compared case-insensitively.
    pub restricted_to_email: Option<String>,
    /// Single-course binding.
    pub restricted_to_course: Option<CourseId>,
    /// Minimum pre-discount purchase amount, in USD cents.
    pub min_purchase_usd: Option<Money>,
    /// Whether the coupon is enabled.
    pub is_active: bool,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Coupon {
    /// Create a new active coupon. The percentage is clamped into 1-100.
    pub fn new(code: impl Into<String>, discount_percent: u8, max_uses: u32) -> Self {
        let now = current_timestamp();
        Self {
            id: CouponId::generate(),
            code: code.into(),
            discount_percent: discount_percent.clamp(1, 100),
            max_uses,
            current_uses: 0,
            valid_from: None,
            expires_at: None,
            restricted_to_email: None,
            restricted_to_course: None,
            min_purchase_usd: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Restrict to a single buyer email.
    pub fn restricted_to_email(mut self, email: impl Into<String>) -> Self {
        self.restricted_to_email = Some(email.into());
        self
    }

    /// Restrict to a single course.
    pub fn restricted_to_course(mut self, course: CourseId) -> Self {
        self.restricted_to_course = Some(course);
        self
    }

    /// Require a minimum pre-discount purchase, in USD.
    pub fn with_minimum_purchase(mut self, amount: Money) -> Self {
        self.min_purchase_usd = Some(amount);
        self
    }

    /// Set the validity window start.
    pub fn valid_from(mut self, timestamp: i64) -> Self {
        self.valid_from = Some(timestamp);
        self
    }

    /// Set the expiration date.
    pub fn expires_at(mut self, timestamp: i64) -> Self {
        self.expires_at = Some(timestamp);
        self
    }

    /// Redemptions still available.
    pub fn remaining_uses(&self) -> u32 {
        self.max_uses.saturating_sub(self.current_uses)
    }

    /// Check if every redemption has been used.
    pub fn is_exhausted(&self) -> bool {
        self.current_uses >= self.max_uses
    }

    /// Check if the validity window has not opened yet.
    pub fn is_not_yet_valid(&self, now: i64) -> bool {
        self.valid_from.map(|from| now < from).unwrap_or(false)
    }

    /// Check if the validity window has closed.
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.map(|ends| now > ends).unwrap_or(false)
    }

    /// Redeem one use if any remain.
    ///
    /// Compare-and-increment in one step: returns false without mutating
    /// when the coupon is exhausted, so `current_uses` can never pass
    /// `max_uses`. Callers must hold whatever lock guards this record.
    pub fn try_redeem(&mut self) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.current_uses += 1;
        self.updated_at = current_timestamp();
        true
    }

    /// Take the snapshot that gets persisted on an order.
    pub fn snapshot(&self) -> CouponSnapshot {
        CouponSnapshot {
            coupon_id: self.id.clone(),
            code: self.code.clone(),
            discount_percent: self.discount_percent,
        }
    }
}

/// Discount terms copied onto an order at validation time.
///
/// Deliberately denormalized: later edits, deactivation, or deletion of the
/// live [`Coupon`] must not rewrite historical order pricing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CouponSnapshot {
    /// The coupon this was taken from.
    pub coupon_id: CouponId,
    /// The code as redeemed.
    pub code: String,
    /// Percentage off at redemption time.
    pub discount_percent: u8,
}

/// Get current Unix timestamp.
fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    #[test]
    fn test_coupon_remaining_uses() {
        let mut coupon = Coupon::new("MALBEC20", 20, 5);
        assert_eq!(coupon.remaining_uses(), 5);
        assert!(!coupon.is_exhausted());

        coupon.current_uses = 5;
        assert_eq!(coupon.remaining_uses(), 0);
        assert!(coupon.is_exhausted());
    }

    #[test]
    fn test_coupon_validity_window() {
        let coupon = Coupon::new("TANNAT10", 10, 100)
            .valid_from(1000)
            .expires_at(2000);

        assert!(coupon.is_not_yet_valid(999));
        assert!(!coupon.is_not_yet_valid(1000));
        assert!(!coupon.is_expired(2000));
        assert!(coupon.is_expired(2001));
    }

    #[test]
    fn test_try_redeem_stops_at_limit() {
        let mut coupon = Coupon::new("MALBEC20", 20, 2);
        assert!(coupon.try_redeem());
        assert!(coupon.try_redeem());
        assert!(!coupon.try_redeem());
        assert_eq!(coupon.current_uses, 2);
    }

    #[test]
    fn test_discount_percent_clamped() {
        assert_eq!(Coupon::new("OVERSHOOT", 150, 5).discount_percent, 100);
        assert_eq!(Coupon::new("NOTHING", 0, 5).discount_percent, 1);
    }

    #[test]
    fn test_snapshot_survives_mutation() {
        let mut coupon = Coupon::new("MALBEC20", 20, 5);
        let snapshot = coupon.snapshot();

        coupon.discount_percent = 5;
        coupon.is_active = false;

        assert_eq!(snapshot.discount_percent, 20);
        assert_eq!(snapshot.code, "MALBEC20");
    }

    #[test]
    fn test_builder_restrictions() {
        let coupon = Coupon::new("VIP50", 50, 1)
            .restricted_to_email("sommelier@example.com")
            .with_minimum_purchase(Money::new(10000, Currency::USD));

        assert_eq!(
            coupon.restricted_to_email.as_deref(),
            Some("sommelier@example.com")
        );
        assert_eq!(coupon.min_purchase_usd.unwrap().amount_cents, 10000);
    }
}
