//! Discount coupons: the redemption-counting entity, the snapshot copied
//! onto orders, and the read-only validator.

mod coupon;
mod validate;

pub use coupon::{Coupon, CouponSnapshot};
pub use validate::{validate_coupon, CouponRejection};
