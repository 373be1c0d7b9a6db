//! Course marketplace domain types and checkout logic for Cellar.
//!
//! This crate holds the pure half of the order/checkout core:
//!
//! - **Catalog**: courses, lifecycle statuses, the enrollment-open policy
//! - **Coupon**: the redemption-counting entity, order snapshots, and the
//!   read-only validator
//! - **Checkout**: eligibility gate, two-ledger pricing, and the order
//!   lifecycle as an explicit transition table
//!
//! Everything here is side-effect free; persistence, atomicity, and the
//! payment gateway live in `cellar-checkout`.
//!
//! # Example
//!
//! ```rust
//! use cellar_commerce::prelude::*;
//!
//! let course = Course::new("intro-tasting", "Introduction to Wine Tasting", 30000, 1200000)
//!     .with_status(CourseStatus::Enrolling);
//!
//! let coupon = Coupon::new("MALBEC20", 20, 10);
//! let snapshot = validate_coupon(
//!     Some(&coupon),
//!     &course.id,
//!     "buyer@example.com",
//!     course.price_usd,
//!     1_700_000_000,
//! )
//! .unwrap();
//!
//! let quote = PriceBreakdown::quote(&course, Some(&snapshot), Currency::USD);
//! assert_eq!(quote.final_amount.amount_cents, 24000);
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod catalog;
pub mod checkout;
pub mod coupon;

pub use error::TransitionError;
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::TransitionError;
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Catalog
    pub use crate::catalog::{Course, CourseStatus, EnrollmentPolicy};

    // Coupon
    pub use crate::coupon::{validate_coupon, Coupon, CouponRejection, CouponSnapshot};

    // Checkout
    pub use crate::checkout::{
        check_eligibility, BlockReason, CheckoutContext, EligibilityFacts, Enrollment, Order,
        OrderEvent, OrderStatus, PaymentMethod, PriceBreakdown,
    };
}
