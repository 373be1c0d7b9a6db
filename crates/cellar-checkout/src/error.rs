//! Service error taxonomy.
//!
//! Every variant is a category the caller is expected to branch on:
//! expected business refusals (`Ineligible`, `Coupon`), race/programming
//! errors (`Transition`), integrity violations recovered by rerouting the
//! order (`CapacityExhausted`, `CouponOverrun`), and retryable external
//! failures (`Gateway`). Nothing here is thrown for expected conditions.

use crate::gateway::GatewayError;
use crate::store::StoreError;
use cellar_commerce::checkout::BlockReason;
use cellar_commerce::coupon::CouponRejection;
use cellar_commerce::error::TransitionError;
use thiserror::Error;

/// Errors returned by the checkout and reconciliation services.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// The user may not start checkout for this course.
    #[error(transparent)]
    Ineligible(#[from] BlockReason),

    /// The coupon code was refused.
    #[error(transparent)]
    Coupon(#[from] CouponRejection),

    /// The requested order move is not an edge of the lifecycle graph.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Capacity ran out between checkout and finalization; the order was
    /// rerouted to rejected instead of granting an overcapacity seat.
    #[error("Course capacity exhausted at finalization: {course_id}")]
    CapacityExhausted { course_id: String },

    /// The coupon's last use was taken between checkout and finalization;
    /// the order was rerouted to rejected.
    #[error("Coupon exhausted at finalization: {code}")]
    CouponOverrun { code: String },

    /// The operation requires a different payment method.
    #[error("Operation requires {required} payment method, order uses {actual}")]
    MethodMismatch { required: String, actual: String },

    /// Gateway failure; the order remains in its prior state.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Backing store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CheckoutError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckoutError::Gateway(e) if e.is_retryable())
    }
}
