//! Domain error types.
//!
//! Business refusals carry their own typed enums next to the logic that
//! produces them ([`CouponRejection`], [`BlockReason`]); this module holds
//! the one error shared across the order lifecycle.
//!
//! [`CouponRejection`]: crate::coupon::CouponRejection
//! [`BlockReason`]: crate::checkout::BlockReason

use thiserror::Error;

/// An order state change that is not an edge of the lifecycle graph.
///
/// Surfacing this means a caller raced another transition or asked for a
/// move the graph forbids; nothing was mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid order transition from {from} on {event}")]
pub struct TransitionError {
    /// Status the order was in when the event arrived.
    pub from: String,
    /// The rejected event.
    pub event: String,
}
