//! Payment gateway seam.
//!
//! The gateway is an opaque external service: the core asks it to initiate
//! a charge and later receives a verdict, synchronously or through a
//! callback that may arrive zero, one, or many times. Services call
//! `initiate_charge` before entering a store transaction, never while
//! holding the lock.

use cellar_commerce::checkout::Order;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result of initiating a charge with the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChargeInit {
    /// The gateway's reference for this charge.
    pub gateway_reference: String,
    /// Where to send the buyer to complete payment, if the gateway uses one.
    pub redirect_url: Option<String>,
}

/// Verdict carried by a gateway callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayVerdict {
    /// Charge approved.
    Approved,
    /// Charge declined.
    Declined,
}

/// Gateway failures. `Unreachable` is retryable; the order is left in its
/// prior state with no partial mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Could not reach the gateway.
    #[error("Payment gateway unreachable: {0}")]
    Unreachable(String),
    /// The gateway refused to open the charge.
    #[error("Payment gateway refused the charge: {0}")]
    Refused(String),
}

impl GatewayError {
    /// Whether the caller may simply retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Unreachable(_))
    }
}

/// External payment gateway.
pub trait PaymentGateway: Send + Sync {
    /// Ask the gateway to open a charge for the order's final amount.
    fn initiate_charge(&self, order: &Order) -> Result<ChargeInit, GatewayError>;
}
