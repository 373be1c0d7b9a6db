//! Checkout domain: eligibility gate, pricing, and the order lifecycle.

mod context;
mod eligibility;
mod order;
mod pricing;

pub use context::CheckoutContext;
pub use eligibility::{check_eligibility, BlockReason, EligibilityFacts};
pub use order::{
    Enrollment, Order, OrderEvent, OrderStatus, PaymentMethod,
};
pub use pricing::PriceBreakdown;
