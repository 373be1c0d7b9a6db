//! Checkout, order lifecycle, and reconciliation services for Cellar.
//!
//! This crate is the stateful half of the order/checkout core: it pairs the
//! pure domain logic from `cellar-commerce` with an in-memory transactional
//! store and the external seams (payment gateway, notification dispatch).
//!
//! Every state transition runs as one atomic unit against the store, which
//! is what keeps the invariants under concurrency: a coupon's last use goes
//! to exactly one buyer, the last seat in a course goes to exactly one
//! enrollment, and a replayed webhook confirms a payment exactly once.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cellar_checkout::{CheckoutService, LogSink, Store};
//! use cellar_checkout::gateway::{ChargeInit, GatewayError, PaymentGateway};
//! use cellar_commerce::prelude::*;
//!
//! struct Gateway;
//! impl PaymentGateway for Gateway {
//!     fn initiate_charge(&self, order: &Order) -> Result<ChargeInit, GatewayError> {
//!         Ok(ChargeInit {
//!             gateway_reference: format!("mp-{}", order.order_number),
//!             redirect_url: None,
//!         })
//!     }
//! }
//!
//! let store = Arc::new(Store::new());
//! let service = CheckoutService::new(store.clone(), Arc::new(Gateway), Arc::new(LogSink));
//!
//! let course = Course::new("intro-tasting", "Introduction to Wine Tasting", 30000, 1200000)
//!     .with_status(CourseStatus::Enrolling);
//! let course_id = course.id.clone();
//! store.put_course(course).unwrap();
//!
//! let begun = service
//!     .begin_checkout(
//!         &UserId::new("taster-1"),
//!         "buyer@example.com",
//!         &course_id,
//!         Currency::USD,
//!         PaymentMethod::BankTransfer,
//!         None,
//!     )
//!     .unwrap();
//! assert_eq!(begun.order.status, OrderStatus::PendingPayment);
//! ```

pub mod error;
pub mod gateway;
pub mod notify;
pub mod reconcile;
pub mod service;
pub mod store;

#[cfg(test)]
mod testkit;

pub use error::CheckoutError;
pub use gateway::{ChargeInit, GatewayError, GatewayVerdict, PaymentGateway};
pub use notify::{LogSink, NotificationEvent, NotificationSink, RecordingSink};
pub use service::{BeginCheckout, CheckoutService};
pub use store::{Store, StoreError};
