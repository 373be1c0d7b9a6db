//! Shared fixtures for the service tests.

use crate::gateway::{ChargeInit, GatewayError, PaymentGateway};
use crate::notify::RecordingSink;
use crate::service::CheckoutService;
use crate::store::Store;
use cellar_commerce::catalog::{Course, CourseStatus};
use cellar_commerce::checkout::Order;
use cellar_commerce::coupon::Coupon;
use cellar_commerce::ids::{CouponId, CourseId, UserId};
use std::sync::Arc;

/// Gateway that opens every charge.
struct ApproveAll;

impl PaymentGateway for ApproveAll {
    fn initiate_charge(&self, order: &Order) -> Result<ChargeInit, GatewayError> {
        Ok(ChargeInit {
            gateway_reference: format!("mp-{}", order.order_number),
            redirect_url: Some(format!("https://gateway.example/pay/{}", order.order_number)),
        })
    }
}

/// Gateway that is always unreachable.
struct Unreachable;

impl PaymentGateway for Unreachable {
    fn initiate_charge(&self, _order: &Order) -> Result<ChargeInit, GatewayError> {
        Err(GatewayError::Unreachable("connection refused".to_string()))
    }
}

pub(crate) fn approve_all() -> Arc<dyn PaymentGateway> {
    Arc::new(ApproveAll)
}

pub(crate) fn fail_gateway() -> Arc<dyn PaymentGateway> {
    Arc::new(Unreachable)
}

pub(crate) struct Fixture {
    pub store: Arc<Store>,
    pub service: CheckoutService,
    pub sink: Arc<RecordingSink>,
    pub user: UserId,
    pub course_id: CourseId,
    pub coupon_id: CouponId,
}

/// A $300/$U12000 enrolling course with unlimited seats and a 20% coupon
/// good for ten uses.
pub(crate) fn fixture() -> Fixture {
    let store = Arc::new(Store::new());
    let sink = Arc::new(RecordingSink::new());
    let service = CheckoutService::new(store.clone(), approve_all(), sink.clone());

    let course = Course::new("intro-tasting", "Introduction to Wine Tasting", 30000, 1200000)
        .with_status(CourseStatus::Enrolling);
    let course_id = course.id.clone();
    store.put_course(course).expect("seed course");

    let coupon = Coupon::new("MALBEC20", 20, 10);
    let coupon_id = coupon.id.clone();
    store.put_coupon(coupon).expect("seed coupon");

    Fixture {
        store,
        service,
        sink,
        user: UserId::new("taster-1"),
        course_id,
        coupon_id,
    }
}
