//! Checkout service: eligibility gate, pricing, order creation, and the
//! finalization side-effect boundary.

use crate::error::CheckoutError;
use crate::gateway::{ChargeInit, PaymentGateway};
use crate::notify::{NotificationEvent, NotificationSink};
use crate::store::{Store, Txn};
use cellar_commerce::catalog::EnrollmentPolicy;
use cellar_commerce::checkout::{
    check_eligibility, CheckoutContext, EligibilityFacts, Enrollment, Order, OrderEvent,
    OrderStatus, PaymentMethod,
};
use cellar_commerce::coupon::{validate_coupon, CouponSnapshot};
use cellar_commerce::ids::{CourseId, OrderId, UserId};
use cellar_commerce::money::Currency;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of starting a checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct BeginCheckout {
    /// The created order.
    pub order: Order,
    /// Gateway charge details, when the instant-gateway path was taken.
    pub charge: Option<ChargeInit>,
}

/// How finalization resolved, decided inside one store transaction.
#[derive(Debug)]
pub(crate) enum FinalizeOutcome {
    /// Order moved to paid; enrollment created.
    Finalized(Enrollment),
    /// Order was already paid; nothing changed (duplicate webhook/click).
    AlreadyPaid,
    /// Capacity ran out meanwhile; order rerouted to rejected.
    RejectedCapacity,
    /// Coupon's last use was taken meanwhile; order rerouted to rejected.
    RejectedCouponOverrun { code: String },
    /// An enrollment for this (user, course) appeared meanwhile.
    RejectedAlreadyEnrolled,
}

pub(crate) struct FinalizeResult {
    pub order: Order,
    pub outcome: FinalizeOutcome,
    pub events: Vec<NotificationEvent>,
}

/// Drives the order/checkout lifecycle against the store.
///
/// Gateway calls happen before the store transaction is entered; the
/// transition itself is a fast, local, atomic step.
pub struct CheckoutService {
    store: Arc<Store>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn NotificationSink>,
    policy: EnrollmentPolicy,
}

impl CheckoutService {
    pub fn new(
        store: Arc<Store>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            gateway,
            notifier,
            policy: EnrollmentPolicy::default(),
        }
    }

    /// Override the enrollment-open policy.
    pub fn with_policy(mut self, policy: EnrollmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub(crate) fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub(crate) fn dispatch_all(&self, events: Vec<NotificationEvent>) {
        for event in events {
            self.notifier.dispatch(event);
        }
    }

    /// Price a checkout without creating anything.
    ///
    /// Runs the same eligibility and coupon checks as [`begin_checkout`],
    /// read-only: re-rendering a checkout page any number of times never
    /// consumes a coupon use.
    ///
    /// [`begin_checkout`]: CheckoutService::begin_checkout
    pub fn preview(
        &self,
        user_id: &UserId,
        email: &str,
        course_id: &CourseId,
        currency: Currency,
        coupon_code: Option<&str>,
    ) -> Result<CheckoutContext, CheckoutError> {
        self.store.transaction(|txn| {
            let course = txn.course(course_id)?.clone();
            let facts = EligibilityFacts {
                already_enrolled: txn.enrollment_exists(user_id, course_id),
                confirmed_enrollments: txn.confirmed_enrollment_count(course_id),
                now: current_timestamp(),
            };
            check_eligibility(&course, &self.policy, facts)?;

            let coupon = match coupon_code {
                Some(code) => Some(self.validate_code(txn, code, &course, email)?),
                None => None,
            };
            Ok(CheckoutContext::build(&course, coupon, currency))
        })
    }

    /// Start a checkout: gate eligibility, apply the coupon, price the
    /// order, create it, and route it down its payment path.
    ///
    /// A zero final amount forces the `Free` method regardless of what was
    /// selected; the free path completes immediately with no gateway
    /// contact. A gateway-init failure cancels the order and surfaces a
    /// retryable error; retrying means starting a fresh checkout.
    pub fn begin_checkout(
        &self,
        user_id: &UserId,
        email: &str,
        course_id: &CourseId,
        currency: Currency,
        method: PaymentMethod,
        coupon_code: Option<&str>,
    ) -> Result<BeginCheckout, CheckoutError> {
        let (order, events) = self.store.transaction(|txn| {
            let course = txn.course(course_id)?.clone();
            let facts = EligibilityFacts {
                already_enrolled: txn.enrollment_exists(user_id, course_id),
                confirmed_enrollments: txn.confirmed_enrollment_count(course_id),
                now: current_timestamp(),
            };
            check_eligibility(&course, &self.policy, facts)?;

            let coupon = match coupon_code {
                Some(code) => Some(self.validate_code(txn, code, &course, email)?),
                None => None,
            };
            let context = CheckoutContext::build(&course, coupon, currency);

            // A fully-discounted or zero-priced order always takes the free
            // path, whatever method the buyer picked
            let method = if context.pricing.is_free() {
                PaymentMethod::Free
            } else {
                method
            };

            let order = Order::new(user_id.clone(), email, method, &context);
            let order_id = order.id.clone();
            info!(
                order = %order.order_number,
                course = %course_id,
                method = method.as_str(),
                amount = order.final_amount.amount_cents,
                "checkout started"
            );
            txn.insert_order(order);

            match method {
                PaymentMethod::Free => {
                    let result =
                        self.finalize_locked(txn, &order_id, OrderEvent::FreeCheckout)?;
                    Ok::<_, CheckoutError>((result.order, result.events))
                }
                PaymentMethod::BankTransfer => {
                    let order = txn.order_mut(&order_id)?;
                    order.apply(OrderEvent::TransferChosen)?;
                    Ok((order.clone(), Vec::new()))
                }
                // Gateway contact happens outside the lock; the order waits
                // in Created until the charge is open
                PaymentMethod::MercadoPago => Ok((txn.order(&order_id)?.clone(), Vec::new())),
            }
        })?;
        self.dispatch_all(events);

        if order.payment_method != PaymentMethod::MercadoPago {
            return Ok(BeginCheckout {
                order,
                charge: None,
            });
        }

        let charge = match self.gateway.initiate_charge(&order) {
            Ok(charge) => charge,
            Err(e) => {
                warn!(order = %order.order_number, error = %e, "gateway init failed");
                // The order never entered a payment path; close it out so
                // nothing lingers in a non-terminal state
                self.store.transaction(|txn| {
                    let order = txn.order_mut(&order.id)?;
                    order.apply(OrderEvent::Cancel)?;
                    Ok::<_, CheckoutError>(())
                })?;
                return Err(CheckoutError::Gateway(e));
            }
        };

        let order = self.store.transaction(|txn| {
            let order = txn.order_mut(&order.id)?;
            order.apply(OrderEvent::GatewayInitiated)?;
            Ok::<_, CheckoutError>(order.clone())
        })?;
        info!(order = %order.order_number, "gateway charge initiated");

        Ok(BeginCheckout {
            order,
            charge: Some(charge),
        })
    }

    fn validate_code(
        &self,
        txn: &Txn<'_>,
        code: &str,
        course: &cellar_commerce::catalog::Course,
        email: &str,
    ) -> Result<CouponSnapshot, CheckoutError> {
        // Minimum-purchase rules are expressed in USD terms, whatever
        // ledger the order is placed in
        let result = validate_coupon(
            txn.coupon_by_code(code),
            &course.id,
            email,
            course.price_usd,
            current_timestamp(),
        );
        if let Err(rejection) = &result {
            debug!(code, %rejection, "coupon rejected");
        }
        Ok(result?)
    }

    /// The success transition: one atomic unit that re-checks capacity,
    /// creates the enrollment, redeems the coupon, stamps `paid_at`, and
    /// queues the confirmation notification.
    ///
    /// Idempotent by source-state guard: an order already in `Paid` is a
    /// no-op, so replayed webhooks and double admin clicks cannot
    /// double-enroll or double-increment.
    pub(crate) fn finalize_locked(
        &self,
        txn: &mut Txn<'_>,
        order_id: &OrderId,
        event: OrderEvent,
    ) -> Result<FinalizeResult, CheckoutError> {
        let order = txn.order(order_id)?.clone();

        if order.status == OrderStatus::Paid {
            debug!(order = %order.order_number, "finalize replay ignored");
            return Ok(FinalizeResult {
                order,
                outcome: FinalizeOutcome::AlreadyPaid,
                events: Vec::new(),
            });
        }
        // Reject illegal sources (cancelled, rejected, refunded) before any
        // side effect
        order.status.next(event)?;

        if txn.enrollment_exists(&order.user_id, &order.course_id) {
            let rejected = self.reroute_rejected(txn, order_id, "already enrolled")?;
            return Ok(FinalizeResult {
                events: vec![rejected_event(&rejected, "already enrolled")],
                order: rejected,
                outcome: FinalizeOutcome::RejectedAlreadyEnrolled,
            });
        }

        let course = txn.course(&order.course_id)?;
        if course.at_capacity(txn.confirmed_enrollment_count(&order.course_id)) {
            warn!(order = %order.order_number, course = %order.course_id, "capacity exhausted at finalization");
            let rejected = self.reroute_rejected(txn, order_id, "course capacity exhausted")?;
            return Ok(FinalizeResult {
                events: vec![rejected_event(&rejected, "course capacity exhausted")],
                order: rejected,
                outcome: FinalizeOutcome::RejectedCapacity,
            });
        }

        if let Some(snapshot) = order.coupon.clone() {
            match txn.coupon_mut(&snapshot.coupon_id) {
                Some(coupon) => {
                    if !coupon.try_redeem() {
                        warn!(order = %order.order_number, code = %snapshot.code, "coupon overrun at finalization");
                        let rejected =
                            self.reroute_rejected(txn, order_id, "coupon exhausted")?;
                        return Ok(FinalizeResult {
                            events: vec![rejected_event(&rejected, "coupon exhausted")],
                            order: rejected,
                            outcome: FinalizeOutcome::RejectedCouponOverrun {
                                code: snapshot.code,
                            },
                        });
                    }
                }
                // Live coupon deleted since validation; the order's snapshot
                // stands and there is no counter left to move
                None => debug!(code = %snapshot.code, "coupon record gone, skipping counter"),
            }
        }

        let order = txn.order_mut(order_id)?;
        order.apply(event)?;
        let paid_at = order.paid_at.unwrap_or_else(current_timestamp);
        let order = order.clone();
        let enrollment = Enrollment::for_order(&order, paid_at);
        txn.insert_enrollment(enrollment.clone());

        info!(
            order = %order.order_number,
            course = %order.course_id,
            "order paid, enrollment created"
        );

        let events = vec![NotificationEvent::OrderPaid {
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            email: order.email.clone(),
            course_id: order.course_id.clone(),
            amount: order.final_amount,
        }];
        Ok(FinalizeResult {
            order,
            outcome: FinalizeOutcome::Finalized(enrollment),
            events,
        })
    }

    /// Move an order to rejected as integrity recovery, recording why.
    fn reroute_rejected(
        &self,
        txn: &mut Txn<'_>,
        order_id: &OrderId,
        reason: &str,
    ) -> Result<Order, CheckoutError> {
        let order = txn.order_mut(order_id)?;
        order.apply(OrderEvent::FinalizeAborted)?;
        order.set_rejection_reason(reason);
        Ok(order.clone())
    }
}

fn rejected_event(order: &Order, reason: &str) -> NotificationEvent {
    NotificationEvent::OrderRejected {
        order_id: order.id.clone(),
        email: order.email.clone(),
        reason: reason.to_string(),
    }
}

/// Get current Unix timestamp.
pub(crate) fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayError, GatewayVerdict};
    use crate::notify::RecordingSink;
    use crate::testkit::{approve_all, fail_gateway, fixture};
    use cellar_commerce::catalog::{Course, CourseStatus};
    use cellar_commerce::checkout::BlockReason;
    use cellar_commerce::coupon::{Coupon, CouponRejection};
    use cellar_commerce::money::Money;

    #[test]
    fn test_preview_prices_without_side_effects() {
        let fx = fixture();
        let ctx = fx
            .service
            .preview(
                &fx.user,
                "buyer@example.com",
                &fx.course_id,
                Currency::USD,
                Some("MALBEC20"),
            )
            .unwrap();
        assert_eq!(ctx.pricing.original_price.amount_cents, 30000);
        assert_eq!(ctx.pricing.discount_amount.amount_cents, 6000);
        assert_eq!(ctx.pricing.final_amount.amount_cents, 24000);

        // Previewing does not create orders or consume uses
        let coupon = fx.store.get_coupon(&fx.coupon_id).unwrap();
        assert_eq!(coupon.current_uses, 0);
    }

    #[test]
    fn test_preview_blocks_ineligible_user_before_coupon_logic() {
        let fx = fixture();
        // Enroll the user via a free path first
        let free = Course::new("open-day", "Open Tasting Day", 0, 0)
            .with_status(CourseStatus::Enrolling);
        let free_id = free.id.clone();
        fx.store.put_course(free).unwrap();
        fx.service
            .begin_checkout(
                &fx.user,
                "buyer@example.com",
                &free_id,
                Currency::USD,
                PaymentMethod::MercadoPago,
                None,
            )
            .unwrap();

        let err = fx
            .service
            .preview(
                &fx.user,
                "buyer@example.com",
                &free_id,
                Currency::USD,
                Some("BOGUS"),
            )
            .unwrap_err();
        // Eligibility runs first: the bogus coupon is never consulted
        assert_eq!(err, CheckoutError::Ineligible(BlockReason::AlreadyEnrolled));
    }

    #[test]
    fn test_bank_transfer_checkout_waits_in_pending() {
        let fx = fixture();
        let begun = fx
            .service
            .begin_checkout(
                &fx.user,
                "buyer@example.com",
                &fx.course_id,
                Currency::UYU,
                PaymentMethod::BankTransfer,
                None,
            )
            .unwrap();
        assert_eq!(begun.order.status, OrderStatus::PendingPayment);
        assert_eq!(begun.order.final_amount.amount_cents, 1200000);
        assert!(begun.charge.is_none());
    }

    #[test]
    fn test_gateway_checkout_initiates_charge() {
        let fx = fixture();
        let begun = fx
            .service
            .begin_checkout(
                &fx.user,
                "buyer@example.com",
                &fx.course_id,
                Currency::USD,
                PaymentMethod::MercadoPago,
                Some("MALBEC20"),
            )
            .unwrap();
        assert_eq!(begun.order.status, OrderStatus::PendingPayment);
        assert_eq!(begun.order.final_amount.amount_cents, 24000);
        assert!(begun.charge.is_some());

        // Validation alone has not consumed a use
        let coupon = fx.store.get_coupon(&fx.coupon_id).unwrap();
        assert_eq!(coupon.current_uses, 0);
    }

    #[test]
    fn test_gateway_failure_cancels_order() {
        let store = Arc::new(Store::new());
        let sink = Arc::new(RecordingSink::new());
        let service = CheckoutService::new(store.clone(), fail_gateway(), sink.clone());

        let course = Course::new("blind-tasting", "Blind Tasting", 30000, 1200000)
            .with_status(CourseStatus::Enrolling);
        let course_id = course.id.clone();
        store.put_course(course).unwrap();

        let user = UserId::new("u1");
        let err = service
            .begin_checkout(
                &user,
                "buyer@example.com",
                &course_id,
                Currency::USD,
                PaymentMethod::MercadoPago,
                None,
            )
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(
            err,
            CheckoutError::Gateway(GatewayError::Unreachable(_))
        ));
        assert!(sink.events().is_empty());

        // The failed attempt is closed out, not stranded in a
        // non-terminal state
        let orders = store.orders_for_user(&user).unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Cancelled);

        // The user may simply start over
        assert!(store.get_enrollment(&user, &course_id).unwrap().is_none());
    }

    #[test]
    fn test_free_coupon_routes_straight_to_paid() {
        let fx = fixture();
        fx.store
            .put_coupon(Coupon::new("SCHOLARSHIP", 100, 3))
            .unwrap();

        let begun = fx
            .service
            .begin_checkout(
                &fx.user,
                "buyer@example.com",
                &fx.course_id,
                Currency::USD,
                PaymentMethod::MercadoPago,
                Some("SCHOLARSHIP"),
            )
            .unwrap();
        // Method forced to free, no gateway contact, immediately paid
        assert_eq!(begun.order.payment_method, PaymentMethod::Free);
        assert_eq!(begun.order.status, OrderStatus::Paid);
        assert!(begun.charge.is_none());
        assert!(begun.order.paid_at.is_some());

        let enrollment = fx
            .store
            .get_enrollment(&fx.user, &fx.course_id)
            .unwrap()
            .expect("enrollment created");
        assert_eq!(enrollment.order_id, begun.order.id);
        assert!(fx
            .sink
            .events()
            .iter()
            .any(|e| matches!(e, NotificationEvent::OrderPaid { .. })));
    }

    #[test]
    fn test_coupon_below_minimum_is_typed() {
        let fx = fixture();
        fx.store
            .put_coupon(
                Coupon::new("BIGSPEND", 10, 10)
                    .with_minimum_purchase(Money::new(100000, Currency::USD)),
            )
            .unwrap();
        let err = fx
            .service
            .preview(
                &fx.user,
                "buyer@example.com",
                &fx.course_id,
                Currency::USD,
                Some("BIGSPEND"),
            )
            .unwrap_err();
        assert_eq!(err, CheckoutError::Coupon(CouponRejection::BelowMinimum));
    }

    #[test]
    fn test_closed_course_blocks_checkout() {
        let fx = fixture();
        let closed = Course::new("history", "Wine History", 10000, 400000)
            .with_status(CourseStatus::Finished);
        let closed_id = closed.id.clone();
        fx.store.put_course(closed).unwrap();

        let err = fx
            .service
            .begin_checkout(
                &fx.user,
                "buyer@example.com",
                &closed_id,
                Currency::USD,
                PaymentMethod::BankTransfer,
                None,
            )
            .unwrap_err();
        assert_eq!(err, CheckoutError::Ineligible(BlockReason::CourseClosed));
    }

    #[test]
    fn test_concurrent_last_coupon_use() {
        // Two processing orders share a coupon with one use left; exactly
        // one finalization wins it
        let fx = fixture();
        fx.store
            .put_coupon({
                let mut c = Coupon::new("LASTONE", 20, 1);
                c.current_uses = 0;
                c
            })
            .unwrap();

        let mut order_ids = Vec::new();
        for i in 0..2 {
            let user = UserId::new(format!("user-{}", i));
            let begun = fx
                .service
                .begin_checkout(
                    &user,
                    &format!("buyer{}@example.com", i),
                    &fx.course_id,
                    Currency::USD,
                    PaymentMethod::BankTransfer,
                    Some("LASTONE"),
                )
                .unwrap();
            order_ids.push(begun.order.id.clone());
        }

        let service = Arc::new(fx.service);
        let handles: Vec<_> = order_ids
            .iter()
            .cloned()
            .map(|id| {
                let service = Arc::clone(&service);
                std::thread::spawn(move || service.confirm_payment(&id))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let paid = results.iter().filter(|r| r.is_ok()).count();
        let overrun = results
            .iter()
            .filter(|r| matches!(r, Err(CheckoutError::CouponOverrun { .. })))
            .count();
        assert_eq!(paid, 1);
        assert_eq!(overrun, 1);

        // The counter never passed the limit, and the loser's order was
        // rerouted to rejected
        let coupon_id = service
            .store()
            .transaction::<_, crate::store::StoreError>(|txn| {
                Ok(txn.coupon_by_code("LASTONE").unwrap().id.clone())
            })
            .unwrap();
        let coupon = service.store().get_coupon(&coupon_id).unwrap();
        assert_eq!(coupon.current_uses, 1);

        let statuses: Vec<_> = order_ids
            .iter()
            .map(|id| service.store().get_order(id).unwrap().status)
            .collect();
        assert!(statuses.contains(&OrderStatus::Paid));
        assert!(statuses.contains(&OrderStatus::Rejected));
    }

    #[test]
    fn test_concurrent_last_seat() {
        // Capacity 1, two processing orders; the second finalization must
        // fail with the capacity cause and create no enrollment
        let store = Arc::new(Store::new());
        let sink = Arc::new(RecordingSink::new());
        let service = Arc::new(CheckoutService::new(
            store.clone(),
            approve_all(),
            sink.clone(),
        ));

        let course = Course::new("cellar-tour", "Cellar Tour", 5000, 200000)
            .with_status(CourseStatus::Enrolling)
            .with_capacity(1);
        let course_id = course.id.clone();
        store.put_course(course).unwrap();

        let mut order_ids = Vec::new();
        for i in 0..2 {
            let begun = service
                .begin_checkout(
                    &UserId::new(format!("user-{}", i)),
                    &format!("buyer{}@example.com", i),
                    &course_id,
                    Currency::USD,
                    PaymentMethod::BankTransfer,
                    None,
                )
                .unwrap();
            order_ids.push(begun.order.id.clone());
        }

        let handles: Vec<_> = order_ids
            .iter()
            .cloned()
            .map(|id| {
                let service = Arc::clone(&service);
                std::thread::spawn(move || service.confirm_payment(&id))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let paid = results.iter().filter(|r| r.is_ok()).count();
        let capacity = results
            .iter()
            .filter(|r| matches!(r, Err(CheckoutError::CapacityExhausted { .. })))
            .count();
        assert_eq!(paid, 1);
        assert_eq!(capacity, 1);

        store
            .transaction::<_, crate::store::StoreError>(|txn| {
                assert_eq!(txn.confirmed_enrollment_count(&course_id), 1);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_duplicate_webhook_is_one_enrollment() {
        let fx = fixture();
        let begun = fx
            .service
            .begin_checkout(
                &fx.user,
                "buyer@example.com",
                &fx.course_id,
                Currency::USD,
                PaymentMethod::MercadoPago,
                Some("MALBEC20"),
            )
            .unwrap();
        let order_id = begun.order.id.clone();
        let service = Arc::new(fx.service);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = Arc::clone(&service);
                let id = order_id.clone();
                std::thread::spawn(move || {
                    service.handle_gateway_callback(&id, GatewayVerdict::Approved)
                })
            })
            .collect();
        for handle in handles {
            // Every replay reports success
            assert!(handle.join().unwrap().is_ok());
        }

        let order = service.store().get_order(&order_id).unwrap();
        assert_eq!(order.status, OrderStatus::Paid);

        let coupon = service.store().get_coupon(&fx.coupon_id).unwrap();
        assert_eq!(coupon.current_uses, 1);

        service
            .store()
            .transaction::<_, crate::store::StoreError>(|txn| {
                assert_eq!(txn.confirmed_enrollment_count(&fx.course_id), 1);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_order_keeps_snapshot_after_coupon_deactivation() {
        let fx = fixture();
        let begun = fx
            .service
            .begin_checkout(
                &fx.user,
                "buyer@example.com",
                &fx.course_id,
                Currency::USD,
                PaymentMethod::BankTransfer,
                Some("MALBEC20"),
            )
            .unwrap();

        // Deactivate and gut the live coupon after checkout
        let mut live = fx.store.get_coupon(&fx.coupon_id).unwrap();
        live.is_active = false;
        live.discount_percent = 1;
        fx.store.put_coupon(live).unwrap();

        let order = fx.store.get_order(&begun.order.id).unwrap();
        let snapshot = order.coupon.expect("snapshot kept");
        assert_eq!(snapshot.discount_percent, 20);
        assert_eq!(order.final_amount.amount_cents, 24000);
    }
}
