//! Reconciliation operations: the admin-facing and webhook-facing moves
//! between processing and terminal states.
//!
//! Every mutating operation loads the order's current status and validates
//! the attempted move against the lifecycle table before writing anything;
//! an illegal request fails with the typed transition error. The one
//! exception to strictness is replay: a duplicate confirmation of a paid
//! order, or a duplicate decline of a rejected one, reports success without
//! mutating, because the caller's intent already holds.

use crate::error::CheckoutError;
use crate::gateway::GatewayVerdict;
use crate::notify::NotificationEvent;
use crate::service::{CheckoutService, FinalizeOutcome};
use cellar_commerce::checkout::{Order, OrderEvent, OrderStatus, PaymentMethod};
use cellar_commerce::ids::OrderId;
use tracing::{debug, info};

impl CheckoutService {
    /// Confirm payment and finalize the order (admin action or webhook).
    ///
    /// Legal from `PendingPayment` and `PaymentProcessing`. Calling it on
    /// an order already `Paid` is a no-op success, never a double
    /// enrollment or a double coupon increment.
    pub fn confirm_payment(&self, order_id: &OrderId) -> Result<Order, CheckoutError> {
        let result = self.store().transaction(|txn| {
            self.finalize_locked(txn, order_id, OrderEvent::PaymentConfirmed)
        })?;
        self.dispatch_all(result.events);

        match result.outcome {
            FinalizeOutcome::Finalized(enrollment) => {
                debug!(enrollment = %enrollment.id, "enrollment materialized");
                Ok(result.order)
            }
            FinalizeOutcome::AlreadyPaid => Ok(result.order),
            FinalizeOutcome::RejectedCapacity => Err(CheckoutError::CapacityExhausted {
                course_id: result.order.course_id.to_string(),
            }),
            FinalizeOutcome::RejectedCouponOverrun { code } => {
                Err(CheckoutError::CouponOverrun { code })
            }
            FinalizeOutcome::RejectedAlreadyEnrolled => Err(CheckoutError::Ineligible(
                cellar_commerce::checkout::BlockReason::AlreadyEnrolled,
            )),
        }
    }

    /// Reject a payment under review (admin action).
    pub fn reject_payment(
        &self,
        order_id: &OrderId,
        reason: &str,
    ) -> Result<Order, CheckoutError> {
        let order = self.store().transaction(|txn| {
            let order = txn.order_mut(order_id)?;
            order.apply(OrderEvent::PaymentFailed)?;
            order.set_rejection_reason(reason);
            Ok::<_, CheckoutError>(order.clone())
        })?;
        info!(order = %order.order_number, reason, "payment rejected");
        self.dispatch_all(vec![NotificationEvent::OrderRejected {
            order_id: order.id.clone(),
            email: order.email.clone(),
            reason: reason.to_string(),
        }]);
        Ok(order)
    }

    /// Record that the buyer sent the bank transfer (user action).
    ///
    /// Attaches the evidence and moves the order to `PaymentProcessing`.
    /// Never changes the amount owed.
    pub fn mark_transfer_sent(
        &self,
        order_id: &OrderId,
        reference: Option<String>,
        proof_url: Option<String>,
    ) -> Result<Order, CheckoutError> {
        let order = self.store().transaction(|txn| {
            let order = txn.order_mut(order_id)?;
            if order.payment_method != PaymentMethod::BankTransfer {
                return Err(CheckoutError::MethodMismatch {
                    required: PaymentMethod::BankTransfer.as_str().to_string(),
                    actual: order.payment_method.as_str().to_string(),
                });
            }
            order.apply(OrderEvent::TransferMarkedSent)?;
            order.attach_transfer_evidence(reference, proof_url);
            Ok(order.clone())
        })?;
        info!(order = %order.order_number, "transfer marked sent");
        self.dispatch_all(vec![NotificationEvent::TransferNeedsReview {
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            reference: order.transfer_reference.clone(),
            proof_url: order.transfer_proof_url.clone(),
        }]);
        Ok(order)
    }

    /// Refund a paid order (admin only).
    pub fn refund(&self, order_id: &OrderId) -> Result<Order, CheckoutError> {
        let order = self.store().transaction(|txn| {
            let order = txn.order_mut(order_id)?;
            order.apply(OrderEvent::Refund)?;
            Ok::<_, CheckoutError>(order.clone())
        })?;
        info!(order = %order.order_number, "order refunded");
        self.dispatch_all(vec![NotificationEvent::OrderRefunded {
            order_id: order.id.clone(),
            email: order.email.clone(),
            amount: order.final_amount,
        }]);
        Ok(order)
    }

    /// Cancel a non-terminal order (admin or user action).
    pub fn cancel_order(&self, order_id: &OrderId) -> Result<Order, CheckoutError> {
        let order = self.store().transaction(|txn| {
            let order = txn.order_mut(order_id)?;
            order.apply(OrderEvent::Cancel)?;
            Ok::<_, CheckoutError>(order.clone())
        })?;
        info!(order = %order.order_number, "order cancelled");
        Ok(order)
    }

    /// Webhook entry point for gateway callbacks.
    ///
    /// Callbacks may arrive zero, one, or many times; replays of a verdict
    /// the order already reflects are no-ops.
    pub fn handle_gateway_callback(
        &self,
        order_id: &OrderId,
        verdict: GatewayVerdict,
    ) -> Result<Order, CheckoutError> {
        match verdict {
            GatewayVerdict::Approved => {
                let result = self.store().transaction(|txn| {
                    {
                        let order = txn.order_mut(order_id)?;
                        if order.status == OrderStatus::PendingPayment {
                            order.apply(OrderEvent::GatewaySucceeded)?;
                        }
                    }
                    self.finalize_locked(txn, order_id, OrderEvent::PaymentConfirmed)
                })?;
                self.dispatch_all(result.events);
                match result.outcome {
                    FinalizeOutcome::Finalized(_) | FinalizeOutcome::AlreadyPaid => {
                        Ok(result.order)
                    }
                    FinalizeOutcome::RejectedCapacity => Err(CheckoutError::CapacityExhausted {
                        course_id: result.order.course_id.to_string(),
                    }),
                    FinalizeOutcome::RejectedCouponOverrun { code } => {
                        Err(CheckoutError::CouponOverrun { code })
                    }
                    FinalizeOutcome::RejectedAlreadyEnrolled => Err(CheckoutError::Ineligible(
                        cellar_commerce::checkout::BlockReason::AlreadyEnrolled,
                    )),
                }
            }
            GatewayVerdict::Declined => {
                let (order, changed) = self.store().transaction(|txn| {
                    let order = txn.order_mut(order_id)?;
                    // Replayed decline for an already-rejected order
                    if order.status == OrderStatus::Rejected {
                        return Ok::<_, CheckoutError>((order.clone(), false));
                    }
                    order.apply(OrderEvent::PaymentFailed)?;
                    order.set_rejection_reason("gateway declined");
                    Ok((order.clone(), true))
                })?;
                if changed {
                    info!(order = %order.order_number, "gateway declined payment");
                    self.dispatch_all(vec![NotificationEvent::OrderRejected {
                        order_id: order.id.clone(),
                        email: order.email.clone(),
                        reason: "gateway declined".to_string(),
                    }]);
                }
                Ok(order)
            }
        }
    }
}
