//! Order lifecycle types.
//!
//! The lifecycle is an explicit transition table: every mutation goes
//! through [`OrderStatus::next`], so an illegal move is rejected the same
//! way no matter which caller (admin action, webhook, user action) asked
//! for it.

use crate::checkout::CheckoutContext;
use crate::coupon::CouponSnapshot;
use crate::error::TransitionError;
use crate::ids::{CourseId, EnrollmentId, OrderId, UserId};
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Checkout initiated, no payment path entered yet.
    #[default]
    Created,
    /// Waiting on the buyer (gateway redirect or bank transfer).
    PendingPayment,
    /// Evidence of payment exists, awaiting confirmation.
    PaymentProcessing,
    /// Payment confirmed, enrollment granted. Terminal.
    Paid,
    /// Payment failed or was refused. Terminal.
    Rejected,
    /// Abandoned by user or admin. Terminal.
    Cancelled,
    /// Paid order refunded by an admin. Terminal.
    Refunded,
}

/// Events that drive an order through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderEvent {
    /// Gateway charge initiated successfully.
    GatewayInitiated,
    /// Buyer chose bank transfer.
    TransferChosen,
    /// Nothing owed; order completes immediately.
    FreeCheckout,
    /// Gateway callback reported success.
    GatewaySucceeded,
    /// Buyer reported the transfer as sent.
    TransferMarkedSent,
    /// Admin or webhook confirmed the payment.
    PaymentConfirmed,
    /// Gateway or admin reported the payment as failed.
    PaymentFailed,
    /// An integrity re-check failed inside finalization.
    FinalizeAborted,
    /// Admin or user cancelled the attempt.
    Cancel,
    /// Admin refunded a paid order.
    Refund,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::PaymentProcessing => "payment_processing",
            OrderStatus::Paid => "paid",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OrderStatus::Created => "Created",
            OrderStatus::PendingPayment => "Pending Payment",
            OrderStatus::PaymentProcessing => "Payment Processing",
            OrderStatus::Paid => "Paid",
            OrderStatus::Rejected => "Rejected",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Refunded => "Refunded",
        }
    }

    /// Check if no transition leaves this status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Paid
                | OrderStatus::Rejected
                | OrderStatus::Cancelled
                | OrderStatus::Refunded
        )
    }

    /// The lifecycle graph: (current status, event) -> next status.
    ///
    /// This table is the single source of truth for legality; anything not
    /// listed here is an invalid transition.
    pub fn next(self, event: OrderEvent) -> Result<OrderStatus, TransitionError> {
        use OrderEvent::*;
        use OrderStatus::*;

        let next = match (self, event) {
            (Created, FreeCheckout) => Paid,
            (Created, GatewayInitiated) => PendingPayment,
            (Created, TransferChosen) => PendingPayment,
            (Created, Cancel) => Cancelled,
            (PendingPayment, GatewaySucceeded) => PaymentProcessing,
            (PendingPayment, TransferMarkedSent) => PaymentProcessing,
            (PendingPayment, PaymentConfirmed) => Paid,
            (PaymentProcessing, PaymentConfirmed) => Paid,
            (PendingPayment, PaymentFailed) => Rejected,
            (PaymentProcessing, PaymentFailed) => Rejected,
            (PendingPayment, FinalizeAborted) => Rejected,
            (PaymentProcessing, FinalizeAborted) => Rejected,
            (PendingPayment, Cancel) => Cancelled,
            (PaymentProcessing, Cancel) => Cancelled,
            (Paid, Refund) => Refunded,
            (from, event) => {
                return Err(TransitionError {
                    from: from.as_str().to_string(),
                    event: format!("{:?}", event),
                })
            }
        };
        Ok(next)
    }
}

/// How the buyer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Instant gateway charge.
    MercadoPago,
    /// Manual bank transfer with uploaded proof.
    BankTransfer,
    /// Nothing owed; no gateway interaction at all.
    Free,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::MercadoPago => "mercadopago",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Free => "free",
        }
    }
}

/// One purchase attempt.
///
/// Financial record: orders are never physically deleted, only moved to a
/// terminal status. Coupon terms live here as a snapshot so later coupon
/// edits cannot rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Unique order identifier.
    pub id: OrderId,
    /// Human-readable order number.
    pub order_number: String,
    /// Buying user.
    pub user_id: UserId,
    /// Buyer email at purchase time.
    pub email: String,
    /// Course being purchased.
    pub course_id: CourseId,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Payment path.
    pub payment_method: PaymentMethod,
    /// Ledger currency the order is placed in.
    pub currency: Currency,
    /// List price at purchase time.
    pub original_price: Money,
    /// Percentage off (0 when no coupon).
    pub discount_percent: u8,
    /// Discount applied.
    pub discount_amount: Money,
    /// Amount owed.
    pub final_amount: Money,
    /// Coupon terms as redeemed (None when no coupon).
    pub coupon: Option<CouponSnapshot>,
    /// Bank transfer reference supplied by the buyer.
    pub transfer_reference: Option<String>,
    /// Opaque URL of the uploaded transfer proof.
    pub transfer_proof_url: Option<String>,
    /// Why the order was rejected, when it was.
    pub rejection_reason: Option<String>,
    /// Unix timestamp of payment confirmation.
    pub paid_at: Option<i64>,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
    /// Unix timestamp when cancelled (if applicable).
    pub cancelled_at: Option<i64>,
}

impl Order {
    /// Create a new order in `Created` status from a priced checkout.
    pub fn new(
        user_id: UserId,
        email: impl Into<String>,
        payment_method: PaymentMethod,
        context: &CheckoutContext,
    ) -> Self {
        let now = current_timestamp();
        Self {
            id: OrderId::generate(),
            order_number: Self::generate_order_number(),
            user_id,
            email: email.into(),
            course_id: context.course_id.clone(),
            status: OrderStatus::Created,
            payment_method,
            currency: context.currency,
            original_price: context.pricing.original_price,
            discount_percent: context.pricing.discount_percent,
            discount_amount: context.pricing.discount_amount,
            final_amount: context.pricing.final_amount,
            coupon: context.coupon.clone(),
            transfer_reference: None,
            transfer_proof_url: None,
            rejection_reason: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        }
    }

    /// Generate a new order number.
    pub fn generate_order_number() -> String {
        use std::sync::atomic::{AtomicU64, Ordering};
        use std::time::{SystemTime, UNIX_EPOCH};

        static SEQ: AtomicU64 = AtomicU64::new(0);

        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        // Sequence keeps numbers distinct within the same second
        let seq = SEQ.fetch_add(1, Ordering::SeqCst) % 10_000;
        format!("CLR-{}-{:04}", ts, seq)
    }

    /// Apply a lifecycle event, validated against the transition table.
    pub fn apply(&mut self, event: OrderEvent) -> Result<OrderStatus, TransitionError> {
        let next = self.status.next(event)?;
        self.status = next;
        self.updated_at = current_timestamp();
        match next {
            OrderStatus::Paid => self.paid_at = Some(self.updated_at),
            OrderStatus::Cancelled => self.cancelled_at = Some(self.updated_at),
            _ => {}
        }
        Ok(next)
    }

    /// Attach bank transfer evidence. Never changes the amount owed.
    pub fn attach_transfer_evidence(
        &mut self,
        reference: Option<String>,
        proof_url: Option<String>,
    ) {
        if reference.is_some() {
            self.transfer_reference = reference;
        }
        if proof_url.is_some() {
            self.transfer_proof_url = proof_url;
        }
        self.updated_at = current_timestamp();
    }

    /// Record why the order was rejected.
    pub fn set_rejection_reason(&mut self, reason: impl Into<String>) {
        self.rejection_reason = Some(reason.into());
        self.updated_at = current_timestamp();
    }

    /// Check if the order has been paid.
    pub fn is_paid(&self) -> bool {
        matches!(self.status, OrderStatus::Paid | OrderStatus::Refunded)
    }
}

/// The entitlement granted on successful payment.
///
/// Created exactly once per (user, course), only by the success transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Enrollment {
    /// Unique enrollment identifier.
    pub id: EnrollmentId,
    /// The order whose finalization created this enrollment.
    pub order_id: OrderId,
    /// Enrolled course.
    pub course_id: CourseId,
    /// Enrolled user.
    pub user_id: UserId,
    /// Unix timestamp of enrollment.
    pub enrolled_at: i64,
}

impl Enrollment {
    /// Create the enrollment for a finalized order.
    pub fn for_order(order: &Order, enrolled_at: i64) -> Self {
        Self {
            id: EnrollmentId::generate(),
            order_id: order.id.clone(),
            course_id: order.course_id.clone(),
            user_id: order.user_id.clone(),
            enrolled_at,
        }
    }
}

/// Get current Unix timestamp.
fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
