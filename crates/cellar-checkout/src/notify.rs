//! Notification dispatch seam.
//!
//! The core enqueues typed events carrying the data a message template
//! needs; delivery and formatting happen elsewhere. Dispatch is
//! fire-and-forget and is never awaited for correctness, so services emit
//! events only after their store transaction has committed.

use cellar_commerce::ids::{CourseId, OrderId};
use cellar_commerce::money::Money;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::info;

/// A notification the core wants sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum NotificationEvent {
    /// Payment confirmed and enrollment granted.
    OrderPaid {
        order_id: OrderId,
        order_number: String,
        email: String,
        course_id: CourseId,
        amount: Money,
    },
    /// A bank transfer was marked sent and needs admin review.
    TransferNeedsReview {
        order_id: OrderId,
        order_number: String,
        reference: Option<String>,
        proof_url: Option<String>,
    },
    /// Payment was rejected.
    OrderRejected {
        order_id: OrderId,
        email: String,
        reason: String,
    },
    /// A paid order was refunded.
    OrderRefunded {
        order_id: OrderId,
        email: String,
        amount: Money,
    },
}

/// Sink for notification events.
pub trait NotificationSink: Send + Sync {
    /// Hand the event off. Must not block on delivery.
    fn dispatch(&self, event: NotificationEvent);
}

/// Sink that logs events through `tracing`. Useful as a default and in
/// deployments where delivery is wired up out-of-process.
#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn dispatch(&self, event: NotificationEvent) {
        info!(?event, "notification enqueued");
    }
}

/// Sink that records every event, for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything dispatched so far.
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl NotificationSink for RecordingSink {
    fn dispatch(&self, event: NotificationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
