//! Deadline classification for the reservation reconciler.
//!
//! An order hold that never completes payment must eventually be cancelled
//! and its inventory reservations released. Which deadline applies depends
//! on how far through checkout the order got: a bare reservation gets the
//! short window, an order waiting on a payment provider gets the medium
//! window. The reconciler drives everything off wall-clock age (`created_at`
//! vs. now), never off events, so missed notifications and crashed workers
//! cannot strand a hold.

use chrono::Duration;

use crate::orders::{OrderStatus, PaymentStatus};
use crate::types::Timestamp;

/// Why an expired hold is being cancelled.
///
/// Each class carries its own deadline window and its own audit-trail
/// wording; "payment failed" and "payment window expired" are operationally
/// different and must stay distinguishable in the status history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineClass {
    /// `PENDING` order, payment never started. Short window.
    ReservationHold,
    /// `OPEN` order with `PENDING` payment. Medium window.
    PaymentWindow,
    /// Any open order whose payment `FAILED`. Short window.
    FailedPayment,
    /// Any open order stuck in `AWAITING_CONFIRMATION`. Medium window.
    AwaitingConfirmation,
}

impl DeadlineClass {
    /// Classify an order's status pair, or `None` if the order is not an
    /// expirable hold (paid, terminal, or otherwise out of scope).
    ///
    /// Class precedence follows specificity: a failed or unconfirmed
    /// payment wins over the plain status-based classes.
    pub fn classify(status: OrderStatus, payment: PaymentStatus) -> Option<Self> {
        if !status.is_open() {
            return None;
        }
        match payment {
            PaymentStatus::Failed => Some(DeadlineClass::FailedPayment),
            PaymentStatus::AwaitingConfirmation => Some(DeadlineClass::AwaitingConfirmation),
            PaymentStatus::Pending => match status {
                OrderStatus::Pending => Some(DeadlineClass::ReservationHold),
                OrderStatus::Open => Some(DeadlineClass::PaymentWindow),
                _ => None,
            },
            PaymentStatus::Paid | PaymentStatus::Cancelled => None,
        }
    }

    /// Which configured window this class uses.
    pub fn window(&self, windows: &ReconcileWindows) -> Duration {
        match self {
            DeadlineClass::ReservationHold | DeadlineClass::FailedPayment => windows.short,
            DeadlineClass::PaymentWindow | DeadlineClass::AwaitingConfirmation => windows.medium,
        }
    }

    /// Audit-trail note appended to the order's status history on
    /// cancellation. Distinct per class.
    pub fn cancellation_reason(&self) -> &'static str {
        match self {
            DeadlineClass::ReservationHold => {
                "Reservation hold expired before checkout completed; order cancelled and stock released"
            }
            DeadlineClass::PaymentWindow => {
                "Payment window expired with no payment received; order cancelled and stock released"
            }
            DeadlineClass::FailedPayment => {
                "Payment failed and was not retried; order cancelled and stock released"
            }
            DeadlineClass::AwaitingConfirmation => {
                "Payment confirmation window expired; order cancelled and stock released"
            }
        }
    }
}

/// The two deadline windows shared by the four classes.
///
/// Failed-payment cleanup shares the short window with bare reservation
/// holds; awaiting-confirmation shares the medium window with the payment
/// window. Each is a single tunable.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileWindows {
    /// Reservation-only holds and failed-payment cleanup.
    pub short: Duration,
    /// Payment and payment-confirmation windows.
    pub medium: Duration,
}

impl ReconcileWindows {
    /// Build from minute counts, as loaded from configuration.
    pub fn from_minutes(short_minutes: i64, medium_minutes: i64) -> Self {
        Self {
            short: Duration::minutes(short_minutes),
            medium: Duration::minutes(medium_minutes),
        }
    }

    /// The creation-time cutoff for a class: holds created at or before
    /// this instant have exceeded their deadline.
    pub fn cutoff(&self, class: DeadlineClass, now: Timestamp) -> Timestamp {
        now - class.window(self)
    }
}

impl Default for ReconcileWindows {
    /// 30 minutes for reservation/failed-payment holds, 24 hours for
    /// payment and confirmation windows.
    fn default() -> Self {
        Self::from_minutes(30, 24 * 60)
    }
}
