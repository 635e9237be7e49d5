//! Order and payment status vocabulary.
//!
//! Statuses are stored as TEXT in Postgres and parsed into these enums at
//! the repository boundary. The string forms below are the canonical DB
//! values; anything else in a status column is a data error.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Open,
    Processing,
    Cancelled,
    Delivered,
}

impl OrderStatus {
    /// Canonical DB string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Open => "OPEN",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Delivered => "DELIVERED",
        }
    }

    /// Parse a DB string form. Returns `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(OrderStatus::Pending),
            "OPEN" => Some(OrderStatus::Open),
            "PROCESSING" => Some(OrderStatus::Processing),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            "DELIVERED" => Some(OrderStatus::Delivered),
            _ => None,
        }
    }

    /// Whether the order is still open, i.e. not yet terminal.
    ///
    /// Open orders are the only ones the reconciler will ever touch;
    /// `CANCELLED` and `DELIVERED` are terminal.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::Open | OrderStatus::Processing
        )
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    AwaitingConfirmation,
    Failed,
    Cancelled,
    Paid,
}

impl PaymentStatus {
    /// Canonical DB string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::AwaitingConfirmation => "AWAITING_CONFIRMATION",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Cancelled => "CANCELLED",
            PaymentStatus::Paid => "PAID",
        }
    }

    /// Parse a DB string form. Returns `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentStatus::Pending),
            "AWAITING_CONFIRMATION" => Some(PaymentStatus::AwaitingConfirmation),
            "FAILED" => Some(PaymentStatus::Failed),
            "CANCELLED" => Some(PaymentStatus::Cancelled),
            "PAID" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}
