//! Models for orders, order items, and the status-history audit trail.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use stockroom_core::orders::{OrderStatus, PaymentStatus};
use stockroom_core::reconciliation::DeadlineClass;
use stockroom_core::types::{DbId, Timestamp};

/// A row from the `orders` table.
///
/// Status columns are stored as TEXT; [`Order::status`] and
/// [`Order::payment_status`] parse them into the core enums.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: DbId,
    #[sqlx(rename = "status")]
    pub status_raw: String,
    #[sqlx(rename = "payment_status")]
    pub payment_status_raw: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Order {
    /// Parsed order status. `None` means a value outside the canonical set,
    /// which the CHECK constraint should make impossible.
    pub fn status(&self) -> Option<OrderStatus> {
        OrderStatus::parse(&self.status_raw)
    }

    /// Parsed payment status.
    pub fn payment_status(&self) -> Option<PaymentStatus> {
        PaymentStatus::parse(&self.payment_status_raw)
    }
}

/// A row from the `order_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderItem {
    pub id: DbId,
    pub order_id: DbId,
    pub variant_id: DbId,
    pub quantity: i32,
    pub created_at: Timestamp,
}

/// A row from the append-only `order_status_history` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StatusHistoryEntry {
    pub id: DbId,
    pub order_id: DbId,
    pub status: String,
    pub payment_status: String,
    pub note: String,
    pub created_at: Timestamp,
}

/// DTO for creating an order.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrder {
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    /// Override the creation timestamp; defaults to `now()`. Used by
    /// admin backfills and tests that need a backdated hold.
    pub created_at: Option<Timestamp>,
}

/// DTO for one line item on a new order.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderItem {
    pub variant_id: DbId,
    pub quantity: i32,
}

/// An order whose hold deadline has passed, as selected by the reconciler,
/// together with its deadline class and line items.
#[derive(Debug, Clone)]
pub struct ExpiredHold {
    pub order: Order,
    pub class: DeadlineClass,
    pub items: Vec<OrderItem>,
}
