//! Repository for orders, line items, and the status-history audit trail,
//! including the reconciler's expired-hold selection and cancel-and-release
//! transaction.

use sqlx::PgPool;
use stockroom_core::orders::{OrderStatus, PaymentStatus};
use stockroom_core::reconciliation::{DeadlineClass, ReconcileWindows};
use stockroom_core::types::{DbId, Timestamp};

use crate::models::order::{
    CreateOrder, CreateOrderItem, ExpiredHold, Order, OrderItem, StatusHistoryEntry,
};
use crate::repositories::InventoryRepo;

/// Column list for `orders` queries.
const ORDER_COLUMNS: &str = "id, status, payment_status, created_at, updated_at";

/// Column list for `order_items` queries.
const ITEM_COLUMNS: &str = "id, order_id, variant_id, quantity, created_at";

/// Column list for `order_status_history` queries.
const HISTORY_COLUMNS: &str = "id, order_id, status, payment_status, note, created_at";

/// Failure modes of the per-order cancel-and-release transaction.
#[derive(Debug, thiserror::Error)]
pub enum HoldReleaseError {
    /// The order left the expirable state between selection and the
    /// transaction (e.g. payment completed). The transaction is rolled
    /// back untouched; this is a benign skip, not a fault.
    #[error("order {order_id} is no longer an expirable hold")]
    NoLongerEligible { order_id: DbId },

    /// No inventory row carries enough reserved quantity for a line item.
    /// Reservation accounting is broken upstream for this variant; the
    /// transaction is rolled back rather than clamping the counter.
    #[error("no inventory row holds {quantity} reserved unit(s) of variant {variant_id}")]
    ReservedUnderflow { variant_id: DbId, quantity: i64 },

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Provides operations on `orders` and its child tables.
pub struct OrderRepo;

impl OrderRepo {
    /// Create an order with its line items in one transaction.
    pub async fn create(
        pool: &PgPool,
        input: &CreateOrder,
        items: &[CreateOrderItem],
    ) -> Result<Order, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let insert_query = format!(
            "INSERT INTO orders (status, payment_status, created_at) \
             VALUES ($1, $2, COALESCE($3, now())) \
             RETURNING {ORDER_COLUMNS}"
        );
        let order = sqlx::query_as::<_, Order>(&insert_query)
            .bind(input.status.as_str())
            .bind(input.payment_status.as_str())
            .bind(input.created_at)
            .fetch_one(&mut *tx)
            .await?;

        for item in items {
            sqlx::query("INSERT INTO order_items (order_id, variant_id, quantity) VALUES ($1, $2, $3)")
                .bind(order.id)
                .bind(item.variant_id)
                .bind(item.quantity)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(order)
    }

    /// Find an order by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Order>, sqlx::Error> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Line items for an order.
    pub async fn items_for_order(
        pool: &PgPool,
        order_id: DbId,
    ) -> Result<Vec<OrderItem>, sqlx::Error> {
        let query = format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id");
        sqlx::query_as::<_, OrderItem>(&query)
            .bind(order_id)
            .fetch_all(pool)
            .await
    }

    /// Status-history entries for an order, oldest first.
    pub async fn list_status_history(
        pool: &PgPool,
        order_id: DbId,
    ) -> Result<Vec<StatusHistoryEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {HISTORY_COLUMNS} FROM order_status_history WHERE order_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, StatusHistoryEntry>(&query)
            .bind(order_id)
            .fetch_all(pool)
            .await
    }

    /// Append a status-history note for an order.
    pub async fn append_status_history(
        pool: &PgPool,
        order_id: DbId,
        status: OrderStatus,
        payment_status: PaymentStatus,
        note: &str,
    ) -> Result<StatusHistoryEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO order_status_history (order_id, status, payment_status, note) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {HISTORY_COLUMNS}"
        );
        sqlx::query_as::<_, StatusHistoryEntry>(&query)
            .bind(order_id)
            .bind(status.as_str())
            .bind(payment_status.as_str())
            .bind(note)
            .fetch_one(pool)
            .await
    }

    /// Select every order hold whose deadline has passed, with line items.
    ///
    /// One predicate per deadline class, each against its own cutoff.
    /// Orders whose status pair no longer matches any class are excluded
    /// by construction, which is what makes at-least-once scheduling of
    /// the reconciliation pass safe.
    pub async fn list_expired_holds(
        pool: &PgPool,
        windows: &ReconcileWindows,
        now: Timestamp,
    ) -> Result<Vec<ExpiredHold>, sqlx::Error> {
        let short_cutoff = now - windows.short;
        let medium_cutoff = now - windows.medium;

        let query = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE (status = 'PENDING' AND payment_status = 'PENDING' AND created_at <= $1) \
                OR (status = 'OPEN' AND payment_status = 'PENDING' AND created_at <= $2) \
                OR (status IN ('PENDING', 'OPEN', 'PROCESSING') \
                    AND payment_status = 'FAILED' AND created_at <= $1) \
                OR (status IN ('PENDING', 'OPEN', 'PROCESSING') \
                    AND payment_status = 'AWAITING_CONFIRMATION' AND created_at <= $2) \
             ORDER BY created_at"
        );
        let orders = sqlx::query_as::<_, Order>(&query)
            .bind(short_cutoff)
            .bind(medium_cutoff)
            .fetch_all(pool)
            .await?;

        let mut holds = Vec::with_capacity(orders.len());
        for order in orders {
            let class = match (order.status(), order.payment_status()) {
                (Some(status), Some(payment)) => DeadlineClass::classify(status, payment),
                _ => None,
            };
            let Some(class) = class else {
                // Unreachable while the CHECK constraints hold; skip loudly
                // rather than cancel something we cannot classify.
                tracing::warn!(
                    order_id = order.id,
                    status = %order.status_raw,
                    payment_status = %order.payment_status_raw,
                    "Expired-hold query returned an unclassifiable order; skipping"
                );
                continue;
            };

            let items = Self::items_for_order(pool, order.id).await?;
            holds.push(ExpiredHold { order, class, items });
        }

        Ok(holds)
    }

    /// Cancel an expired hold and release its reservations, atomically.
    ///
    /// One transaction: re-check the order is still in the selected status
    /// pair (taking its row lock), release each line item's reserved
    /// quantity, flip both statuses to `CANCELLED`, and append the
    /// class-specific audit note. Any error rolls the whole order back;
    /// other orders in the batch are unaffected.
    ///
    /// Returns the distinct variant ids whose counters changed, so the
    /// caller can invalidate their cache entries after commit.
    pub async fn cancel_expired_hold(
        pool: &PgPool,
        hold: &ExpiredHold,
    ) -> Result<Vec<DbId>, HoldReleaseError> {
        let cancelled = OrderStatus::Cancelled.as_str();
        let mut tx = pool.begin().await?;

        // Guard update: only proceed if the order still looks exactly like
        // it did at selection time. Also serializes against any concurrent
        // writer of this order row.
        let guard = sqlx::query(
            "UPDATE orders SET status = $2, payment_status = $3, updated_at = now() \
             WHERE id = $1 AND status = $4 AND payment_status = $5",
        )
        .bind(hold.order.id)
        .bind(cancelled)
        .bind(PaymentStatus::Cancelled.as_str())
        .bind(&hold.order.status_raw)
        .bind(&hold.order.payment_status_raw)
        .execute(&mut *tx)
        .await?;

        if guard.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(HoldReleaseError::NoLongerEligible {
                order_id: hold.order.id,
            });
        }

        let mut touched = Vec::with_capacity(hold.items.len());
        for item in &hold.items {
            let quantity = i64::from(item.quantity);
            let released =
                InventoryRepo::release_reserved(&mut tx, item.variant_id, quantity).await?;
            if released.is_none() {
                tx.rollback().await?;
                return Err(HoldReleaseError::ReservedUnderflow {
                    variant_id: item.variant_id,
                    quantity,
                });
            }
            if !touched.contains(&item.variant_id) {
                touched.push(item.variant_id);
            }
        }

        let note = hold.class.cancellation_reason();
        sqlx::query(
            "INSERT INTO order_status_history (order_id, status, payment_status, note) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(hold.order.id)
        .bind(cancelled)
        .bind(PaymentStatus::Cancelled.as_str())
        .bind(note)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(touched)
    }
}
