//! Repository for per-location inventory levels and reservation counters.
//!
//! `quantity_reserved` is the most contended counter in the system. It is
//! mutated only through the guarded UPDATEs below, each of which takes a
//! row-level `FOR UPDATE` lock on the chosen inventory row — data
//! exclusivity comes from the transaction, never from the distributed lock.

use sqlx::PgPool;
use stockroom_core::types::DbId;

use crate::models::inventory::{CreateInventoryLevel, InventoryLevel, VariantCounts};

/// Column list for `inventory_levels` queries.
const COLUMNS: &str = "\
    id, variant_id, location_id, quantity_on_hand, quantity_reserved, \
    minimum_threshold, created_at, updated_at";

/// Provides operations on `inventory_levels`.
pub struct InventoryRepo;

impl InventoryRepo {
    /// Create an inventory level row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateInventoryLevel,
    ) -> Result<InventoryLevel, sqlx::Error> {
        let query = format!(
            "INSERT INTO inventory_levels \
                 (variant_id, location_id, quantity_on_hand, quantity_reserved, minimum_threshold) \
             VALUES ($1, COALESCE($2, 1), $3, COALESCE($4, 0), COALESCE($5, 0)) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, InventoryLevel>(&query)
            .bind(input.variant_id)
            .bind(input.location_id)
            .bind(input.quantity_on_hand)
            .bind(input.quantity_reserved)
            .bind(input.minimum_threshold)
            .fetch_one(pool)
            .await
    }

    /// All levels for a variant, one row per location.
    pub async fn list_for_variant(
        pool: &PgPool,
        variant_id: DbId,
    ) -> Result<Vec<InventoryLevel>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM inventory_levels WHERE variant_id = $1 ORDER BY location_id");
        sqlx::query_as::<_, InventoryLevel>(&query)
            .bind(variant_id)
            .fetch_all(pool)
            .await
    }

    /// Aggregated counts for a variant across locations, or `None` if the
    /// variant has no inventory rows. This is what the inventory cache
    /// stores on a read-miss.
    pub async fn counts_for_variant(
        pool: &PgPool,
        variant_id: DbId,
    ) -> Result<Option<VariantCounts>, sqlx::Error> {
        sqlx::query_as::<_, VariantCounts>(
            "SELECT SUM(quantity_on_hand)::BIGINT AS quantity_on_hand, \
                    SUM(quantity_reserved)::BIGINT AS quantity_reserved \
             FROM inventory_levels \
             WHERE variant_id = $1 \
             GROUP BY variant_id",
        )
        .bind(variant_id)
        .fetch_optional(pool)
        .await
    }

    /// Reserve `quantity` units of a variant at checkout.
    ///
    /// Picks the location with the most availability that can cover the
    /// whole quantity, under a row-level lock. Returns the updated row, or
    /// `None` when no single location has enough available stock.
    pub async fn reserve(
        pool: &PgPool,
        variant_id: DbId,
        quantity: i64,
    ) -> Result<Option<InventoryLevel>, sqlx::Error> {
        let query = format!(
            "UPDATE inventory_levels SET \
                 quantity_reserved = quantity_reserved + $2, \
                 updated_at = now() \
             WHERE id = ( \
                 SELECT id FROM inventory_levels \
                 WHERE variant_id = $1 \
                   AND quantity_on_hand - quantity_reserved >= $2 \
                 ORDER BY quantity_on_hand - quantity_reserved DESC \
                 LIMIT 1 \
                 FOR UPDATE \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, InventoryLevel>(&query)
            .bind(variant_id)
            .bind(quantity)
            .fetch_optional(pool)
            .await
    }

    /// Release `quantity` reserved units of a variant, inside the caller's
    /// transaction.
    ///
    /// Picks an inventory row carrying at least that much reserved
    /// quantity, under a row-level lock, and decrements it. Returns the id
    /// of the touched row, or `None` if no row qualifies — the caller must
    /// treat `None` as a reservation-accounting violation and roll back,
    /// never clamp.
    pub async fn release_reserved(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        variant_id: DbId,
        quantity: i64,
    ) -> Result<Option<DbId>, sqlx::Error> {
        let row: Option<(DbId,)> = sqlx::query_as(
            "UPDATE inventory_levels SET \
                 quantity_reserved = quantity_reserved - $2, \
                 updated_at = now() \
             WHERE id = ( \
                 SELECT id FROM inventory_levels \
                 WHERE variant_id = $1 AND quantity_reserved >= $2 \
                 ORDER BY quantity_reserved DESC \
                 LIMIT 1 \
                 FOR UPDATE \
             ) \
             RETURNING id",
        )
        .bind(variant_id)
        .bind(quantity)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(row.map(|(id,)| id))
    }

    /// Levels at or below their minimum threshold, for restock dashboards.
    pub async fn list_low_stock(pool: &PgPool) -> Result<Vec<InventoryLevel>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM inventory_levels \
             WHERE quantity_on_hand - quantity_reserved <= minimum_threshold \
             ORDER BY variant_id, location_id"
        );
        sqlx::query_as::<_, InventoryLevel>(&query)
            .fetch_all(pool)
            .await
    }
}
