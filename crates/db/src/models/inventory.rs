//! Models for per-location inventory levels.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use stockroom_core::types::{DbId, Timestamp};

/// A row from the `inventory_levels` table.
///
/// One row per (variant, location). Invariant, enforced by a CHECK
/// constraint and re-asserted by every reconciliation step:
/// `0 <= quantity_reserved <= quantity_on_hand`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InventoryLevel {
    pub id: DbId,
    pub variant_id: DbId,
    pub location_id: DbId,
    pub quantity_on_hand: i64,
    pub quantity_reserved: i64,
    pub minimum_threshold: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl InventoryLevel {
    /// Units actually sellable right now.
    pub fn available(&self) -> i64 {
        self.quantity_on_hand - self.quantity_reserved
    }
}

/// DTO for creating an inventory level.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateInventoryLevel {
    pub variant_id: DbId,
    pub location_id: Option<DbId>,
    pub quantity_on_hand: i64,
    pub quantity_reserved: Option<i64>,
    pub minimum_threshold: Option<i64>,
}

/// Aggregated counts for a variant across all locations.
///
/// This is the shape the inventory cache stores; the storefront's
/// availability read is `on_hand - reserved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct VariantCounts {
    pub quantity_on_hand: i64,
    pub quantity_reserved: i64,
}

impl VariantCounts {
    pub fn available(&self) -> i64 {
        self.quantity_on_hand - self.quantity_reserved
    }
}
