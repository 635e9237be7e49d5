//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or an open transaction) as the first argument.

pub mod inventory_repo;
pub mod order_repo;

pub use inventory_repo::InventoryRepo;
pub use order_repo::{HoldReleaseError, OrderRepo};
