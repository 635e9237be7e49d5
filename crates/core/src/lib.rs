//! Pure domain logic for the inventory-consistency core.
//!
//! No I/O lives here. Data access is done through the repository layer in
//! `stockroom_db`; Redis-backed locks and caches live in `stockroom_cache`.
//! This crate provides the order/payment status vocabulary, the deadline
//! classification used by the reservation reconciler, and the domain error
//! types shared across the workspace.

pub mod orders;
pub mod reconciliation;
pub mod types;
