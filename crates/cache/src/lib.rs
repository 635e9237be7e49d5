//! Redis-backed concurrency and caching primitives.
//!
//! Three layers, bottom up:
//!
//! - [`store`] — [`CacheStore`](store::CacheStore), a thin typed handle over
//!   a Redis connection manager: get/set-with-TTL/delete/pattern-delete.
//! - [`lock`] — [`LockManager`](lock::LockManager), token-authenticated
//!   TTL leases built on the store's connection, plus the scoped
//!   [`with_lock`](lock::LockManager::with_lock) executor.
//! - [`domain`] — typed read-through caches for product, inventory-count,
//!   and category-tree data, each with its own TTL class.
//!
//! The store client is constructed explicitly by the composition root and
//! injected everywhere it is needed; there is no process-wide singleton.

pub mod domain;
pub mod lock;
pub mod store;

pub use lock::{LockError, LockManager, LockOptions, LockToken};
pub use store::{CacheError, CacheStore};
