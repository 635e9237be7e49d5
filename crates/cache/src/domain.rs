//! Typed cache facades for the storefront's hot read paths.
//!
//! One facade per entity kind, each with its own TTL class. Staleness risk
//! scales with how safety-critical the read is: inventory counts feed
//! overselling risk and get the shortest TTL, product detail sits in the
//! middle, list and tree reads tolerate minutes of staleness.
//!
//! Reads never fail the caller. A store error or a malformed stored value
//! is a typed miss (`None`), logged at debug — a flaky cache degrades
//! latency, not correctness. Writers invalidate on every mutation path
//! rather than overwriting with possibly-stale data.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use stockroom_core::types::DbId;

use crate::store::{CacheError, CacheStore};

/// Single-product reads.
pub const PRODUCT_TTL: Duration = Duration::from_secs(300);
/// Filtered product list reads (coarser; keyed by filter digest).
pub const PRODUCT_LIST_TTL: Duration = Duration::from_secs(600);
/// Per-variant inventory counts. Shortest class: stale counts oversell.
pub const INVENTORY_TTL: Duration = Duration::from_secs(30);
/// The whole category tree. Coarsest class.
pub const CATEGORY_TREE_TTL: Duration = Duration::from_secs(900);

/// Stable digest of a list-query filter, for use in list cache keys.
///
/// SHA-256 over the filter's canonical JSON form; equal filters always map
/// to the same key.
pub fn filter_digest<F: Serialize>(filter: &F) -> String {
    let bytes = serde_json::to_vec(filter).unwrap_or_default();
    let hash = Sha256::digest(&bytes);
    format!("{hash:x}")
}

/// Read a JSON value; any failure is a miss.
async fn read_json<T: DeserializeOwned>(store: &CacheStore, key: &str) -> Option<T> {
    match store.get_bytes(key).await {
        Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(key, error = %e, "Malformed cache payload; treating as miss");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::debug!(key, error = %e, "Cache read failed; treating as miss");
            None
        }
    }
}

/// Write a JSON value with a TTL.
async fn write_json<T: Serialize>(
    store: &CacheStore,
    key: &str,
    value: &T,
    ttl: Duration,
) -> Result<(), CacheError> {
    let bytes = serde_json::to_vec(value)?;
    store.set_bytes(key, &bytes, ttl).await
}

// ---------------------------------------------------------------------------
// ProductCache
// ---------------------------------------------------------------------------

/// Cache for product detail and filtered product lists.
#[derive(Clone)]
pub struct ProductCache {
    store: CacheStore,
}

impl ProductCache {
    pub fn new(store: CacheStore) -> Self {
        Self { store }
    }

    fn product_key(id: DbId) -> String {
        format!("product:{id}")
    }

    fn list_key(digest: &str) -> String {
        format!("product:list:{digest}")
    }

    /// Fetch a cached product. Miss on absence, store error, or bad payload.
    pub async fn get<T: DeserializeOwned>(&self, id: DbId) -> Option<T> {
        read_json(&self.store, &Self::product_key(id)).await
    }

    /// Cache a product after a read-miss.
    pub async fn set<T: Serialize>(&self, id: DbId, product: &T) -> Result<(), CacheError> {
        write_json(&self.store, &Self::product_key(id), product, PRODUCT_TTL).await
    }

    /// Fetch a cached list result for a filter digest.
    pub async fn get_list<T: DeserializeOwned>(&self, digest: &str) -> Option<T> {
        read_json(&self.store, &Self::list_key(digest)).await
    }

    /// Cache a list result under its filter digest.
    pub async fn set_list<T: Serialize>(&self, digest: &str, list: &T) -> Result<(), CacheError> {
        write_json(&self.store, &Self::list_key(digest), list, PRODUCT_LIST_TTL).await
    }

    /// Drop a single product entry. Called on every product mutation.
    pub async fn invalidate(&self, id: DbId) -> Result<(), CacheError> {
        self.store.delete(&Self::product_key(id)).await?;
        Ok(())
    }

    /// Drop every cached list. List keys are filter digests, so a mutation
    /// cannot know which lists it affects; pattern-delete them all.
    pub async fn invalidate_lists(&self) -> Result<usize, CacheError> {
        self.store.delete_prefix("product:list:").await
    }
}

// ---------------------------------------------------------------------------
// InventoryCache
// ---------------------------------------------------------------------------

/// Cache for per-variant inventory counts.
#[derive(Clone)]
pub struct InventoryCache {
    store: CacheStore,
}

impl InventoryCache {
    pub fn new(store: CacheStore) -> Self {
        Self { store }
    }

    fn count_key(variant_id: DbId) -> String {
        format!("inventory:{variant_id}")
    }

    /// Fetch cached counts for a variant.
    pub async fn get<T: DeserializeOwned>(&self, variant_id: DbId) -> Option<T> {
        read_json(&self.store, &Self::count_key(variant_id)).await
    }

    /// Cache counts for a variant. Sub-minute TTL.
    pub async fn set<T: Serialize>(&self, variant_id: DbId, counts: &T) -> Result<(), CacheError> {
        write_json(&self.store, &Self::count_key(variant_id), counts, INVENTORY_TTL).await
    }

    /// Drop the cached counts for a variant.
    ///
    /// Called after every reservation mutation commits, so reconciler-driven
    /// changes become visible without waiting out the TTL.
    pub async fn invalidate(&self, variant_id: DbId) -> Result<(), CacheError> {
        self.store.delete(&Self::count_key(variant_id)).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CategoryTreeCache
// ---------------------------------------------------------------------------

/// Cache for the storefront category tree. Single key, coarsest TTL.
#[derive(Clone)]
pub struct CategoryTreeCache {
    store: CacheStore,
}

impl CategoryTreeCache {
    const KEY: &'static str = "category:tree";

    pub fn new(store: CacheStore) -> Self {
        Self { store }
    }

    /// Fetch the cached tree.
    pub async fn get<T: DeserializeOwned>(&self) -> Option<T> {
        read_json(&self.store, Self::KEY).await
    }

    /// Cache the tree.
    pub async fn set<T: Serialize>(&self, tree: &T) -> Result<(), CacheError> {
        write_json(&self.store, Self::KEY, tree, CATEGORY_TREE_TTL).await
    }

    /// Drop the cached tree. Called on any category mutation.
    pub async fn invalidate(&self) -> Result<(), CacheError> {
        self.store.delete(Self::KEY).await?;
        Ok(())
    }
}
