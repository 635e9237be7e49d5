//! Periodic reservation-timeout reconciliation.
//!
//! [`ReservationReconciler`] runs as a background task: every interval it
//! selects order holds whose deadline has passed and, one order at a time,
//! each inside its own database transaction, cancels the order and releases
//! its inventory reservations. Sequential processing is deliberate —
//! concurrent decrements across orders sharing a variant would reintroduce
//! the race the transaction boundary exists to prevent, for throughput this
//! batch size does not need.
//!
//! Each pass runs under a distributed lock so two worker instances never
//! reconcile concurrently. Cache invalidation happens after each commit and
//! is best-effort: a missed invalidation means a stale read until TTL, not
//! an inventory error, because the transaction already fixed the source of
//! truth.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use stockroom_cache::domain::InventoryCache;
use stockroom_cache::{CacheStore, LockError, LockManager, LockOptions};
use stockroom_core::reconciliation::ReconcileWindows;
use stockroom_db::repositories::{HoldReleaseError, OrderRepo};
use stockroom_db::DbPool;

/// Resource key guarding the pass against concurrent worker instances.
const PASS_LOCK_RESOURCE: &str = "reconciler:pass";

/// Lease TTL for the pass lock. Must outlive the slowest realistic pass;
/// a crashed worker frees the lock after this bound.
const PASS_LOCK_TTL: Duration = Duration::from_secs(300);

/// Outcome counts for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Expired holds selected.
    pub scanned: usize,
    /// Orders cancelled with reservations released.
    pub cancelled: usize,
    /// Orders that left the expirable state between selection and
    /// processing (benign).
    pub skipped: usize,
    /// Orders whose transaction failed; they stay eligible for the next
    /// pass.
    pub failed: usize,
}

/// Background service that cancels expired order holds on a fixed interval.
pub struct ReservationReconciler {
    pool: DbPool,
    locks: LockManager,
    inventory_cache: InventoryCache,
    windows: ReconcileWindows,
    interval: Duration,
}

impl ReservationReconciler {
    /// Build a reconciler sharing the given store client for its lock and
    /// its inventory-cache invalidations.
    pub fn new(
        pool: DbPool,
        store: &CacheStore,
        windows: ReconcileWindows,
        interval: Duration,
    ) -> Self {
        Self {
            pool,
            locks: LockManager::new(store),
            inventory_cache: InventoryCache::new(store.clone()),
            windows,
            interval,
        }
    }

    /// Run the reconciliation loop until `cancel` is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            short_window_mins = self.windows.short.num_minutes(),
            medium_window_mins = self.windows.medium.num_minutes(),
            "Reservation reconciler started"
        );

        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Reservation reconciler stopping");
                    break;
                }
                _ = interval.tick() => {
                    self.run_guarded().await;
                }
            }
        }
    }

    /// Run one pass under the cross-instance lock.
    ///
    /// A single attempt with no retry: if another instance holds the lock,
    /// this tick is skipped and the next interval tries again.
    async fn run_guarded(&self) {
        let outcome = self
            .locks
            .with_lock(
                PASS_LOCK_RESOURCE,
                LockOptions {
                    ttl: PASS_LOCK_TTL,
                    retry_attempts: 1,
                    retry_delay: Duration::from_millis(0),
                },
                || self.run_once(),
            )
            .await;

        match outcome {
            Ok(summary) => {
                if summary.scanned > 0 {
                    tracing::info!(
                        scanned = summary.scanned,
                        cancelled = summary.cancelled,
                        skipped = summary.skipped,
                        failed = summary.failed,
                        "Reconciliation pass complete"
                    );
                } else {
                    tracing::debug!("Reconciliation pass found no expired holds");
                }
            }
            Err(LockError::NotAcquired { .. }) => {
                tracing::debug!("Another reconciler instance holds the pass lock; skipping tick");
            }
            Err(LockError::Work(e)) => {
                tracing::error!(error = %e, "Reconciliation pass failed");
            }
        }
    }

    /// Execute one reconciliation pass.
    ///
    /// Public so admin tooling can trigger an immediate pass and tests can
    /// drive the reconciler without wall-clock sleeps. Per-order failures
    /// are isolated: they are logged and counted, and the batch continues.
    /// Only the selection query itself can fail the pass.
    pub async fn run_once(&self) -> Result<ReconcileSummary, sqlx::Error> {
        let holds = OrderRepo::list_expired_holds(&self.pool, &self.windows, Utc::now()).await?;

        let mut summary = ReconcileSummary {
            scanned: holds.len(),
            ..Default::default()
        };

        for hold in &holds {
            match OrderRepo::cancel_expired_hold(&self.pool, hold).await {
                Ok(touched_variants) => {
                    summary.cancelled += 1;
                    tracing::info!(
                        order_id = hold.order.id,
                        class = ?hold.class,
                        variants = touched_variants.len(),
                        "Expired hold cancelled; reservations released"
                    );
                    self.invalidate_variants(&touched_variants).await;
                }
                Err(HoldReleaseError::NoLongerEligible { order_id }) => {
                    summary.skipped += 1;
                    tracing::debug!(order_id, "Hold changed since selection; skipped");
                }
                Err(e @ HoldReleaseError::ReservedUnderflow { .. }) => {
                    summary.failed += 1;
                    tracing::error!(
                        order_id = hold.order.id,
                        error = %e,
                        "Reservation accounting violation; order rolled back"
                    );
                }
                Err(HoldReleaseError::Db(e)) => {
                    summary.failed += 1;
                    tracing::error!(
                        order_id = hold.order.id,
                        error = %e,
                        "Cancel-and-release transaction failed; will retry next pass"
                    );
                }
            }
        }

        Ok(summary)
    }

    /// Best-effort cache invalidation for every touched variant.
    async fn invalidate_variants(&self, variant_ids: &[i64]) {
        for &variant_id in variant_ids {
            if let Err(e) = self.inventory_cache.invalidate(variant_id).await {
                tracing::warn!(
                    variant_id,
                    error = %e,
                    "Inventory cache invalidation failed; entry will age out via TTL"
                );
            }
        }
    }
}
