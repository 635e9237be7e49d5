use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockroom_cache::CacheStore;
use stockroom_worker::config::WorkerConfig;
use stockroom_worker::reconciler::ReservationReconciler;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stockroom_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env();
    tracing::info!(
        interval_secs = config.interval.as_secs(),
        "Loaded worker configuration"
    );

    // --- Database ---
    let pool = stockroom_db::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    stockroom_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    stockroom_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    // --- Key-value store ---
    let store = CacheStore::connect(&config.redis_url)
        .await
        .expect("Failed to connect to Redis");
    store.ping().await.expect("Redis health check failed");
    tracing::info!("Key-value store ready");

    // --- Reconciler ---
    let cancel = CancellationToken::new();
    let reconciler =
        ReservationReconciler::new(pool, &store, config.windows, config.interval);

    let task_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        reconciler.run(task_cancel).await;
    });

    // --- Shutdown ---
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for ctrl-c");
    tracing::info!("Shutdown signal received");

    cancel.cancel();
    if let Err(e) = handle.await {
        tracing::error!(error = %e, "Reconciler task did not shut down cleanly");
    }
    tracing::info!("Worker stopped");
}
