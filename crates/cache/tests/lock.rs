//! Integration tests for the distributed lock manager against a real Redis.
//!
//! Gated on `REDIS_URL`: tests skip (and say so) when no store is
//! available, so the suite stays green on machines without Redis.

use std::time::Duration;

use assert_matches::assert_matches;
use rand::Rng;
use stockroom_cache::{CacheStore, LockError, LockManager, LockOptions};

async fn test_store() -> Option<CacheStore> {
    let Ok(url) = std::env::var("REDIS_URL") else {
        eprintln!("REDIS_URL not set; skipping lock integration test");
        return None;
    };
    Some(CacheStore::connect(&url).await.expect("Redis connect failed"))
}

/// Unique resource name per test run, so parallel runs never collide.
fn resource(name: &str) -> String {
    format!("test:{name}:{:016x}", rand::rng().random::<u64>())
}

#[tokio::test]
async fn second_acquire_on_held_lock_returns_none() {
    let Some(store) = test_store().await else { return };
    let locks = LockManager::new(&store);
    let res = resource("exclusive");

    let token = locks.acquire(&res, Duration::from_secs(10)).await;
    assert!(token.is_some());
    assert!(locks.acquire(&res, Duration::from_secs(10)).await.is_none());

    locks.release(&res, &token.unwrap()).await;
}

#[tokio::test]
async fn concurrent_acquires_never_both_succeed() {
    let Some(store) = test_store().await else { return };
    let locks = LockManager::new(&store);
    let res = resource("race");

    let (a, b) = tokio::join!(
        locks.acquire(&res, Duration::from_secs(10)),
        locks.acquire(&res, Duration::from_secs(10)),
    );
    assert!(
        a.is_some() ^ b.is_some(),
        "exactly one of two concurrent acquires must win"
    );

    let winner = a.or(b).unwrap();
    assert!(locks.release(&res, &winner).await);
}

#[tokio::test]
async fn release_requires_the_matching_token() {
    let Some(store) = test_store().await else { return };
    let locks = LockManager::new(&store);
    let res = resource("token-check");
    let other = resource("token-check-other");

    let token = locks.acquire(&res, Duration::from_secs(10)).await.unwrap();

    // A token from a different lease must never remove this one.
    let stale = locks.acquire(&other, Duration::from_secs(10)).await.unwrap();
    assert!(!locks.release(&res, &stale).await);
    assert!(
        locks.acquire(&res, Duration::from_secs(10)).await.is_none(),
        "lease must still be held after a wrong-token release"
    );

    assert!(locks.release(&res, &token).await);
    // Releasing an already-released lease is a normal false, not an error.
    assert!(!locks.release(&res, &token).await);

    locks.release(&other, &stale).await;
}

#[tokio::test]
async fn expired_lease_can_be_reacquired() {
    let Some(store) = test_store().await else { return };
    let locks = LockManager::new(&store);
    let res = resource("expiry");

    let first = locks.acquire(&res, Duration::from_secs(1)).await;
    assert!(first.is_some());
    assert!(locks.acquire(&res, Duration::from_secs(1)).await.is_none());

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let second = locks.acquire(&res, Duration::from_secs(10)).await;
    assert!(second.is_some(), "TTL expiry must make the lease available");
    locks.release(&res, &second.unwrap()).await;
}

#[tokio::test]
async fn with_lock_runs_work_and_releases() {
    let Some(store) = test_store().await else { return };
    let locks = LockManager::new(&store);
    let res = resource("scoped");

    let value: Result<i32, LockError<std::io::Error>> = locks
        .with_lock(&res, LockOptions::default(), || async { Ok(41 + 1) })
        .await;
    assert_eq!(value.unwrap(), 42);

    // Lease must be gone: a fresh acquire succeeds immediately.
    let token = locks.acquire(&res, Duration::from_secs(10)).await;
    assert!(token.is_some());
    locks.release(&res, &token.unwrap()).await;
}

#[tokio::test]
async fn with_lock_releases_even_when_work_fails() {
    let Some(store) = test_store().await else { return };
    let locks = LockManager::new(&store);
    let res = resource("scoped-err");

    let outcome: Result<(), LockError<std::io::Error>> = locks
        .with_lock(&res, LockOptions::default(), || async {
            Err(std::io::Error::other("work blew up"))
        })
        .await;
    assert_matches!(outcome, Err(LockError::Work(_)));

    let token = locks.acquire(&res, Duration::from_secs(10)).await;
    assert!(token.is_some(), "lease must be released on the error path");
    locks.release(&res, &token.unwrap()).await;
}

#[tokio::test]
async fn with_lock_on_held_resource_never_invokes_work() {
    let Some(store) = test_store().await else { return };
    let locks = LockManager::new(&store);
    let res = resource("contended");

    let holder = locks.acquire(&res, Duration::from_secs(10)).await.unwrap();

    let mut invoked = false;
    let outcome: Result<(), LockError<std::io::Error>> = locks
        .with_lock(
            &res,
            LockOptions {
                ttl: Duration::from_secs(10),
                retry_attempts: 1,
                retry_delay: Duration::from_millis(10),
            },
            || {
                invoked = true;
                async { Ok(()) }
            },
        )
        .await;

    assert_matches!(outcome, Err(LockError::NotAcquired { attempts: 1, .. }));
    assert!(!invoked, "work must not run when the lock is not acquired");

    locks.release(&res, &holder).await;
}

#[tokio::test]
async fn with_lock_retries_until_the_holder_releases() {
    let Some(store) = test_store().await else { return };
    let locks = LockManager::new(&store);
    let res = resource("retry");

    let holder = locks.acquire(&res, Duration::from_secs(10)).await.unwrap();

    // Release the lease from a second task partway through the retry budget.
    let releaser = {
        let locks = locks.clone();
        let res = res.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            locks.release(&res, &holder).await
        })
    };

    let outcome: Result<&str, LockError<std::io::Error>> = locks
        .with_lock(
            &res,
            LockOptions {
                ttl: Duration::from_secs(10),
                retry_attempts: 10,
                retry_delay: Duration::from_millis(50),
            },
            || async { Ok("ran") },
        )
        .await;

    assert_eq!(outcome.unwrap(), "ran");
    assert!(releaser.await.unwrap());
}
