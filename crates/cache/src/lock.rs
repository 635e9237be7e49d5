//! Distributed lock manager.
//!
//! A lock is a Redis key `lock:{resource}` holding a random 128-bit token
//! with a TTL. Acquisition is a single `SET NX EX` (set-if-absent with
//! expiry in one atomic command — never check-then-set), so at most one
//! live lease exists per resource at any instant. Release is a Lua
//! compare-and-delete: the key is removed only if it still holds the
//! caller's token, in one server-side step, so a lease that expired and was
//! re-acquired by someone else can never be deleted by the old holder.
//!
//! TTL expiry is the self-healing bound: a crashed holder delays the
//! resource until the lease times out, nothing more. There is no fairness,
//! no queueing, and no auto-renewal — callers must size the TTL above the
//! expected duration of the protected work.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use redis::aio::ConnectionManager;

use crate::store::CacheStore;

/// Compare-and-delete: remove the lease only if it still holds our token.
const RELEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
else
    return 0
end
"#;

/// Proof of lease ownership, returned by a successful acquire.
///
/// The token value is opaque to callers; it exists only to be handed back
/// to [`LockManager::release`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken(String);

impl LockToken {
    /// Generate a fresh unguessable token: 128 random bits, hex-encoded.
    fn generate() -> Self {
        Self(format!("{:032x}", rand::rng().random::<u128>()))
    }

    fn as_str(&self) -> &str {
        &self.0
    }
}

/// Retry policy for the scoped executor, [`LockManager::with_lock`].
///
/// Contention here is expected to be short-lived (tens to low-hundreds of
/// milliseconds); the retry loop is a bounded wait, not a queue. Callers
/// needing a hard deadline compute it as `retry_attempts * retry_delay`.
#[derive(Debug, Clone, Copy)]
pub struct LockOptions {
    /// Lease TTL. Must exceed the expected duration of the protected work.
    pub ttl: Duration,
    /// Total acquire attempts before giving up (minimum 1).
    pub retry_attempts: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
            retry_attempts: 3,
            retry_delay: Duration::from_millis(100),
        }
    }
}

/// Error from the scoped executor.
#[derive(Debug, thiserror::Error)]
pub enum LockError<E: std::error::Error> {
    /// The lock could not be acquired within the retry budget. The
    /// protected work was never invoked.
    #[error("could not acquire lock on `{resource}` after {attempts} attempt(s)")]
    NotAcquired { resource: String, attempts: u32 },

    /// The lock was held and the work itself failed.
    #[error("lock-protected work failed: {0}")]
    Work(E),
}

/// Acquires and releases named, token-authenticated, TTL-bounded leases.
///
/// General-purpose: any caller wrapping a scarce resource ("only one
/// in-flight campaign send", "only one concurrent reindex") may use it.
/// Resource keys must be unique per protected resource and stable across
/// retries. Orthogonal to database transactions: the lock protects
/// cross-process workflow exclusivity, the transaction protects the data.
#[derive(Clone)]
pub struct LockManager {
    conn: ConnectionManager,
}

impl LockManager {
    /// Build a lock manager sharing the given store's connection.
    pub fn new(store: &CacheStore) -> Self {
        Self {
            conn: store.connection(),
        }
    }

    fn lock_key(resource: &str) -> String {
        format!("lock:{resource}")
    }

    /// Try to acquire the lease for `resource`. Never blocks.
    ///
    /// Returns a fresh token on success, `None` if the lease is already
    /// held. Fails closed: if the store is unreachable the attempt is
    /// logged and reported as not acquired, never as a false success.
    pub async fn acquire(&self, resource: &str, ttl: Duration) -> Option<LockToken> {
        let mut conn = self.conn.clone();
        let key = Self::lock_key(resource);
        let token = LockToken::generate();
        let ttl_seconds = ttl.as_secs().max(1);

        let reply: Result<Option<String>, redis::RedisError> = redis::cmd("SET")
            .arg(&key)
            .arg(token.as_str())
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await;

        match reply {
            Ok(Some(_)) => {
                tracing::debug!(resource, ttl_seconds, "Lock acquired");
                Some(token)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(resource, error = %e, "Lock acquire failed; treating as held");
                None
            }
        }
    }

    /// Release the lease for `resource`, but only if `token` still owns it.
    ///
    /// Returns whether removal happened. `false` — wrong token, or the
    /// lease already expired — is a normal outcome, not a fault. Store
    /// errors are logged and reported as `false`; a missed release only
    /// delays the resource until TTL expiry.
    pub async fn release(&self, resource: &str, token: &LockToken) -> bool {
        let mut conn = self.conn.clone();
        let key = Self::lock_key(resource);

        let reply: Result<i64, redis::RedisError> = redis::Script::new(RELEASE_SCRIPT)
            .key(&key)
            .arg(token.as_str())
            .invoke_async(&mut conn)
            .await;

        match reply {
            Ok(removed) => removed > 0,
            Err(e) => {
                tracing::warn!(resource, error = %e, "Lock release failed; lease will expire via TTL");
                false
            }
        }
    }

    /// Run `work` under the lease for `resource`.
    ///
    /// Attempts `acquire` up to `opts.retry_attempts` times with a fixed
    /// delay between attempts. On first success the work runs and the lease
    /// is always released afterwards — on every exit path, including a
    /// failed work — before the outcome propagates. If every attempt fails,
    /// returns [`LockError::NotAcquired`] without ever invoking `work`.
    pub async fn with_lock<F, Fut, T, E>(
        &self,
        resource: &str,
        opts: LockOptions,
        work: F,
    ) -> Result<T, LockError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error,
    {
        let attempts = opts.retry_attempts.max(1);

        for attempt in 1..=attempts {
            if let Some(token) = self.acquire(resource, opts.ttl).await {
                let outcome = work().await;

                if !self.release(resource, &token).await {
                    // Lease expired mid-work or the store dropped; TTL has
                    // already made the resource available again.
                    tracing::debug!(resource, "Lock was gone at release time");
                }

                return outcome.map_err(LockError::Work);
            }

            if attempt < attempts {
                tokio::time::sleep(opts.retry_delay).await;
            }
        }

        Err(LockError::NotAcquired {
            resource: resource.to_string(),
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_128_bit_hex() {
        let token = LockToken::generate();
        assert_eq!(token.as_str().len(), 32);
        assert!(token.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_are_unique() {
        let a = LockToken::generate();
        let b = LockToken::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn lock_keys_are_namespaced() {
        assert_eq!(LockManager::lock_key("reindex"), "lock:reindex");
        assert_eq!(
            LockManager::lock_key("reconciler:pass"),
            "lock:reconciler:pass"
        );
    }

    #[test]
    fn default_options_bound_the_wait() {
        let opts = LockOptions::default();
        assert_eq!(opts.retry_attempts, 3);
        assert_eq!(opts.retry_delay, Duration::from_millis(100));
        assert_eq!(opts.ttl, Duration::from_secs(30));
    }
}
