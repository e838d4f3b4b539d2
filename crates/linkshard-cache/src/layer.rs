use crate::Result;
use linkshard_core::{CacheError, ShortCode, UrlCache};
use std::future::Future;
use std::time::Duration;
use tracing::trace;

/// Default upper bound for a single cache call.
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_millis(500);

/// Read-through / write-through accessor over a single [`UrlCache`].
///
/// Every call is bounded by `timeout`; an elapsed call yields
/// [`CacheError::Timeout`]. Writes with a non-positive TTL are skipped so an
/// expired record can never be cached.
#[derive(Debug, Clone)]
pub struct CacheLayer<C> {
    inner: C,
    timeout: Duration,
}

impl<C: UrlCache> CacheLayer<C> {
    pub fn new(inner: C) -> Self {
        Self::with_timeout(inner, DEFAULT_CACHE_TIMEOUT)
    }

    pub fn with_timeout(inner: C, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Returns a reference to the wrapped cache.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Pure cache read, no fallback.
    pub async fn get(&self, code: &ShortCode) -> Result<Option<String>> {
        self.bounded("get", self.inner.get_url(code)).await
    }

    /// Writes `long_url` under `code` for `ttl_secs` seconds.
    ///
    /// Returns `Ok(false)` without touching the cache when `ttl_secs <= 0`.
    pub async fn put(&self, code: &ShortCode, long_url: &str, ttl_secs: i64) -> Result<bool> {
        let secs = u64::try_from(ttl_secs).unwrap_or(0);
        if secs == 0 {
            trace!(code = %code, ttl_secs, "Skipping cache write for expired entry");
            return Ok(false);
        }

        self.bounded("put", self.inner.set_url(code, long_url, Duration::from_secs(secs)))
            .await?;
        Ok(true)
    }

    /// Explicitly removes the entry for `code`.
    pub async fn invalidate(&self, code: &ShortCode) -> Result<()> {
        self.bounded("invalidate", self.inner.del(code)).await
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(format!(
                "cache {operation} exceeded {:?}",
                self.timeout
            ))),
        }
    }
}
