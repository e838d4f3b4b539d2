use async_trait::async_trait;
use dashmap::DashMap;
use jiff::{SignedDuration, Timestamp};
use linkshard_core::{Clock, ShortCode, SystemClock, UrlCache};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use crate::Result;

#[derive(Debug, Clone)]
struct Entry {
    long_url: String,
    expires_at: Timestamp,
}

/// Minimum clock time between two purges triggered by writes.
const PURGE_INTERVAL_MS: i64 = 60_000;

/// A process-local cache whose TTLs follow an injected [`Clock`].
///
/// Entries are checked against the clock on read, so advancing a
/// [`linkshard_core::ManualClock`] expires them without waiting. Entries
/// never read again are dropped by a purge that writes run at most once
/// per minute of clock time.
#[derive(Debug, Clone)]
pub struct InMemoryUrlCache<K = SystemClock> {
    entries: Arc<DashMap<String, Entry>>,
    last_purge_ms: Arc<AtomicI64>,
    clock: K,
}

impl InMemoryUrlCache<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for InMemoryUrlCache<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clock> InMemoryUrlCache<K> {
    pub fn with_clock(clock: K) -> Self {
        let now_ms = clock.now().as_millisecond();
        Self {
            entries: Arc::new(DashMap::new()),
            last_purge_ms: Arc::new(AtomicI64::new(now_ms)),
            clock,
        }
    }

    /// Drops every entry expired by now and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        self.last_purge_ms
            .store(now.as_millisecond(), Ordering::Release);
        self.purge_at(now)
    }

    fn purge_at(&self, now: Timestamp) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at > now);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "Purged expired cache entries");
        }
        removed
    }

    /// Purges if the last purge is at least [`PURGE_INTERVAL_MS`] old.
    fn maybe_purge(&self, now: Timestamp) {
        let now_ms = now.as_millisecond();
        let last = self.last_purge_ms.load(Ordering::Acquire);
        if now_ms.saturating_sub(last) < PURGE_INTERVAL_MS {
            return;
        }
        // only one writer purges per interval
        if self
            .last_purge_ms
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.purge_at(now);
        }
    }

    /// Number of stored entries, including expired ones not yet dropped.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl<K: Clock> UrlCache for InMemoryUrlCache<K> {
    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>> {
        let now = self.clock.now();
        let key = code.as_str();

        let Some(entry) = self.entries.get(key) else {
            trace!(code = %code, "Cache miss in memory");
            return Ok(None);
        };

        if entry.expires_at <= now {
            drop(entry);
            self.entries.remove_if(key, |_, e| e.expires_at <= now);
            trace!(code = %code, "Cache entry expired");
            return Ok(None);
        }

        trace!(code = %code, "Cache hit in memory");
        Ok(Some(entry.long_url.clone()))
    }

    async fn set_url(&self, code: &ShortCode, long_url: &str, ttl: Duration) -> Result<()> {
        let now = self.clock.now();
        let ttl = SignedDuration::try_from(ttl).unwrap_or(SignedDuration::MAX);
        let expires_at = now.checked_add(ttl).unwrap_or(Timestamp::MAX);

        self.entries.insert(
            code.as_str().to_string(),
            Entry {
                long_url: long_url.to_string(),
                expires_at,
            },
        );
        self.maybe_purge(now);
        Ok(())
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        self.entries.remove(code.as_str());
        Ok(())
    }
}
