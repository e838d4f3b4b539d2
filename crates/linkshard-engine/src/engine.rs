use crate::error::{EngineError, Result};
use crate::shortener::{CreatedLink, LinkStats, Shortener};
use crate::sweeper::{ExpirySweeper, SweepReport};
use crate::validate;
use async_trait::async_trait;
use linkshard_cache::CacheLayer;
use linkshard_core::{Clock, LinkRecord, ShortCode, StorageError, SystemClock, UrlCache};
use linkshard_generator::Generator;
use linkshard_storage::{PartitionHealth, ShardRegistry};
use std::sync::Arc;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

pub const DEFAULT_MAX_ATTEMPTS: usize = 10;
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, TypedBuilder)]
pub struct EngineConfig {
    /// Codes tried by `create` before giving up.
    #[builder(default = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: usize,
    /// Prefix of every short URL handed out.
    #[builder(default = DEFAULT_BASE_URL.to_string(), setter(into))]
    pub base_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// The sharded short-link engine.
///
/// Routes each code to its partition by selector, reads through a
/// cache-aside [`CacheLayer`] and treats the partitions as the source of
/// truth. Cache failures degrade `resolve` to a store read; during `create`
/// they abort the call with [`EngineError::StorageUnavailable`].
pub struct ResolutionEngine<C, G, K = SystemClock> {
    registry: Arc<ShardRegistry>,
    cache: CacheLayer<C>,
    generator: G,
    clock: K,
    sweeper: ExpirySweeper,
    config: EngineConfig,
}

impl<C, G, K> std::fmt::Debug for ResolutionEngine<C, G, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionEngine")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C, G, K> ResolutionEngine<C, G, K>
where
    C: UrlCache,
    G: Generator,
    K: Clock,
{
    pub fn new(
        registry: Arc<ShardRegistry>,
        cache: CacheLayer<C>,
        generator: G,
        clock: K,
        config: EngineConfig,
    ) -> Self {
        let sweeper = ExpirySweeper::new(Arc::clone(&registry));
        Self {
            registry,
            cache,
            generator,
            clock,
            sweeper,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<ShardRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Like [`Shortener::sweep`], reporting which partitions failed.
    pub async fn sweep_report(&self) -> SweepReport {
        self.sweeper.sweep(self.clock.now()).await
    }

    /// Pings every registered partition.
    pub async fn health(&self) -> Vec<PartitionHealth> {
        self.registry.health().await
    }

    /// Probes one generated code: `Ok(None)` means it is already taken.
    async fn try_claim(
        &self,
        code: &ShortCode,
        long_url: &str,
        days_to_live: u32,
    ) -> Result<Option<LinkRecord>> {
        match self.cache.get(code).await {
            Ok(Some(_)) => return Ok(None),
            Ok(None) => {}
            Err(e) => {
                return Err(EngineError::StorageUnavailable(format!(
                    "cache check for {code} failed: {e}"
                )))
            }
        }

        let partition = self.registry.resolve(code.selector())?;
        let record = LinkRecord::new(code.payload(), long_url, self.clock.now(), days_to_live);

        match partition.put(record.clone()).await {
            Ok(()) => Ok(Some(record)),
            Err(StorageError::DuplicateKey(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl<C, G, K> Shortener for ResolutionEngine<C, G, K>
where
    C: UrlCache,
    G: Generator,
    K: Clock,
{
    async fn create(&self, long_url: &str, days_to_live: u32) -> Result<CreatedLink> {
        validate::long_url(long_url)?;
        validate::days_to_live(days_to_live)?;

        for attempt in 1..=self.config.max_attempts {
            let code = self.generator.generate();

            let Some(record) = self.try_claim(&code, long_url, days_to_live).await? else {
                debug!(code = %code, attempt, "Short code collision, retrying");
                continue;
            };

            let ttl_secs = i64::from(days_to_live) * SECONDS_PER_DAY;
            if let Err(e) = self.cache.put(&code, long_url, ttl_secs).await {
                warn!(code = %code, error = %e, "Failed to cache new short link");
                return Err(EngineError::StorageUnavailable(format!(
                    "caching {code} failed: {e}"
                )));
            }

            info!(code = %code, attempt, days_to_live, "Short link created");
            return Ok(CreatedLink {
                short_url: code.to_url(&self.config.base_url),
                code,
                long_url: record.long_url,
                expires_at: record.expires_at,
                days_to_live,
            });
        }

        warn!(
            attempts = self.config.max_attempts,
            "No unique short code found"
        );
        Err(EngineError::CodeSpaceExhausted {
            attempts: self.config.max_attempts,
        })
    }

    async fn resolve(&self, code: &str) -> Result<String> {
        let code = ShortCode::parse(code)?;

        match self.cache.get(&code).await {
            Ok(Some(long_url)) => {
                debug!(code = %code, "Cache hit");
                return Ok(long_url);
            }
            Ok(None) => debug!(code = %code, "Cache miss"),
            Err(e) => warn!(code = %code, error = %e, "Cache unavailable, reading from store"),
        }

        let partition = self.registry.resolve(code.selector())?;
        let record = partition
            .get(code.payload())
            .await?
            .ok_or_else(|| EngineError::NotFound(code.to_string()))?;

        let now = self.clock.now();
        if record.is_expired_at(now) {
            if let Err(e) = partition.delete_one(code.payload()).await {
                warn!(code = %code, error = %e, "Failed to delete expired record");
            }
            if let Err(e) = self.cache.invalidate(&code).await {
                warn!(code = %code, error = %e, "Failed to invalidate expired cache entry");
            }
            info!(code = %code, "Short link expired");
            return Err(EngineError::Expired(code.to_string()));
        }

        if let Err(e) = self
            .cache
            .put(&code, &record.long_url, record.remaining_secs(now))
            .await
        {
            warn!(code = %code, error = %e, "Failed to repopulate cache");
        }

        Ok(record.long_url)
    }

    async fn stats(&self, code: &str) -> Result<LinkStats> {
        let code = ShortCode::parse(code)?;
        let partition = self.registry.resolve(code.selector())?;
        let record = partition
            .get(code.payload())
            .await?
            .ok_or_else(|| EngineError::NotFound(code.to_string()))?;

        Ok(LinkStats {
            is_expired: record.is_expired_at(self.clock.now()),
            code,
            long_url: record.long_url,
            created_at: record.created_at,
            expires_at: record.expires_at,
        })
    }

    async fn sweep(&self) -> u64 {
        self.sweep_report().await.removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jiff::{SignedDuration, Timestamp};
    use linkshard_cache::InMemoryUrlCache;
    use linkshard_core::partition::Result as StorageResult;
    use linkshard_core::{CacheError, ManualClock, Partition, Selector};
    use linkshard_generator::{RandomGenerator, ReplayGenerator};
    use linkshard_storage::{InMemoryConnector, InMemoryPartition, PartitionConfig, RegistrySettings};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    type TestEngine<G> = ResolutionEngine<InMemoryUrlCache<ManualClock>, G, ManualClock>;

    fn start() -> Timestamp {
        Timestamp::from_second(1_700_000_000).unwrap()
    }

    fn sel(c: char) -> Selector {
        Selector::new(c).unwrap()
    }

    fn code(s: &str) -> ShortCode {
        ShortCode::parse(s).unwrap()
    }

    fn is_well_formed_code(s: &str) -> bool {
        s.len() == 7
            && s[..6].bytes().all(|b| b.is_ascii_alphanumeric())
            && s[6..]
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
    }

    async fn registry(selectors: &str) -> Arc<ShardRegistry> {
        let configs: Vec<PartitionConfig> = selectors
            .chars()
            .map(|c| PartitionConfig::new(sel(c), ""))
            .collect();
        let registry = ShardRegistry::connect(&configs, &InMemoryConnector, RegistrySettings::default())
            .await
            .unwrap();
        Arc::new(registry)
    }

    fn engine<G: Generator>(
        registry: Arc<ShardRegistry>,
        generator: G,
        clock: &ManualClock,
    ) -> TestEngine<G> {
        ResolutionEngine::new(
            registry,
            CacheLayer::new(InMemoryUrlCache::with_clock(clock.clone())),
            generator,
            clock.clone(),
            EngineConfig::default(),
        )
    }

    /// Fails every call, or hangs forever when `stall` is set.
    struct BrokenCache {
        stall: bool,
    }

    #[async_trait]
    impl UrlCache for BrokenCache {
        async fn get_url(&self, _code: &ShortCode) -> linkshard_core::cache::Result<Option<String>> {
            if self.stall {
                std::future::pending::<()>().await;
            }
            Err(CacheError::Unavailable("cache is down".into()))
        }

        async fn set_url(
            &self,
            _code: &ShortCode,
            _long_url: &str,
            _ttl: Duration,
        ) -> linkshard_core::cache::Result<()> {
            Err(CacheError::Unavailable("cache is down".into()))
        }

        async fn del(&self, _code: &ShortCode) -> linkshard_core::cache::Result<()> {
            Err(CacheError::Unavailable("cache is down".into()))
        }
    }

    /// An in-memory partition whose reads never complete once stalled.
    #[derive(Default)]
    struct StallingPartition {
        inner: InMemoryPartition,
        stalled: std::sync::atomic::AtomicBool,
        gets: AtomicUsize,
    }

    #[async_trait]
    impl Partition for StallingPartition {
        async fn get(&self, payload: &str) -> StorageResult<Option<LinkRecord>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if self.stalled.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            self.inner.get(payload).await
        }

        async fn put(&self, record: LinkRecord) -> StorageResult<()> {
            self.inner.put(record).await
        }

        async fn delete_one(&self, payload: &str) -> StorageResult<bool> {
            self.inner.delete_one(payload).await
        }

        async fn delete_expired_before(&self, now: Timestamp) -> StorageResult<u64> {
            self.inner.delete_expired_before(now).await
        }

        async fn ping(&self) -> StorageResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn create_then_resolve_until_expiry() {
        let clock = ManualClock::new(start());
        let engine = engine(registry("ab").await, RandomGenerator::seeded(7), &clock);

        let created = engine.create("https://example.com/a", 1).await.unwrap();
        assert!(is_well_formed_code(created.code.as_str()));
        assert_eq!(
            created.short_url,
            format!("http://localhost:3000/api/{}", created.code)
        );
        assert_eq!(created.expires_at, start() + SignedDuration::from_hours(24));

        let url = engine.resolve(created.code.as_str()).await.unwrap();
        assert_eq!(url, "https://example.com/a");

        clock.advance(SignedDuration::from_hours(24) + SignedDuration::from_secs(1));
        let err = engine.resolve(created.code.as_str()).await.unwrap_err();
        assert!(matches!(err, EngineError::Expired(_)));

        // the expired record was removed on the way out
        let err = engine.resolve(created.code.as_str()).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn resolve_reads_through_the_store_on_cache_miss() {
        let clock = ManualClock::new(start());
        let registry = registry("a").await;
        let engine = engine(Arc::clone(&registry), RandomGenerator::seeded(1), &clock);

        let created = engine.create("https://example.com/b", 2).await.unwrap();
        engine.cache.invalidate(&created.code).await.unwrap();
        assert!(engine.cache.inner().is_empty());

        assert_eq!(
            engine.resolve(created.code.as_str()).await.unwrap(),
            "https://example.com/b"
        );
        // repopulated with the remaining lifetime
        assert_eq!(engine.cache.inner().len(), 1);
    }

    #[tokio::test]
    async fn collision_in_store_retries_with_the_next_code() {
        let clock = ManualClock::new(start());
        let registry = registry("ab").await;
        let taken = code("aaaaaaa");
        let free = code("bbbbbbb");

        let partition = registry.resolve(taken.selector()).unwrap();
        partition
            .put(LinkRecord::new(taken.payload(), "https://taken.example", start(), 30))
            .await
            .unwrap();

        let generator = Arc::new(ReplayGenerator::new([taken.clone(), free.clone()]));
        let engine = engine(Arc::clone(&registry), Arc::clone(&generator), &clock);

        let created = engine.create("https://example.com/c", 30).await.unwrap();
        assert_eq!(created.code, free);
        assert_eq!(generator.issued(), 2);

        // the original record was not overwritten
        assert_eq!(
            engine.resolve(taken.as_str()).await.unwrap(),
            "https://taken.example"
        );
    }

    #[tokio::test]
    async fn collision_in_cache_retries_without_touching_the_store() {
        let clock = ManualClock::new(start());
        let registry = registry("ab").await;
        let cached = code("ccccccb");
        let free = code("ddddddb");
        let engine = engine(
            Arc::clone(&registry),
            ReplayGenerator::new([cached.clone(), free.clone()]),
            &clock,
        );
        engine
            .cache
            .put(&cached, "https://cached.example", 60)
            .await
            .unwrap();

        let created = engine.create("https://example.com/d", 30).await.unwrap();
        assert_eq!(created.code, free);

        let partition = registry.resolve(sel('b')).unwrap();
        assert!(partition.get(cached.payload()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_gives_up_after_max_attempts() {
        let clock = ManualClock::new(start());
        let registry = registry("a").await;
        let taken = code("zzzzzza");
        registry
            .resolve(taken.selector())
            .unwrap()
            .put(LinkRecord::new(taken.payload(), "https://taken.example", start(), 30))
            .await
            .unwrap();

        let generator = Arc::new(ReplayGenerator::new([taken]));
        let engine = engine(registry, Arc::clone(&generator), &clock);

        let err = engine.create("https://example.com/e", 30).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::CodeSpaceExhausted {
                attempts: DEFAULT_MAX_ATTEMPTS
            }
        ));
        assert!(err.is_transient());
        assert_eq!(generator.issued(), DEFAULT_MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn single_partition_serves_every_selector() {
        let clock = ManualClock::new(start());
        let registry = registry("q").await;
        assert!(registry.is_fallback());

        let codes: Vec<ShortCode> = Selector::all()
            .enumerate()
            .map(|(i, s)| ShortCode::new_unchecked(&format!("pay{i:03}"), s))
            .collect();
        assert_eq!(codes.len(), 36);
        let engine = engine(
            Arc::clone(&registry),
            ReplayGenerator::new(codes.clone()),
            &clock,
        );

        for expected in &codes {
            let long_url = format!("https://example.com/{}", expected.selector());
            let created = engine.create(&long_url, 5).await.unwrap();
            assert_eq!(&created.code, expected);
            assert_eq!(engine.resolve(created.code.as_str()).await.unwrap(), long_url);
        }

        // a payload is looked up in the one partition whatever the selector
        assert_eq!(
            engine.resolve("pay000z").await.unwrap(),
            "https://example.com/0"
        );
    }

    #[tokio::test]
    async fn unmapped_selector_falls_back_to_the_first_partition() {
        let clock = ManualClock::new(start());
        let registry = registry("ab").await;
        let engine = engine(
            Arc::clone(&registry),
            ReplayGenerator::new([code("xxxxxx9")]),
            &clock,
        );

        engine.create("https://example.com/g", 3).await.unwrap();
        assert!(registry.is_fallback());

        let first = registry.resolve(sel('a')).unwrap();
        assert!(first.get("xxxxxx").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn concurrent_creates_hand_out_distinct_codes() {
        let clock = ManualClock::new(start());
        let engine = Arc::new(engine(
            registry("abc").await,
            RandomGenerator::seeded(42),
            &clock,
        ));

        let tasks: Vec<_> = (0..64)
            .map(|i| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    engine
                        .create(&format!("https://example.com/{i}"), 7)
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut codes = HashSet::new();
        for task in tasks {
            let created = task.await.unwrap();
            assert_eq!(
                engine.resolve(created.code.as_str()).await.unwrap(),
                created.long_url
            );
            codes.insert(created.code);
        }
        assert_eq!(codes.len(), 64);
    }

    #[tokio::test]
    async fn sweep_counts_removed_records() {
        let clock = ManualClock::new(start());
        let engine = engine(registry("ab").await, RandomGenerator::seeded(3), &clock);

        for days in [1, 1, 2, 10] {
            engine.create("https://example.com/h", days).await.unwrap();
        }

        clock.advance(SignedDuration::from_hours(48));
        assert_eq!(engine.sweep().await, 3);
        assert_eq!(engine.sweep().await, 0);

        let report = engine.sweep_report().await;
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn stats_reports_expired_records_without_deleting_them() {
        let clock = ManualClock::new(start());
        let engine = engine(registry("ab").await, RandomGenerator::seeded(5), &clock);
        let created = engine.create("https://example.com/i", 1).await.unwrap();

        let stats = engine.stats(created.code.as_str()).await.unwrap();
        assert_eq!(stats.long_url, "https://example.com/i");
        assert_eq!(stats.created_at, start());
        assert!(!stats.is_expired);

        clock.advance(SignedDuration::from_hours(24));
        let stats = engine.stats(created.code.as_str()).await.unwrap();
        assert!(stats.is_expired);
        assert!(engine.stats(created.code.as_str()).await.is_ok());

        assert!(matches!(
            engine.stats("AAAAAA0").await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn invalid_input_is_rejected_before_generating() {
        let clock = ManualClock::new(start());
        let generator = Arc::new(RandomGenerator::seeded(9));
        let engine = engine(registry("a").await, Arc::clone(&generator), &clock);

        for (url, days) in [
            ("invalid-url", 30),
            ("ftp://example.com", 30),
            ("https://example.com", 0),
            ("https://example.com", 366),
        ] {
            assert!(matches!(
                engine.create(url, days).await,
                Err(EngineError::InvalidInput(_))
            ));
        }
    }

    #[tokio::test]
    async fn malformed_codes_fail_without_io() {
        let clock = ManualClock::new(start());
        let partition = Arc::new(StallingPartition::default());
        let registry = ShardRegistry::from_partitions(
            [(sel('a'), Arc::clone(&partition) as Arc<dyn Partition>)],
            Duration::from_secs(1),
        )
        .unwrap();
        let engine = engine(Arc::new(registry), RandomGenerator::seeded(2), &clock);

        for bad in ["", "abc", "abcdefgh", "abc-12a", "abcdef!"] {
            assert!(matches!(
                engine.resolve(bad).await,
                Err(EngineError::MalformedCode(_))
            ));
        }
        // upper-case selectors are outside the selector alphabet
        assert!(matches!(
            engine.resolve("abcdefA").await,
            Err(EngineError::MalformedCode(_))
        ));
        assert_eq!(partition.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_cache_degrades_resolve_to_the_store() {
        let clock = ManualClock::new(start());
        let registry = registry("ab").await;
        let stored = code("eeeeeea");
        registry
            .resolve(stored.selector())
            .unwrap()
            .put(LinkRecord::new(stored.payload(), "https://example.com/j", start(), 30))
            .await
            .unwrap();

        let engine = ResolutionEngine::new(
            registry,
            CacheLayer::with_timeout(BrokenCache { stall: true }, Duration::from_millis(50)),
            RandomGenerator::seeded(4),
            clock,
            EngineConfig::default(),
        );

        assert_eq!(
            engine.resolve(stored.as_str()).await.unwrap(),
            "https://example.com/j"
        );
    }

    #[tokio::test]
    async fn unavailable_cache_fails_create() {
        let clock = ManualClock::new(start());
        let engine = ResolutionEngine::new(
            registry("a").await,
            CacheLayer::new(BrokenCache { stall: false }),
            RandomGenerator::seeded(4),
            clock,
            EngineConfig::default(),
        );

        let err = engine.create("https://example.com/k", 30).await.unwrap_err();
        assert!(matches!(err, EngineError::StorageUnavailable(_)));
    }

    /// Reads miss; writes never complete.
    struct WriteStallingCache;

    #[async_trait]
    impl UrlCache for WriteStallingCache {
        async fn get_url(&self, _code: &ShortCode) -> linkshard_core::cache::Result<Option<String>> {
            Ok(None)
        }

        async fn set_url(
            &self,
            _code: &ShortCode,
            _long_url: &str,
            _ttl: Duration,
        ) -> linkshard_core::cache::Result<()> {
            std::future::pending().await
        }

        async fn del(&self, _code: &ShortCode) -> linkshard_core::cache::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_cache_write_fails_create() {
        let clock = ManualClock::new(start());
        let engine = ResolutionEngine::new(
            registry("ab").await,
            CacheLayer::with_timeout(WriteStallingCache, Duration::from_millis(50)),
            RandomGenerator::seeded(12),
            clock,
            EngineConfig::default(),
        );

        let err = engine.create("https://example.com/a", 1).await.unwrap_err();
        assert!(matches!(err, EngineError::StorageUnavailable(_)));
        assert!(err.is_transient());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_partition_surfaces_as_storage_unavailable() {
        let clock = ManualClock::new(start());
        let partition = Arc::new(StallingPartition::default());
        partition.stalled.store(true, Ordering::SeqCst);
        let registry = ShardRegistry::from_partitions(
            [(sel('a'), Arc::clone(&partition) as Arc<dyn Partition>)],
            Duration::from_millis(100),
        )
        .unwrap();
        let engine = engine(Arc::new(registry), RandomGenerator::seeded(6), &clock);

        let err = engine.resolve("ffffffa").await.unwrap_err();
        assert!(matches!(err, EngineError::StorageUnavailable(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn disconnected_registry_reports_no_partitions() {
        let clock = ManualClock::new(start());
        let registry = registry("ab").await;
        let engine = engine(Arc::clone(&registry), RandomGenerator::seeded(8), &clock);
        registry.disconnect().await;

        assert!(matches!(
            engine.create("https://example.com/l", 1).await,
            Err(EngineError::NoPartitionsAvailable)
        ));
        assert!(matches!(
            engine.resolve("gggggga").await,
            Err(EngineError::NoPartitionsAvailable)
        ));
        assert!(engine.health().await.is_empty());
    }
}
