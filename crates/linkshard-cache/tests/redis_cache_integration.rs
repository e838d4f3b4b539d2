//! Runs against a real Redis container; needs Docker.

use std::time::Duration;

use linkshard_cache::{CacheLayer, RedisUrlCache, UrlCache};
use linkshard_core::ShortCode;
use linkshard_test_infra::redis::RedisServer;

/// Test fixture that manages a Redis container using test-infra.
struct Fixture {
    _redis: RedisServer,
    cache: RedisUrlCache,
}

impl Fixture {
    async fn start() -> Self {
        let redis = RedisServer::new().await.expect("start redis");
        let url = redis.redis_url().await.expect("redis url");
        let cache = RedisUrlCache::connect(&url).await.expect("connect redis");
        Self {
            _redis: redis,
            cache,
        }
    }
}

fn code(s: &str) -> ShortCode {
    ShortCode::parse(s).unwrap()
}

#[tokio::test]
#[ignore = "requires docker"]
async fn get_set_delete() {
    let fixture = Fixture::start().await;
    let c = code("test12a");

    assert!(fixture.cache.get_url(&c).await.unwrap().is_none());

    fixture
        .cache
        .set_url(&c, "https://example.com", Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(
        fixture.cache.get_url(&c).await.unwrap().as_deref(),
        Some("https://example.com")
    );

    fixture.cache.del(&c).await.unwrap();
    assert!(fixture.cache.get_url(&c).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn entries_expire_natively() {
    let fixture = Fixture::start().await;
    let c = code("ttl123b");

    fixture
        .cache
        .set_url(&c, "https://example.com", Duration::from_secs(1))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(2_100)).await;
    assert!(fixture.cache.get_url(&c).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn layer_skips_expired_writes() {
    let fixture = Fixture::start().await;
    let layer = CacheLayer::new(fixture.cache.clone());
    let c = code("skip12c");

    assert!(!layer.put(&c, "https://example.com", 0).await.unwrap());
    assert!(layer.get(&c).await.unwrap().is_none());
    assert!(layer.put(&c, "https://example.com", 30).await.unwrap());
    assert!(layer.get(&c).await.unwrap().is_some());
}
