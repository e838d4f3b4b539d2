mod cli;

use crate::cli::{CacheBackendArg, Command, LogFormat, StorageBackendArg, CLI};
use anyhow::{bail, Context};
use clap::Parser;
use linkshard_cache::{CacheLayer, MokaUrlCache, RedisUrlCache};
use linkshard_core::{SystemClock, UrlCache};
use linkshard_engine::{EngineConfig, ExpirySweeper, ResolutionEngine, Shortener};
use linkshard_generator::RandomGenerator;
use linkshard_storage::{InMemoryConnector, MySqlConnector, RegistrySettings, ShardRegistry};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_format);

    info!(
        storage_backend = %config.storage,
        cache_backend = %config.cache,
        partitions = config.partitions.len(),
        "starting linkshard"
    );

    let settings = RegistrySettings::builder()
        .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
        .op_timeout(Duration::from_millis(config.op_timeout_ms))
        .build();

    let registry = match config.storage {
        StorageBackendArg::InMemory => {
            ShardRegistry::connect(&config.partitions, &InMemoryConnector, settings).await
        }
        StorageBackendArg::Mysql => {
            if let Some(missing) = config.partitions.iter().find(|p| p.dsn.is_empty()) {
                bail!("{missing} has no dsn; mysql storage needs `selector=dsn` entries");
            }
            ShardRegistry::connect(&config.partitions, &MySqlConnector::default(), settings).await
        }
    }
    .context("failed to connect any partition")?;
    let registry = Arc::new(registry);

    let engine_config = EngineConfig::builder()
        .base_url(config.base_url.clone())
        .build();
    let cache_timeout = Duration::from_millis(config.cache_timeout_ms);

    let outcome = match config.cache {
        CacheBackendArg::Moka => {
            let cache = CacheLayer::with_timeout(MokaUrlCache::new(), cache_timeout);
            run(&config.command, Arc::clone(&registry), cache, engine_config).await
        }
        CacheBackendArg::Redis => {
            let redis_url = config
                .redis_url
                .as_deref()
                .context("redis url is required when cache backend is redis")?;
            let cache = RedisUrlCache::connect(redis_url)
                .await
                .context("failed to connect to redis")?;
            let cache = CacheLayer::with_timeout(cache, cache_timeout);
            run(&config.command, Arc::clone(&registry), cache, engine_config).await
        }
    };

    registry.disconnect().await;
    outcome
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run<C: UrlCache>(
    command: &Command,
    registry: Arc<ShardRegistry>,
    cache: CacheLayer<C>,
    config: EngineConfig,
) -> anyhow::Result<()> {
    let engine = ResolutionEngine::new(
        Arc::clone(&registry),
        cache,
        RandomGenerator::new(),
        SystemClock,
        config,
    );

    match command {
        Command::Shorten { url, days } => {
            let created = engine.create(url, *days).await?;
            print_json(&created)?;
        }
        Command::Resolve { code } => {
            let long_url = engine.resolve(code).await?;
            print_json(&json!({ "code": code, "long_url": long_url }))?;
        }
        Command::Stats { code } => {
            let stats = engine.stats(code).await?;
            print_json(&stats)?;
        }
        Command::Sweep { every: None } => {
            let report = engine.sweep_report().await;
            let failures: Vec<_> = report
                .failures
                .iter()
                .map(|f| json!({ "selector": f.selector.to_string(), "error": f.error.to_string() }))
                .collect();
            print_json(&json!({ "removed": report.removed, "failures": failures }))?;
        }
        Command::Sweep { every: Some(0) } => bail!("--every must be at least one second"),
        Command::Sweep { every: Some(secs) } => {
            let sweeper = ExpirySweeper::new(registry);
            let shutdown = async {
                // ctrl_c only fails if the handler cannot be installed; stop then too
                let _ = tokio::signal::ctrl_c().await;
            };
            let removed = sweeper
                .run(&SystemClock, Duration::from_secs(*secs), shutdown)
                .await;
            print_json(&json!({ "removed": removed }))?;
        }
        Command::Health => {
            let partitions: Vec<_> = engine
                .health()
                .await
                .into_iter()
                .map(|h| {
                    json!({
                        "selector": h.selector.to_string(),
                        "reachable": h.reachable,
                        "error": h.error,
                    })
                })
                .collect();
            print_json(&json!({
                "fallback": engine.registry().is_fallback(),
                "partitions": partitions,
            }))?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
