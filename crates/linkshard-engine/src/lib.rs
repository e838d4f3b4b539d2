//! Sharded short-code resolution engine.
//!
//! [`ResolutionEngine`] creates and resolves short links across the
//! partitions of a [`ShardRegistry`], keeping a cache-aside [`CacheLayer`]
//! in front of them. [`ExpirySweeper`] purges expired records from every
//! partition.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use linkshard_cache::{CacheLayer, MokaUrlCache};
//! use linkshard_core::SystemClock;
//! use linkshard_engine::{EngineConfig, ResolutionEngine, Shortener};
//! use linkshard_generator::RandomGenerator;
//! use linkshard_storage::{InMemoryConnector, PartitionConfig, RegistrySettings, ShardRegistry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let configs: Vec<PartitionConfig> = vec!["a".parse()?, "b".parse()?];
//! let registry =
//!     ShardRegistry::connect(&configs, &InMemoryConnector, RegistrySettings::default()).await?;
//!
//! let engine = ResolutionEngine::new(
//!     Arc::new(registry),
//!     CacheLayer::new(MokaUrlCache::new()),
//!     RandomGenerator::new(),
//!     SystemClock,
//!     EngineConfig::default(),
//! );
//!
//! let created = engine.create("https://example.com/a", 30).await?;
//! assert_eq!(engine.resolve(created.code.as_str()).await?, "https://example.com/a");
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod shortener;
pub mod sweeper;
pub mod validate;

pub use engine::{EngineConfig, ResolutionEngine};
pub use error::{EngineError, Result};
pub use shortener::{CreatedLink, LinkStats, Shortener};
pub use sweeper::{ExpirySweeper, SweepFailure, SweepReport};
