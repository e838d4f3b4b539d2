use crate::memory::InMemoryPartition;
use crate::mysql::MySqlPartition;
use async_trait::async_trait;
use linkshard_core::partition::Result;
use linkshard_core::{CodecError, Partition, Selector};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use typed_builder::TypedBuilder;

/// Where to find the partition owning one selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionConfig {
    pub selector: Selector,
    /// Backend connection string; unused by in-memory partitions.
    pub dsn: String,
}

impl PartitionConfig {
    pub fn new(selector: Selector, dsn: impl Into<String>) -> Self {
        Self {
            selector,
            dsn: dsn.into(),
        }
    }
}

impl Display for PartitionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // the DSN may carry credentials
        write!(f, "partition[{}]", self.selector)
    }
}

/// Parses `selector=dsn`, or a bare `selector` with an empty DSN.
impl FromStr for PartitionConfig {
    type Err = CodecError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (selector, dsn) = s.split_once('=').unwrap_or((s, ""));
        let mut chars = selector.trim().chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            return Err(CodecError::MalformedCode(format!(
                "partition selector must be a single character: '{selector}'"
            )));
        };
        Ok(Self::new(Selector::new(c)?, dsn.trim()))
    }
}

/// Opens a partition from its configuration.
#[async_trait]
pub trait PartitionConnector: Send + Sync {
    async fn connect(&self, config: &PartitionConfig) -> Result<Arc<dyn Partition>>;
}

/// Creates a fresh, empty [`InMemoryPartition`] for every config.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryConnector;

#[async_trait]
impl PartitionConnector for InMemoryConnector {
    async fn connect(&self, _config: &PartitionConfig) -> Result<Arc<dyn Partition>> {
        Ok(Arc::new(InMemoryPartition::new()))
    }
}

/// Opens a [`MySqlPartition`] pool per config, optionally creating the schema.
#[derive(Debug, Clone, TypedBuilder)]
pub struct MySqlConnector {
    #[builder(default = 10)]
    max_connections: u32,
    #[builder(default = Duration::from_secs(10))]
    acquire_timeout: Duration,
    #[builder(default = true)]
    ensure_schema: bool,
}

impl Default for MySqlConnector {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[async_trait]
impl PartitionConnector for MySqlConnector {
    async fn connect(&self, config: &PartitionConfig) -> Result<Arc<dyn Partition>> {
        let partition =
            MySqlPartition::connect(&config.dsn, self.max_connections, self.acquire_timeout)
                .await?;
        if self.ensure_schema {
            partition.ensure_schema().await?;
        }
        Ok(Arc::new(partition))
    }
}
