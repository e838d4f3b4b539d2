//! Durable partitions and the shard registry that routes selectors to them.

pub mod connector;
pub mod memory;
pub mod mysql;
pub mod registry;

pub use connector::{InMemoryConnector, MySqlConnector, PartitionConfig, PartitionConnector};
pub use linkshard_core::partition::Result;
pub use linkshard_core::{Partition, StorageError};
pub use memory::InMemoryPartition;
pub use mysql::MySqlPartition;
pub use registry::{PartitionHandle, PartitionHealth, RegistrySettings, ShardRegistry};
