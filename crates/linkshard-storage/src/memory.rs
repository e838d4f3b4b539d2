use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use linkshard_core::partition::Result;
use linkshard_core::{LinkRecord, Partition, StorageError};

/// In-memory implementation of [`Partition`] using DashMap.
///
/// The entry API makes `put` an atomic insert-if-absent, which gives the
/// same exclusivity on `payload` a unique index gives a database.
#[derive(Debug, Default)]
pub struct InMemoryPartition {
    storage: DashMap<String, LinkRecord>,
}

impl InMemoryPartition {
    /// Creates a new in-memory partition.
    pub fn new() -> Self {
        Self {
            storage: DashMap::new(),
        }
    }

    /// Creates a new in-memory partition with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: DashMap::with_capacity(capacity),
        }
    }

    /// Number of stored records, expired or not.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

#[async_trait]
impl Partition for InMemoryPartition {
    async fn get(&self, payload: &str) -> Result<Option<LinkRecord>> {
        Ok(self.storage.get(payload).map(|entry| entry.clone()))
    }

    async fn put(&self, record: LinkRecord) -> Result<()> {
        match self.storage.entry(record.payload.clone()) {
            Entry::Occupied(_) => Err(StorageError::DuplicateKey(record.payload)),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn delete_one(&self, payload: &str) -> Result<bool> {
        Ok(self.storage.remove(payload).is_some())
    }

    async fn delete_expired_before(&self, now: Timestamp) -> Result<u64> {
        let before = self.storage.len();
        self.storage.retain(|_, record| !record.is_expired_at(now));
        Ok(before.saturating_sub(self.storage.len()) as u64)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
