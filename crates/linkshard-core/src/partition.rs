use crate::error::StorageError;
use crate::record::LinkRecord;
use async_trait::async_trait;
use jiff::Timestamp;

/// Result type for partition operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// One independent durable backing store.
///
/// A partition only knows payloads; routing a full short code to the right
/// partition is the registry's job. Implementations must guarantee that
/// `payload` is unique within the partition: of two concurrent `put`s for
/// the same payload, exactly one succeeds.
#[async_trait]
pub trait Partition: Send + Sync + 'static {
    /// Retrieves the record stored under `payload`.
    ///
    /// Expired records may still be returned; callers check expiry.
    async fn get(&self, payload: &str) -> Result<Option<LinkRecord>>;

    /// Inserts a new record. Returns `Err(DuplicateKey)` if the payload is taken.
    async fn put(&self, record: LinkRecord) -> Result<()>;

    /// Deletes the record for `payload`. Returns `true` if it existed.
    async fn delete_one(&self, payload: &str) -> Result<bool>;

    /// Deletes every record with `expires_at <= now` and returns how many
    /// were removed.
    async fn delete_expired_before(&self, now: Timestamp) -> Result<u64>;

    /// Checks that the backing store is reachable.
    async fn ping(&self) -> Result<()>;

    /// Releases the underlying connections.
    async fn close(&self) {}
}
