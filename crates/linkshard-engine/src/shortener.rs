use crate::error::Result;
use async_trait::async_trait;
use jiff::Timestamp;
use linkshard_core::ShortCode;
use serde::Serialize;

/// A freshly created short link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedLink {
    pub code: ShortCode,
    /// `code` appended to the configured base URL.
    pub short_url: String,
    pub long_url: String,
    pub expires_at: Timestamp,
    pub days_to_live: u32,
}

/// Read-only view of a stored link, expired or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    pub code: ShortCode,
    pub long_url: String,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub is_expired: bool,
}

/// Trait for the URL shortening surface.
///
/// Implementations own the whole lifecycle of a short link: creating it in
/// the partition its selector routes to, resolving it through the cache and
/// purging it once expired.
#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Creates a short link for `long_url` living `days_to_live` days.
    ///
    /// # Errors
    ///
    /// - [`crate::EngineError::InvalidInput`] for a non-http(s) URL or a
    ///   lifetime outside `1..=365`
    /// - [`crate::EngineError::CodeSpaceExhausted`] when every attempt
    ///   collided with an existing code
    /// - [`crate::EngineError::StorageUnavailable`] when a cache or
    ///   partition call fails or times out
    async fn create(&self, long_url: &str, days_to_live: u32) -> Result<CreatedLink>;

    /// Resolves a short code to its long URL.
    ///
    /// # Errors
    ///
    /// - [`crate::EngineError::MalformedCode`] or
    ///   [`crate::EngineError::InvalidSelector`] before any I/O
    /// - [`crate::EngineError::NotFound`] if no partition knows the code
    /// - [`crate::EngineError::Expired`] if the record has expired; the
    ///   record is deleted on the way out
    async fn resolve(&self, code: &str) -> Result<String>;

    /// Returns the stored record for `code` without touching the cache.
    async fn stats(&self, code: &str) -> Result<LinkStats>;

    /// Deletes every expired record across all partitions and returns the
    /// number removed. Partitions that fail are skipped.
    async fn sweep(&self) -> u64;
}
