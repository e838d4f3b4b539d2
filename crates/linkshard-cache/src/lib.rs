//! Cache layer and cache backends for linkshard.
//!
//! [`CacheLayer`] is what the engine talks to: it bounds every call with a
//! timeout and never writes an entry whose remaining lifetime is not
//! positive. The backends implement [`UrlCache`].

pub mod layer;
pub mod memory;
pub mod moka;
pub mod redis;

pub use layer::CacheLayer;
pub use linkshard_core::{CacheError, UrlCache};
pub use memory::InMemoryUrlCache;
pub use moka::MokaUrlCache;
pub use redis::RedisUrlCache;

/// Type alias for cache results.
pub type Result<T> = std::result::Result<T, CacheError>;
