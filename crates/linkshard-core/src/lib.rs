//! Core types and traits for the linkshard URL shortener.
//!
//! This crate provides the short code codec, the durable record shape and
//! the collaborator traits (partitions, cache, clock) shared by the
//! storage, cache and engine crates.

pub mod cache;
pub mod clock;
pub mod error;
pub mod partition;
pub mod record;
pub mod shortcode;

pub use cache::UrlCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CacheError, CodecError, StorageError};
pub use partition::Partition;
pub use record::LinkRecord;
pub use shortcode::{Selector, ShortCode};
