use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

/// A durable link record, owned by exactly one partition.
///
/// Records are immutable after creation. `payload` is the partition-local
/// key; the selector part of the code is implied by the owning partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub payload: String,
    pub long_url: String,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

impl LinkRecord {
    /// Creates a record living `days_to_live` days from `created_at`.
    pub fn new(
        payload: impl Into<String>,
        long_url: impl Into<String>,
        created_at: Timestamp,
        days_to_live: u32,
    ) -> Self {
        let lifetime = SignedDuration::from_hours(i64::from(days_to_live) * 24);
        Self {
            payload: payload.into(),
            long_url: long_url.into(),
            created_at,
            expires_at: created_at + lifetime,
        }
    }

    /// A record is expired once `now` reaches `expires_at`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }

    /// Whole seconds left before expiry, floored. Zero or negative once expired.
    pub fn remaining_secs(&self, now: Timestamp) -> i64 {
        now.duration_until(self.expires_at).as_secs()
    }
}
