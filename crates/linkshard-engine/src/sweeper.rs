use jiff::Timestamp;
use linkshard_core::{Clock, Selector, StorageError};
use linkshard_storage::ShardRegistry;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// A partition that could not be swept.
#[derive(Debug, Clone)]
pub struct SweepFailure {
    pub selector: Selector,
    pub error: StorageError,
}

/// Outcome of one sweep over every partition.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub removed: u64,
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Purges expired records from all partitions of a registry.
#[derive(Debug, Clone)]
pub struct ExpirySweeper {
    registry: Arc<ShardRegistry>,
}

impl ExpirySweeper {
    pub fn new(registry: Arc<ShardRegistry>) -> Self {
        Self { registry }
    }

    /// Deletes records with `expires_at <= now` from every partition.
    ///
    /// A failing partition is recorded in the report and does not stop the
    /// others from being swept.
    pub async fn sweep(&self, now: Timestamp) -> SweepReport {
        let mut report = SweepReport::default();

        for handle in self.registry.all() {
            match handle.delete_expired_before(now).await {
                Ok(removed) => {
                    debug!(selector = %handle.selector(), removed, "Swept partition");
                    report.removed += removed;
                }
                Err(error) => {
                    warn!(selector = %handle.selector(), error = %error, "Failed to sweep partition");
                    report.failures.push(SweepFailure {
                        selector: handle.selector(),
                        error,
                    });
                }
            }
        }

        info!(
            removed = report.removed,
            failed = report.failures.len(),
            "Expiry sweep finished"
        );
        report
    }

    /// Sweeps every `every` until `shutdown` resolves, starting immediately.
    ///
    /// Returns the total number of records removed.
    pub async fn run<K, F>(&self, clock: &K, every: Duration, shutdown: F) -> u64
    where
        K: Clock,
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut total = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(total, "Expiry sweeper stopped");
                    return total;
                }
                _ = ticker.tick() => {
                    total += self.sweep(clock.now()).await.removed;
                }
            }
        }
    }
}
