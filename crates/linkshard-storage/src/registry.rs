use crate::connector::{PartitionConfig, PartitionConnector};
use jiff::Timestamp;
use linkshard_core::partition::Result;
use linkshard_core::{LinkRecord, Partition, Selector, StorageError};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

/// Timeouts applied by the registry.
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct RegistrySettings {
    /// Upper bound for establishing one partition connection.
    #[builder(default = Duration::from_secs(10))]
    pub connect_timeout: Duration,
    /// Upper bound for every partition operation.
    #[builder(default = Duration::from_secs(2))]
    pub op_timeout: Duration,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A connected partition together with the selector it was registered for.
///
/// Every operation is bounded by the registry's operation timeout; an
/// elapsed call yields [`StorageError::Timeout`].
#[derive(Clone)]
pub struct PartitionHandle {
    selector: Selector,
    partition: Arc<dyn Partition>,
    timeout: Duration,
}

impl std::fmt::Debug for PartitionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionHandle")
            .field("selector", &self.selector)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl PartitionHandle {
    /// The selector this partition was registered under. In fallback
    /// routing this differs from the selector of the code being served.
    pub fn selector(&self) -> Selector {
        self.selector
    }

    /// Whether both handles point at the same underlying partition.
    pub fn same_partition(&self, other: &PartitionHandle) -> bool {
        Arc::ptr_eq(&self.partition, &other.partition)
    }

    pub async fn get(&self, payload: &str) -> Result<Option<LinkRecord>> {
        self.bounded("get", self.partition.get(payload)).await
    }

    pub async fn put(&self, record: LinkRecord) -> Result<()> {
        self.bounded("put", self.partition.put(record)).await
    }

    pub async fn delete_one(&self, payload: &str) -> Result<bool> {
        self.bounded("delete_one", self.partition.delete_one(payload))
            .await
    }

    pub async fn delete_expired_before(&self, now: Timestamp) -> Result<u64> {
        self.bounded(
            "delete_expired_before",
            self.partition.delete_expired_before(now),
        )
        .await
    }

    pub async fn ping(&self) -> Result<()> {
        self.bounded("ping", self.partition.ping()).await
    }

    async fn bounded<T>(&self, operation: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout(format!(
                "partition {} {operation} exceeded {:?}",
                self.selector, self.timeout
            ))),
        }
    }
}

/// Reachability of one registered partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionHealth {
    pub selector: Selector,
    pub reachable: bool,
    pub error: Option<String>,
}

/// The set of connected partitions, keyed by selector.
///
/// Built once by [`ShardRegistry::connect`]; the map never changes
/// afterwards. An unreachable partition stays registered so its connection
/// can recover, and shows up in [`ShardRegistry::health`].
///
/// Routing rule: a mapped selector goes to its own partition; anything else
/// goes to the first partition connected, in registration order. A
/// registry with a single partition is in fallback mode from the start and
/// serves every selector from it.
pub struct ShardRegistry {
    by_selector: HashMap<Selector, PartitionHandle>,
    order: Vec<PartitionHandle>,
    fallback: AtomicBool,
    closed: AtomicBool,
}

impl std::fmt::Debug for ShardRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardRegistry")
            .field("partitions", &self.order)
            .field("fallback", &self.is_fallback())
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish()
    }
}

impl ShardRegistry {
    /// Connects every configured partition independently.
    ///
    /// Partitions that fail or time out are logged and skipped, as are
    /// configs repeating an already-registered selector. Fails with
    /// [`StorageError::NoPartitionsAvailable`] only if none connect.
    pub async fn connect<C: PartitionConnector + ?Sized>(
        configs: &[PartitionConfig],
        connector: &C,
        settings: RegistrySettings,
    ) -> Result<Self> {
        info!(configured = configs.len(), "Connecting partitions");

        let mut connected: Vec<(Selector, Arc<dyn Partition>)> = Vec::with_capacity(configs.len());
        for config in configs {
            if connected.iter().any(|(s, _)| *s == config.selector) {
                warn!(selector = %config.selector, "Duplicate partition selector, skipping");
                continue;
            }

            match tokio::time::timeout(settings.connect_timeout, connector.connect(config)).await {
                Ok(Ok(partition)) => {
                    info!(selector = %config.selector, "Partition connected");
                    connected.push((config.selector, partition));
                }
                Ok(Err(e)) => {
                    warn!(selector = %config.selector, error = %e, "Failed to connect partition, skipping");
                }
                Err(_) => {
                    warn!(
                        selector = %config.selector,
                        timeout = ?settings.connect_timeout,
                        "Partition connect timed out, skipping"
                    );
                }
            }
        }

        let registry = Self::from_partitions(connected, settings.op_timeout)?;
        info!(
            connected = registry.len(),
            configured = configs.len(),
            fallback = registry.is_fallback(),
            "Partitions connected"
        );
        Ok(registry)
    }

    /// Builds a registry from already-open partitions, in registration order.
    ///
    /// Later entries repeating a selector are ignored. The same partition may
    /// be registered under several selectors.
    pub fn from_partitions(
        partitions: impl IntoIterator<Item = (Selector, Arc<dyn Partition>)>,
        op_timeout: Duration,
    ) -> Result<Self> {
        let mut by_selector = HashMap::new();
        let mut order: Vec<PartitionHandle> = Vec::new();

        for (selector, partition) in partitions {
            if by_selector.contains_key(&selector) {
                continue;
            }
            let handle = PartitionHandle {
                selector,
                partition,
                timeout: op_timeout,
            };
            if !order.iter().any(|h| h.same_partition(&handle)) {
                order.push(handle.clone());
            }
            by_selector.insert(selector, handle);
        }

        if order.is_empty() {
            return Err(StorageError::NoPartitionsAvailable);
        }

        let single = order.len() == 1;
        if single {
            warn!(
                selector = %order[0].selector,
                "Only one partition available, routing every selector to it"
            );
        }

        Ok(Self {
            by_selector,
            order,
            fallback: AtomicBool::new(single),
            closed: AtomicBool::new(false),
        })
    }

    /// Returns the partition that owns `selector`.
    pub fn resolve(&self, selector: Selector) -> Result<PartitionHandle> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::NoPartitionsAvailable);
        }
        let first = self.order.first().ok_or(StorageError::NoPartitionsAvailable)?;

        if self.order.len() == 1 {
            return Ok(first.clone());
        }

        if let Some(handle) = self.by_selector.get(&selector) {
            return Ok(handle.clone());
        }

        if !self.fallback.swap(true, Ordering::AcqRel) {
            warn!(
                selector = %selector,
                fallback = %first.selector,
                "No partition for selector, entering fallback routing"
            );
        } else {
            debug!(selector = %selector, fallback = %first.selector, "Using fallback partition");
        }
        Ok(first.clone())
    }

    /// Every distinct connected partition, in registration order.
    pub fn all(&self) -> Vec<PartitionHandle> {
        if self.closed.load(Ordering::Acquire) {
            return Vec::new();
        }
        self.order.clone()
    }

    /// Whether some selector is (or may be) served by a partition other
    /// than its own.
    pub fn is_fallback(&self) -> bool {
        self.fallback.load(Ordering::Acquire)
    }

    /// Number of distinct connected partitions.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Pings every partition. Unreachable partitions stay registered.
    ///
    /// Empty once the registry is disconnected.
    pub async fn health(&self) -> Vec<PartitionHealth> {
        let handles = self.all();
        let mut report = Vec::with_capacity(handles.len());
        for handle in &handles {
            let health = match handle.ping().await {
                Ok(()) => PartitionHealth {
                    selector: handle.selector,
                    reachable: true,
                    error: None,
                },
                Err(e) => {
                    warn!(selector = %handle.selector, error = %e, "Partition unreachable");
                    PartitionHealth {
                        selector: handle.selector,
                        reachable: false,
                        error: Some(e.to_string()),
                    }
                }
            };
            report.push(health);
        }
        report
    }

    /// Releases all partition connections. Calling it again does nothing.
    pub async fn disconnect(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for handle in &self.order {
            handle.partition.close().await;
        }
        info!(partitions = self.order.len(), "All partitions disconnected");
    }
}
