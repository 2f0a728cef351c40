use std::future::Future;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use crate::connector::CatalogConnector;
use crate::error::{self as catalog_err, Error, Result};

/// A cached connector plus lease accounting.
///
/// Eviction and invalidation retire the handle; the underlying connector is
/// closed when the handle is retired and no lease is outstanding. The cache
/// never hands out a retired handle, so a lease taken through
/// `get_or_create` always refers to a live connector, and in-flight
/// operations holding a lease may complete against an instance that has
/// already been invalidated.
#[derive(Debug)]
pub struct ConnectorHandle {
    connector: Arc<dyn CatalogConnector>,
    leases: AtomicUsize,
    retired: AtomicBool,
    closed: AtomicBool,
}

impl ConnectorHandle {
    fn new(connector: Arc<dyn CatalogConnector>) -> Arc<Self> {
        Arc::new(Self {
            connector,
            leases: AtomicUsize::new(0),
            retired: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    fn lease(self: &Arc<Self>) -> ConnectorLease {
        self.leases.fetch_add(1, Ordering::SeqCst);
        ConnectorLease {
            handle: Arc::clone(self),
        }
    }

    /// Called once the cache has dropped the entry. Closes immediately when
    /// idle, otherwise the last lease drop closes.
    fn retire(&self) {
        self.retired.store(true, Ordering::SeqCst);
        if self.leases.load(Ordering::SeqCst) == 0 {
            self.close_once();
        }
    }

    fn close_once(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!(provider = self.connector.provider(), "closing evicted connector");
            self.connector.close();
        }
    }
}

/// RAII lease over a cached connector. Holding it pins the connector open
/// for the duration of one dispatcher operation.
#[derive(Debug)]
pub struct ConnectorLease {
    handle: Arc<ConnectorHandle>,
}

impl Deref for ConnectorLease {
    type Target = dyn CatalogConnector;

    fn deref(&self) -> &Self::Target {
        &*self.handle.connector
    }
}

impl Drop for ConnectorLease {
    fn drop(&mut self) {
        let remaining = self.handle.leases.fetch_sub(1, Ordering::SeqCst);
        if remaining == 1 && self.handle.retired.load(Ordering::SeqCst) {
            self.handle.close_once();
        }
    }
}

/// Concurrent, capacity-bounded cache of live connector instances keyed by
/// catalog internal id.
///
/// Construction is single-flight per key (`try_get_with`): concurrent
/// callers for the same uninitialized key await one build instead of racing.
/// Size-bounded eviction and idle eviction both retire the evicted handle
/// through the eviction listener.
pub struct ConnectorCache {
    cache: Cache<i64, Arc<ConnectorHandle>>,
}

impl std::fmt::Debug for ConnectorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl ConnectorCache {
    #[must_use]
    pub fn new(capacity: u64, idle_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_idle(idle_ttl)
            .eviction_listener(|_id, handle: Arc<ConnectorHandle>, cause| {
                debug!(?cause, "connector cache entry removed");
                handle.retire();
            })
            .build();
        Self { cache }
    }

    /// Get the cached connector for `catalog_id` or build it with `init`.
    /// At most one construction runs per key; other callers await it.
    pub async fn get_or_create<F, Fut>(
        &self,
        catalog_id: i64,
        provider: &str,
        init: F,
    ) -> Result<ConnectorLease>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Arc<dyn CatalogConnector>>>,
    {
        loop {
            let handle = self
                .cache
                .try_get_with(catalog_id, async {
                    let connector = init().await?;
                    Ok::<_, Error>(ConnectorHandle::new(connector))
                })
                .await
                .map_err(|shared| Self::unshare_error(provider, &shared))?;
            let lease = handle.lease();
            // An eviction delivered between the cache hit and taking the
            // lease may already have retired (and closed) the handle; drop
            // it and build fresh rather than lease a dead instance.
            if handle.retired.load(Ordering::SeqCst) {
                drop(lease);
                self.cache.invalidate(&catalog_id).await;
                continue;
            }
            return Ok(lease);
        }
    }

    /// Drop the cached instance for one catalog. Synchronous with respect to
    /// the caller: a subsequent `get_or_create` builds fresh.
    pub async fn invalidate(&self, catalog_id: i64) {
        self.cache.invalidate(&catalog_id).await;
        self.cache.run_pending_tasks().await;
    }

    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    /// Flush pending eviction housekeeping (idle/size eviction runs lazily).
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }

    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// `try_get_with` shares one build failure among all waiters as an
    /// `Arc<Error>`; rebuild an owned error, preserving the principal
    /// variants callers match on.
    fn unshare_error(provider: &str, shared: &Arc<Error>) -> Error {
        match shared.as_ref() {
            Error::UnknownProvider { provider } => catalog_err::UnknownProviderSnafu {
                provider: provider.clone(),
            }
            .build(),
            Error::InvalidConfiguration { provider, reason } => {
                catalog_err::InvalidConfigurationSnafu {
                    provider: provider.clone(),
                    reason: reason.clone(),
                }
                .build()
            }
            Error::UnsupportedOperation {
                provider,
                operation,
            } => catalog_err::UnsupportedOperationSnafu {
                provider: provider.clone(),
                operation: operation.clone(),
            }
            .build(),
            Error::BackendUnavailable { provider, message } => {
                catalog_err::BackendUnavailableSnafu {
                    provider: provider.clone(),
                    message: message.clone(),
                }
                .build()
            }
            Error::Cancelled { operation } => catalog_err::CancelledSnafu {
                operation: operation.clone(),
            }
            .build(),
            other => catalog_err::ConnectorBuildSnafu {
                provider: provider.to_string(),
                message: other.to_string(),
            }
            .build(),
        }
    }
}
