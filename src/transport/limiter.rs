//! Connection slot accounting.
//!
//! Slots are counted per `scheme://host:port` bucket. Deliveries take a slot
//! from their host bucket and then one from a total shared by all hosts.
//! Sockets take a slot from a separate set of host buckets and keep it until
//! they close.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use url::Url;

use crate::config::PoolConfig;
use crate::Error;

/// Identifies the pool bucket for an endpoint: `scheme://host:port`.
pub(crate) fn host_key(endpoint: &Url) -> String {
    format!(
        "{}://{}:{}",
        endpoint.scheme(),
        endpoint.host_str().unwrap_or_default(),
        endpoint.port_or_known_default().unwrap_or_default()
    )
}

/// Same bucket key as [`host_key`], for the URI a connector is asked to dial.
pub(crate) fn uri_host_key(uri: &http::Uri) -> String {
    let scheme = uri.scheme_str().unwrap_or("http");
    let port = uri.port_u16().or(match scheme {
        "https" => Some(443),
        "http" => Some(80),
        _ => None,
    });
    format!(
        "{}://{}:{}",
        scheme,
        uri.host().unwrap_or_default(),
        port.unwrap_or_default()
    )
}

/// Maps a configured limit to semaphore permits; `0` is unlimited.
pub(crate) fn permits_for(limit: usize) -> usize {
    match limit {
        0 => Semaphore::MAX_PERMITS,
        limit => limit,
    }
}

fn limiter_closed() -> Error {
    Error::invalid_state("transport stopped while waiting for a connection")
}

/// Takes a permit, waiting if none is free. The flag is `true` if it waited.
async fn take(semaphore: Arc<Semaphore>) -> Result<(OwnedSemaphorePermit, bool), Error> {
    match Arc::clone(&semaphore).try_acquire_owned() {
        Ok(permit) => Ok((permit, false)),
        Err(TryAcquireError::Closed) => Err(limiter_closed()),
        Err(TryAcquireError::NoPermits) => {
            let permit = semaphore.acquire_owned().await.map_err(|_| limiter_closed())?;
            Ok((permit, true))
        }
    }
}

// ============================================================================
// Gauge
// ============================================================================

/// Current and peak count of held slots.
#[derive(Debug, Default)]
pub(crate) struct Gauge {
    current: AtomicU64,
    peak: AtomicU64,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn current(&self) -> u64 {
        self.current.load(Ordering::Relaxed)
    }

    pub(crate) fn peak(&self) -> u64 {
        self.peak.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Host Buckets
// ============================================================================

/// One semaphore per `scheme://host:port`, created on demand and pruned when
/// unused.
pub(crate) struct HostBuckets {
    limit: usize,
    state: Mutex<BucketState>,
}

#[derive(Default)]
struct BucketState {
    hosts: HashMap<String, Arc<Semaphore>>,
    closed: bool,
}

impl HostBuckets {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            limit: permits_for(limit),
            state: Mutex::new(BucketState::default()),
        }
    }

    /// Waits for a slot in the bucket for `key`.
    ///
    /// The flag is `true` if no slot was free on arrival.
    pub(crate) async fn acquire(self: &Arc<Self>, key: String) -> Result<(HostPermit, bool), Error> {
        let lease = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(limiter_closed());
            }
            let host = state
                .hosts
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Semaphore::new(self.limit)));
            HostLease {
                buckets: Arc::clone(self),
                key,
                host: Arc::clone(host),
            }
        };

        let (permit, waited) = take(Arc::clone(&lease.host)).await?;
        Ok((
            HostPermit {
                _permit: permit,
                lease,
            },
            waited,
        ))
    }

    /// Rejects new and waiting callers. Held permits stay valid.
    pub(crate) fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        for host in state.hosts.values() {
            host.close();
        }
    }

    /// Number of hosts with a live bucket.
    #[cfg(test)]
    pub(crate) fn tracked_hosts(&self) -> usize {
        self.state.lock().hosts.len()
    }
}

/// Reference to a host bucket; prunes the bucket when the last user leaves.
struct HostLease {
    buckets: Arc<HostBuckets>,
    key: String,
    host: Arc<Semaphore>,
}

impl Drop for HostLease {
    fn drop(&mut self) {
        let mut state = self.buckets.state.lock();
        // Clones are only taken under this lock: two means map + this lease.
        if Arc::strong_count(&self.host) == 2
            && state
                .hosts
                .get(&self.key)
                .is_some_and(|host| Arc::ptr_eq(host, &self.host))
        {
            state.hosts.remove(&self.key);
        }
    }
}

/// A slot in one host bucket.
pub(crate) struct HostPermit {
    // Field order matters: the permit releases before the lease prunes.
    _permit: OwnedSemaphorePermit,
    lease: HostLease,
}

// ============================================================================
// Connection Limiter
// ============================================================================

/// Admits deliveries: a host slot, then a total slot.
pub(crate) struct ConnectionLimiter {
    total: Arc<Semaphore>,
    hosts: Arc<HostBuckets>,
    in_flight: Arc<Gauge>,
}

impl ConnectionLimiter {
    pub(crate) fn new(config: &PoolConfig) -> Self {
        Self {
            total: Arc::new(Semaphore::new(permits_for(config.max_connections))),
            hosts: Arc::new(HostBuckets::new(config.max_connections_per_host)),
            in_flight: Arc::new(Gauge::default()),
        }
    }

    /// Waits for a host slot, then a total slot.
    ///
    /// The host slot is taken first so a caller queued behind a busy host
    /// does not hold a total slot other hosts could use.
    pub(crate) async fn acquire(&self, key: String) -> Result<ConnectionPermit, Error> {
        let (host, host_waited) = self.hosts.acquire(key).await?;
        let (total, total_waited) = take(Arc::clone(&self.total)).await?;

        let mut permit = ConnectionPermit::new(host, Some(total), Arc::clone(&self.in_flight));
        permit.queued = host_waited || total_waited;
        Ok(permit)
    }

    /// Rejects new and waiting callers. Held permits stay valid.
    pub(crate) fn close(&self) {
        self.total.close();
        self.hosts.close();
    }

    pub(crate) fn in_flight(&self) -> &Gauge {
        &self.in_flight
    }

    #[cfg(test)]
    pub(crate) fn tracked_hosts(&self) -> usize {
        self.hosts.tracked_hosts()
    }
}

/// A held connection slot. Dropping it frees the slot.
pub(crate) struct ConnectionPermit {
    host: HostPermit,
    _total: Option<OwnedSemaphorePermit>,
    gauge: Arc<Gauge>,
    queued: bool,
}

impl ConnectionPermit {
    pub(crate) fn new(host: HostPermit, total: Option<OwnedSemaphorePermit>, gauge: Arc<Gauge>) -> Self {
        gauge.enter();
        Self {
            host,
            _total: total,
            gauge,
            queued: false,
        }
    }

    /// Returns `true` if the caller had to wait for this slot.
    pub(crate) fn was_queued(&self) -> bool {
        self.queued
    }
}

impl Drop for ConnectionPermit {
    fn drop(&mut self) {
        self.gauge.exit();
    }
}

impl std::fmt::Debug for ConnectionPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPermit")
            .field("host", &self.host.lease.key)
            .field("queued", &self.queued)
            .finish_non_exhaustive()
    }
}
