//! Bounded handle pool
//!
//! `Pool<F>` owns a capacity-limited set of handles produced by a
//! [`ManageHandle`] factory. A `tokio` semaphore is the capacity ledger:
//! every live handle (idle or leased) corresponds to a consumed permit, so
//! `active + idle <= capacity` holds without extra bookkeeping, waiters park
//! on the semaphore in arrival order, and closing the semaphore fails every
//! parked waiter on shutdown.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{Semaphore, TryAcquireError};

use crate::config::{PoolConfig, Strategy};
use crate::error::{Error, Result};
use crate::factory::ManageHandle;
use crate::guard::Lease;

/// An idle-queue entry wrapping a handle.
struct Entry<T> {
    handle: T,
    created_at: Instant,
    last_used: Instant,
    last_validated: Instant,
}

impl<T> Entry<T> {
    fn new(handle: T) -> Self {
        let now = Instant::now();
        Self {
            handle,
            created_at: now,
            last_used: now,
            last_validated: now,
        }
    }

    /// Re-idle a returned handle, preserving its original `created_at` and
    /// `last_validated` stamps.
    fn returned(handle: T, created_at: Instant, last_validated: Instant) -> Self {
        Self {
            handle,
            created_at,
            last_used: Instant::now(),
            last_validated,
        }
    }

    fn is_expired(&self, config: &PoolConfig) -> bool {
        config
            .max_lifetime
            .is_some_and(|limit| self.created_at.elapsed() > limit)
            || config
                .idle_timeout
                .is_some_and(|limit| self.last_used.elapsed() > limit)
    }
}

/// Pool statistics.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Total successful acquisitions.
    pub acquisitions: u64,
    /// Total leases that ended (returned, destroyed, or detached).
    pub releases: u64,
    /// Current number of handles leased out.
    pub active: usize,
    /// Current number of idle handles in the pool.
    pub idle: usize,
    /// Total handles ever created.
    pub created: u64,
    /// Total handles ever destroyed.
    pub destroyed: u64,
}

/// Inner shared state for the pool.
struct PoolInner<F: ManageHandle> {
    factory: F,
    config: PoolConfig,
    idle: Mutex<VecDeque<Entry<F::Handle>>>,
    stats: Mutex<PoolStats>,
    /// Permits bound live handles (idle + leased).
    semaphore: Semaphore,
    closed: AtomicBool,
}

/// Generic bounded handle pool.
///
/// Cheap to clone; all clones share the same state. The pool must be used
/// from within a tokio runtime: releasing a lease spawns a task that
/// recycles the handle and wakes the next waiter.
pub struct Pool<F: ManageHandle> {
    inner: Arc<PoolInner<F>>,
}

impl<F: ManageHandle> Clone for Pool<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: ManageHandle> std::fmt::Debug for Pool<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.inner.stats.lock().clone();
        f.debug_struct("Pool")
            .field("capacity", &self.inner.config.capacity)
            .field("closed", &self.inner.closed.load(Ordering::SeqCst))
            .field("stats", &stats)
            .finish()
    }
}

impl<F: ManageHandle> Pool<F> {
    /// Create a new pool around the given factory.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] if `config` is invalid
    /// (e.g. `capacity == 0`).
    pub fn new(factory: F, config: PoolConfig) -> Result<Self> {
        config.validate()?;
        let capacity = config.capacity;
        Ok(Self {
            inner: Arc::new(PoolInner {
                factory,
                idle: Mutex::new(VecDeque::with_capacity(capacity)),
                stats: Mutex::new(PoolStats::default()),
                semaphore: Semaphore::new(capacity),
                closed: AtomicBool::new(false),
                config,
            }),
        })
    }

    /// Acquire a handle using the configured default wait budget.
    ///
    /// Returns an RAII [`Lease`] that gives the handle back to the pool when
    /// dropped. Waiters are woken in arrival order.
    pub async fn acquire(&self) -> Result<Lease<F::Handle>> {
        self.acquire_timeout(self.inner.config.acquire_timeout).await
    }

    /// Acquire a handle with a per-call wait budget.
    ///
    /// `None` waits indefinitely, `Some(Duration::ZERO)` never blocks, and
    /// `Some(d)` fails with [`Error::Exhausted`] once `d` elapses with no
    /// handle available.
    pub async fn acquire_timeout(&self, timeout: Option<Duration>) -> Result<Lease<F::Handle>> {
        let inner = &self.inner;

        if inner.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }

        let start = Instant::now();
        let permit = match timeout {
            Some(limit) if limit.is_zero() => match inner.semaphore.try_acquire() {
                Ok(permit) => permit,
                Err(TryAcquireError::Closed) => return Err(Error::Closed),
                Err(TryAcquireError::NoPermits) => return Err(self.exhausted(Duration::ZERO)),
            },
            Some(limit) => tokio::time::timeout(limit, inner.semaphore.acquire())
                .await
                .map_err(|_| self.exhausted(start.elapsed()))?
                .map_err(|_| Error::Closed)?,
            None => inner.semaphore.acquire().await.map_err(|_| Error::Closed)?,
        };

        // Shutdown may have landed between the closed check and the permit
        // grant; the permit is dropped (returned) on this path.
        if inner.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }

        // Take an idle handle, destroying expired or invalid ones along the
        // way; create a fresh handle once the idle queue is empty.
        let (handle, created_at, last_validated) = loop {
            let entry = {
                let mut idle = inner.idle.lock();
                match inner.config.strategy {
                    Strategy::Fifo => idle.pop_front(),
                    Strategy::Lifo => idle.pop_back(),
                }
            };
            match entry {
                Some(entry) if entry.is_expired(&inner.config) => {
                    tracing::debug!("destroying expired idle handle");
                    inner.factory.destroy(entry.handle).await;
                    inner.stats.lock().destroyed += 1;
                    continue;
                }
                Some(entry) => {
                    // Recently validated handles skip the check.
                    if entry.last_validated.elapsed() < inner.config.validation_interval {
                        break (entry.handle, entry.created_at, entry.last_validated);
                    }
                    if inner.factory.validate(&entry.handle).await {
                        break (entry.handle, entry.created_at, Instant::now());
                    }
                    tracing::warn!("idle handle failed validation, destroying");
                    inner.factory.destroy(entry.handle).await;
                    inner.stats.lock().destroyed += 1;
                    continue;
                }
                None => {
                    // A create failure propagates to the acquirer and drops
                    // the permit, so the slot stays available.
                    let handle = inner.factory.create().await?;
                    inner.stats.lock().created += 1;
                    let now = Instant::now();
                    break (handle, now, now);
                }
            }
        };

        let idle_len = inner.idle.lock().len();
        let active = {
            let mut stats = inner.stats.lock();
            stats.acquisitions += 1;
            stats.active += 1;
            stats.idle = idle_len;
            stats.active
        };
        tracing::debug!(active, idle = idle_len, "handle acquired");

        // The permit stays consumed for the lifetime of the lease; the
        // release path adds it back.
        permit.forget();

        let pool = self.clone();
        Ok(Lease::new(handle, move |returned| match returned {
            Some(handle) => {
                drop(tokio::spawn(async move {
                    pool.give_back(handle, created_at, last_validated).await;
                }));
            }
            None => pool.detach(),
        }))
    }

    /// Return a handle to the pool: recycle it, re-idle it (or destroy it on
    /// recycle failure), and wake the next waiter. Runs on a spawned task so
    /// the releaser never blocks.
    async fn give_back(&self, mut handle: F::Handle, created_at: Instant, last_validated: Instant) {
        let inner = &self.inner;

        if inner.closed.load(Ordering::SeqCst) {
            inner.factory.destroy(handle).await;
            let mut stats = inner.stats.lock();
            stats.releases += 1;
            stats.destroyed += 1;
            stats.active = stats.active.saturating_sub(1);
            return;
        }

        let keep = inner.factory.recycle(&mut handle).await.is_ok();
        if keep {
            let idle_len = {
                let mut idle = inner.idle.lock();
                idle.push_back(Entry::returned(handle, created_at, last_validated));
                idle.len()
            };
            let mut stats = inner.stats.lock();
            stats.releases += 1;
            stats.active = stats.active.saturating_sub(1);
            stats.idle = idle_len;
        } else {
            tracing::warn!("handle failed recycle, destroying");
            inner.factory.destroy(handle).await;
            let mut stats = inner.stats.lock();
            stats.releases += 1;
            stats.destroyed += 1;
            stats.active = stats.active.saturating_sub(1);
        }

        // Shutdown may have raced the re-idle above; drain anything it
        // missed so no handle outlives the pool.
        if inner.closed.load(Ordering::SeqCst) {
            let drained: Vec<_> = { inner.idle.lock().drain(..).collect() };
            let n = drained.len();
            for entry in drained {
                inner.factory.destroy(entry.handle).await;
            }
            if n > 0 {
                let mut stats = inner.stats.lock();
                stats.destroyed += n as u64;
                stats.idle = 0;
            }
            return;
        }

        inner.semaphore.add_permits(1);
    }

    /// Account for a lease detached via [`Lease::take`]: the handle leaves
    /// pool ownership and its capacity slot is freed for a replacement.
    fn detach(&self) {
        let inner = &self.inner;
        {
            let mut stats = inner.stats.lock();
            stats.releases += 1;
            stats.active = stats.active.saturating_sub(1);
        }
        inner.semaphore.add_permits(1);
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.inner.stats.lock().clone()
    }

    /// Whether [`shutdown`](Pool::shutdown) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Run maintenance: destroy expired idle handles, then top the idle
    /// queue up to `min_idle`.
    pub async fn maintain(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }

        let mut to_destroy = Vec::new();
        {
            let mut idle = inner.idle.lock();
            let mut kept = VecDeque::with_capacity(idle.len());
            while let Some(entry) = idle.pop_front() {
                if entry.is_expired(&inner.config) {
                    to_destroy.push(entry.handle);
                } else {
                    kept.push_back(entry);
                }
            }
            *idle = kept;
        }
        let removed = to_destroy.len();
        for handle in to_destroy {
            inner.factory.destroy(handle).await;
        }
        if removed > 0 {
            tracing::debug!(removed, "destroyed expired idle handles");
            inner.stats.lock().destroyed += removed as u64;
        }

        // Refill. Consumed permits stand in for leased handles and for
        // acquirers still inside `create()`, so in-flight creations count
        // against the target, and the permit held across the refill create
        // keeps concurrent acquirers from stacking creations past capacity.
        loop {
            if inner.closed.load(Ordering::SeqCst) {
                return Err(Error::Closed);
            }
            let idle_len = inner.idle.lock().len();
            let reserved = inner
                .config
                .capacity
                .saturating_sub(inner.semaphore.available_permits());
            if idle_len + reserved >= inner.config.min_idle {
                break;
            }
            let Ok(permit) = inner.semaphore.try_acquire() else {
                break;
            };
            match inner.factory.create().await {
                Ok(handle) => {
                    inner.idle.lock().push_back(Entry::new(handle));
                    inner.stats.lock().created += 1;
                    drop(permit);
                    // Shutdown may have raced the refill create; drain
                    // anything its own drain missed so no handle outlives
                    // the pool.
                    if inner.closed.load(Ordering::SeqCst) {
                        let drained: Vec<_> = { inner.idle.lock().drain(..).collect() };
                        let n = drained.len();
                        for entry in drained {
                            inner.factory.destroy(entry.handle).await;
                        }
                        if n > 0 {
                            let mut stats = inner.stats.lock();
                            stats.destroyed += n as u64;
                            stats.idle = 0;
                        }
                        return Err(Error::Closed);
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "maintenance refill create failed");
                    break;
                }
            }
        }

        let idle_len = inner.idle.lock().len();
        inner.stats.lock().idle = idle_len;
        Ok(())
    }

    /// Shut down the pool.
    ///
    /// Blocks new acquisitions, fails every parked waiter with
    /// [`Error::Closed`], and destroys all idle handles. Outstanding leases
    /// stay usable; their handles are destroyed when dropped. Idempotent.
    pub async fn shutdown(&self) -> Result<()> {
        let inner = &self.inner;
        if inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        // Closing the semaphore wakes every parked acquirer with an error.
        inner.semaphore.close();

        let drained: Vec<_> = { inner.idle.lock().drain(..).collect() };
        let n = drained.len();
        for entry in drained {
            inner.factory.destroy(entry.handle).await;
        }

        let mut stats = inner.stats.lock();
        stats.destroyed += n as u64;
        stats.idle = 0;
        drop(stats);

        tracing::debug!(destroyed = n, "pool shut down");
        Ok(())
    }

    fn exhausted(&self, waited: Duration) -> Error {
        let in_use = self.inner.stats.lock().active;
        Error::Exhausted {
            in_use,
            capacity: self.inner.config.capacity,
            waited,
        }
    }
}
