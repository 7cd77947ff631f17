//! Resource pooling for reusable resources like connections, sockets, etc.
//!
//! Provides bounded, thread-safe lending of expensive resources with
//! lifecycle management: lazy creation, validation, normalization, overflow
//! trimming and teardown.

use super::lease::Lease;
use super::state::{IdleEntry, PoolState};
use super::ResourceId;
use crate::config::PoolConfig;
use crate::error::{ConfigError, PoolError, UsageError};
use crate::manager::ResourceManager;
use crate::stats::{PoolStats, PoolStatus, StatsRecorder};
use log::{debug, info, trace, warn};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A pool of reusable resources
///
/// At most `capacity + overflow` resources are alive at any time. Callers
/// that find the pool saturated wait in FIFO order until a resource is
/// returned or their timeout expires.
pub struct ResourcePool<M: ResourceManager> {
    /// Creates, checks, resets and closes resources
    manager: M,

    /// Configuration for this pool
    config: PoolConfig,

    /// `capacity + overflow`
    max_size: usize,

    /// Idle queue, live set and waiter queue
    state: Mutex<PoolState<M::Resource>>,

    /// Signalled whenever a resource or a slot may have become available
    available: Condvar,

    /// Source of resource identifiers
    next_id: AtomicU64,

    /// Cumulative counters
    stats: StatsRecorder,
}

/// A slot reserved for a resource that is being created.
///
/// Released again if creation fails or panics.
struct Reservation<'a, M: ResourceManager> {
    pool: &'a ResourcePool<M>,
    armed: bool,
}

impl<'a, M: ResourceManager> Reservation<'a, M> {
    /// Wrap a slot already counted in `pending`.
    fn new(pool: &'a ResourcePool<M>) -> Self {
        Self { pool, armed: true }
    }

    /// Turn the reserved slot over to a created resource.
    fn commit(mut self, state: &mut PoolState<M::Resource>) {
        state.pending -= 1;
        self.armed = false;
    }
}

impl<M: ResourceManager> Drop for Reservation<'_, M> {
    fn drop(&mut self) {
        if self.armed {
            self.pool.state.lock().pending -= 1;
            self.pool.available.notify_all();
        }
    }
}

/// A leased slot whose resource is in the hands of a manager hook.
///
/// If the hook panics the resource is lost, so the slot is retired on drop.
struct SlotGuard<'a, M: ResourceManager> {
    pool: &'a ResourcePool<M>,
    id: ResourceId,
    armed: bool,
}

impl<'a, M: ResourceManager> SlotGuard<'a, M> {
    fn new(pool: &'a ResourcePool<M>, id: ResourceId) -> Self {
        Self {
            pool,
            id,
            armed: true,
        }
    }

    /// The resource made it out of the hooks; keep the slot.
    fn disarm(mut self) {
        self.armed = false;
    }

    /// Free the slot now. Returns whether it was still live.
    fn retire(mut self) -> bool {
        self.armed = false;
        self.pool.retire_slot(self.id)
    }
}

impl<M: ResourceManager> Drop for SlotGuard<'_, M> {
    fn drop(&mut self) {
        if self.armed && self.pool.retire_slot(self.id) {
            warn!("Resource {} lost to a panicking manager hook, slot freed", self.id);
        }
    }
}

impl<M: ResourceManager> ResourcePool<M> {
    /// Create a new resource pool.
    ///
    /// No resources are created up front; the first `acquire` creates the
    /// first resource.
    pub fn new(manager: M, config: PoolConfig) -> Result<Arc<Self>, ConfigError> {
        let max_size = config.validate()?;

        info!(
            "Creating resource pool (capacity {}, overflow {}, timeout {:?})",
            config.capacity, config.overflow, config.timeout
        );

        Ok(Arc::new(Self {
            manager,
            state: Mutex::new(PoolState::new(config.capacity)),
            config,
            max_size,
            available: Condvar::new(),
            next_id: AtomicU64::new(1),
            stats: StatsRecorder::default(),
        }))
    }

    /// The configuration this pool was created with
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// The resource manager
    pub fn manager(&self) -> &M {
        &self.manager
    }

    /// Acquire a resource with the configured timeout
    pub fn acquire(self: &Arc<Self>) -> Result<Lease<M>, PoolError<M::Error>> {
        self.acquire_with_timeout(self.config.timeout)
    }

    /// Try to acquire a resource without waiting
    pub fn try_acquire(self: &Arc<Self>) -> Result<Lease<M>, PoolError<M::Error>> {
        self.acquire_with_timeout(Some(Duration::ZERO))
    }

    /// Acquire a resource, waiting at most `timeout` (`None` waits forever).
    ///
    /// An idle resource is preferred; otherwise a new one is created if the
    /// pool is below its maximum size. A caller that gives up leaves the
    /// pool exactly as it found it.
    pub fn acquire_with_timeout(
        self: &Arc<Self>,
        timeout: Option<Duration>,
    ) -> Result<Lease<M>, PoolError<M::Error>> {
        let start = Instant::now();
        let deadline = timeout.and_then(|t| start.checked_add(t));
        self.acquire_until(start, deadline, false)
    }

    /// Wait for a resource until `deadline` (`None` waits forever).
    ///
    /// A caller retrying after its resource was taken away underneath it
    /// goes to the front of the queue.
    fn acquire_until(
        self: &Arc<Self>,
        start: Instant,
        deadline: Option<Instant>,
        retry: bool,
    ) -> Result<Lease<M>, PoolError<M::Error>> {
        let mut state = self.state.lock();
        if state.shutdown {
            return Err(PoolError::Shutdown);
        }

        let ticket = if retry {
            state.take_front_ticket()
        } else {
            state.take_ticket()
        };

        loop {
            if state.shutdown {
                state.leave_queue(ticket);
                drop(state);
                self.available.notify_all();
                return Err(PoolError::Shutdown);
            }

            if state.is_next(ticket) {
                if let Some(entry) = state.pop_idle() {
                    state.leave_queue(ticket);
                    drop(state);
                    self.available.notify_all();
                    return self.checkout(entry, start, deadline);
                }

                if state.occupied() < self.max_size {
                    state.pending += 1;
                    state.leave_queue(ticket);
                    drop(state);
                    self.available.notify_all();
                    return self.create_leased(Reservation::new(self));
                }
            }

            let Some(deadline) = deadline else {
                self.available.wait(&mut state);
                continue;
            };

            if Instant::now() >= deadline {
                state.leave_queue(ticket);
                drop(state);
                self.available.notify_all();

                let waited = start.elapsed();
                self.stats.timeouts.incr();
                debug!("Timed out waiting for a resource after {:?}", waited);
                return Err(PoolError::Exhausted { waited });
            }

            self.available.wait_until(&mut state, deadline);
        }
    }

    /// Run `f` with a leased resource and return the resource afterwards.
    ///
    /// The resource goes back to the pool even if `f` panics.
    pub fn with_lease<T, F>(self: &Arc<Self>, f: F) -> Result<T, PoolError<M::Error>>
    where
        F: FnOnce(&mut M::Resource) -> T,
    {
        let mut lease = self.acquire()?;
        lease.set_scoped();
        let output = f(lease.get_mut());
        lease.close()?;
        Ok(output)
    }

    /// Return a lease to the pool.
    ///
    /// Equivalent to [`Lease::close`], but also checks that the lease was
    /// issued by this pool. A foreign lease is handed back to its own pool
    /// and reported as a usage error.
    pub fn release(&self, lease: Lease<M>) -> Result<(), UsageError> {
        if !std::ptr::eq(Arc::as_ptr(lease.pool()), self) {
            let id = lease.id();
            warn!("Lease for resource {} released to a pool that did not issue it", id);
            if let Err(err) = lease.close() {
                debug!("Foreign lease could not be returned to its pool: {}", err);
            }
            return Err(UsageError::ForeignLease(id));
        }

        lease.close()
    }

    /// Close every idle resource and forget every leased one.
    ///
    /// Outstanding leases stay usable by their holders, but their resources
    /// are closed instead of reused when they come back. Returns the number
    /// of resources closed immediately.
    pub fn empty_pool(&self) -> usize {
        let (drained, outstanding) = {
            let mut state = self.state.lock();
            let outstanding = state.leased();
            state.live.clear();
            let drained: Vec<IdleEntry<M::Resource>> = state.idle.drain(..).collect();
            (drained, outstanding)
        };
        self.available.notify_all();

        info!(
            "Emptying resource pool: closing {} idle resources, {} leases outstanding",
            drained.len(),
            outstanding
        );

        let closed = drained.len();
        for entry in drained {
            self.close_quietly(entry.id, entry.resource);
        }
        closed
    }

    /// Shut down the pool, closing all idle resources.
    ///
    /// Waiting and future acquirers fail with [`PoolError::Shutdown`]; leases
    /// returned afterwards are closed.
    pub fn shutdown(&self) {
        {
            let mut state = self.state.lock();
            if state.shutdown {
                return;
            }
            state.shutdown = true;
        }

        info!("Shutting down resource pool...");
        self.empty_pool();
        info!("Resource pool shutdown complete.");
    }

    /// Whether [`ResourcePool::shutdown`] has been called
    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    /// A snapshot of the pool's bookkeeping
    pub fn status(&self) -> PoolStatus {
        let state = self.state.lock();
        PoolStatus {
            capacity: self.config.capacity,
            overflow: self.config.overflow,
            max_size: self.max_size,
            live: state.live.len(),
            idle: state.idle.len(),
            leased: state.leased(),
            pending: state.pending,
            waiting: state.waiting(),
            shutdown: state.shutdown,
        }
    }

    /// Cumulative counters since the pool was created
    pub fn stats(&self) -> PoolStats {
        self.stats.snapshot()
    }

    /// Get the current number of idle resources
    pub fn available_count(&self) -> usize {
        self.state.lock().idle.len()
    }

    /// Get the total number of live resources (idle + leased)
    pub fn total_count(&self) -> usize {
        self.state.lock().live.len()
    }

    /// Validate and normalize a resource taken from the idle queue.
    fn checkout(
        self: &Arc<Self>,
        entry: IdleEntry<M::Resource>,
        start: Instant,
        deadline: Option<Instant>,
    ) -> Result<Lease<M>, PoolError<M::Error>> {
        let IdleEntry {
            id,
            mut resource,
            idle_since,
        } = entry;

        let slot = SlotGuard::new(self, id);
        if self.manager.validate(&mut resource) {
            trace!(
                "Reusing resource {} (idle for {:?})",
                id,
                idle_since.elapsed()
            );
            return self.lease_out(slot, resource);
        }

        self.stats.invalidated.incr();
        debug!("Resource {} failed validation, replacing it", id);

        // The replacement takes over the discarded resource's slot.
        let reservation = {
            let mut state = self.state.lock();
            let removed = state.retire(id);
            if removed {
                state.pending += 1;
            }
            removed
        }
        .then(|| Reservation::new(self));
        slot.disarm();
        self.close_quietly(id, resource);

        match reservation {
            Some(reservation) => self.create_leased(reservation),
            None => {
                // Emptied underneath us; wait out the rest of our time.
                self.available.notify_all();
                self.acquire_until(start, deadline, true)
            }
        }
    }

    /// Create a resource in a reserved slot and lease it out.
    fn create_leased(
        self: &Arc<Self>,
        reservation: Reservation<'_, M>,
    ) -> Result<Lease<M>, PoolError<M::Error>> {
        let resource = match self.manager.create() {
            Ok(resource) => resource,
            Err(err) => {
                self.stats.factory_failures.incr();
                warn!("Failed to create resource: {}", err);
                return Err(PoolError::Factory(err));
            }
        };

        let id = ResourceId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.stats.created.incr();

        let shutdown = {
            let mut state = self.state.lock();
            reservation.commit(&mut state);
            if !state.shutdown {
                state.insert_leased(id);
            }
            state.shutdown
        };

        if shutdown {
            self.available.notify_all();
            self.close_quietly(id, resource);
            return Err(PoolError::Shutdown);
        }

        debug!("Created resource {}", id);
        self.lease_out(SlotGuard::new(self, id), resource)
    }

    fn lease_out(
        self: &Arc<Self>,
        slot: SlotGuard<'_, M>,
        mut resource: M::Resource,
    ) -> Result<Lease<M>, PoolError<M::Error>> {
        let id = slot.id;
        self.manager.normalize(&mut resource);
        self.stats.acquired.incr();
        trace!("Leasing resource {}", id);
        let lease = Lease::new(id, resource, Arc::clone(self));
        slot.disarm();
        Ok(lease)
    }

    /// Take a resource back from a lease.
    pub(super) fn return_resource(
        &self,
        id: ResourceId,
        mut resource: M::Resource,
    ) -> Result<(), UsageError> {
        self.stats.released.incr();

        if self.config.validate_on_release {
            let slot = SlotGuard::new(self, id);
            if !self.manager.validate(&mut resource) {
                self.stats.invalidated.incr();
                debug!("Returned resource {} is invalid, discarding", id);
                self.close_quietly(id, resource);
                return if slot.retire() {
                    Ok(())
                } else {
                    Err(UsageError::NotLive(id))
                };
            }
            slot.disarm();
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;

        if !state.is_leased(id) {
            drop(guard);
            debug!("Resource {} returned after it was retired, closing it", id);
            self.close_quietly(id, resource);
            return Err(UsageError::NotLive(id));
        }

        if !state.shutdown && state.idle.len() < self.config.capacity {
            state.push_idle(id, resource);
            drop(guard);
            self.available.notify_all();
            trace!("Resource {} returned to the idle queue", id);
            return Ok(());
        }

        drop(guard);
        let slot = SlotGuard::new(self, id);
        self.close_quietly(id, resource);
        slot.disarm();

        // The slot is only freed once the resource is really closed.
        let age = self.state.lock().live.remove(&id).map(|slot| slot.created_at.elapsed());
        self.available.notify_all();
        debug!("Idle queue full, closed overflow resource {} (age {:?})", id, age);
        Ok(())
    }

    /// Forget a leased resource whose holder keeps it for good.
    pub(super) fn detach(&self, id: ResourceId) {
        if self.retire_slot(id) {
            debug!("Resource {} detached from the pool", id);
        }
    }

    /// Drop a leased slot from the live set and wake waiters.
    fn retire_slot(&self, id: ResourceId) -> bool {
        let removed = self.state.lock().retire(id);
        self.available.notify_all();
        removed
    }

    pub(super) fn is_leased(&self, id: ResourceId) -> bool {
        self.state.lock().is_leased(id)
    }

    pub(super) fn note_orphan(&self, id: ResourceId, held_for: Duration) {
        self.stats.orphans_reclaimed.incr();
        if self.config.orphan_warnings {
            warn!(
                "Lease for resource {} dropped without close after {:?}; reclaiming it",
                id, held_for
            );
        }
    }

    /// Close a resource, logging rather than returning any error.
    fn close_quietly(&self, id: ResourceId, resource: M::Resource) {
        self.stats.closed.incr();
        match self.manager.close(resource) {
            Ok(()) => trace!("Closed resource {}", id),
            Err(err) => {
                self.stats.close_failures.incr();
                warn!("Failed to close resource {}: {}", id, err);
            }
        }
    }
}

impl<M: ResourceManager> Drop for ResourcePool<M> {
    fn drop(&mut self) {
        let drained: Vec<IdleEntry<M::Resource>> = self.state.get_mut().idle.drain(..).collect();
        if !drained.is_empty() {
            debug!("Dropping resource pool with {} idle resources", drained.len());
        }
        for entry in drained {
            self.close_quietly(entry.id, entry.resource);
        }
    }
}

impl<M: ResourceManager> fmt::Debug for ResourcePool<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("config", &self.config)
            .field("status", &self.status())
            .finish()
    }
}
