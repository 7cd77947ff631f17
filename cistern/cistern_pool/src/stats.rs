//! Pool status snapshots and cumulative counters.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A point-in-time view of the pool's bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Maximum number of idle resources
    pub capacity: usize,

    /// Extra resources allowed under load
    pub overflow: usize,

    /// `capacity + overflow`
    pub max_size: usize,

    /// Resources created and not yet closed
    pub live: usize,

    /// Resources waiting in the idle queue
    pub idle: usize,

    /// Resources currently wrapped by a lease
    pub leased: usize,

    /// Slots reserved for resources being created
    pub pending: usize,

    /// Callers blocked in `acquire`
    pub waiting: usize,

    /// Whether the pool has been shut down
    pub shutdown: bool,
}

/// Cumulative counters for a pool
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Resources created by the manager
    pub created: u64,

    /// Resources closed by the pool
    pub closed: u64,

    /// Close calls that returned an error
    pub close_failures: u64,

    /// Successful acquisitions
    pub acquired: u64,

    /// Leases returned to the pool
    pub released: u64,

    /// Acquisitions that gave up after the timeout
    pub timeouts: u64,

    /// Resources discarded because validation failed
    pub invalidated: u64,

    /// Leases dropped without an explicit close
    pub orphans_reclaimed: u64,

    /// Factory calls that returned an error
    pub factory_failures: u64,
}

/// A counter that can be incremented and read atomically.
#[derive(Debug, Default)]
pub(crate) struct Counter(AtomicU64);

impl Counter {
    /// Increment the counter.
    pub(crate) fn incr(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current value of the counter.
    pub(crate) fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Live counters behind [`PoolStats`]
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    pub(crate) created: Counter,
    pub(crate) closed: Counter,
    pub(crate) close_failures: Counter,
    pub(crate) acquired: Counter,
    pub(crate) released: Counter,
    pub(crate) timeouts: Counter,
    pub(crate) invalidated: Counter,
    pub(crate) orphans_reclaimed: Counter,
    pub(crate) factory_failures: Counter,
}

impl StatsRecorder {
    pub(crate) fn snapshot(&self) -> PoolStats {
        PoolStats {
            created: self.created.get(),
            closed: self.closed.get(),
            close_failures: self.close_failures.get(),
            acquired: self.acquired.get(),
            released: self.released.get(),
            timeouts: self.timeouts.get(),
            invalidated: self.invalidated.get(),
            orphans_reclaimed: self.orphans_reclaimed.get(),
            factory_failures: self.factory_failures.get(),
        }
    }
}
