//! Simulated connections for exercising a pool without a real backend.

use crate::config::WorkloadSection;
use cistern_pool::ResourceManager;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Error produced by simulated connections
#[derive(Error, Debug)]
pub enum SimError {
    /// The simulated server refused the connection
    #[error("connection {0} refused by simulated server")]
    Refused(usize),
}

/// A simulated database connection
#[derive(Debug)]
pub struct SimConnection {
    /// Sequence number of the connection attempt that produced this connection
    pub serial: usize,

    /// Session variable left behind by the last lease, if any
    pub session_tag: Option<String>,

    /// Number of queries run on this connection
    pub queries: u64,
}

/// Counters shared between the manager and the stress report
#[derive(Debug, Default)]
pub struct SimCounters {
    pub(crate) attempts: AtomicUsize,
    pub(crate) validations: AtomicUsize,
    pub(crate) open: AtomicUsize,
    pub(crate) peak_open: AtomicUsize,
}

impl SimCounters {
    /// Connections currently open
    pub fn open(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously open connections
    pub fn peak_open(&self) -> usize {
        self.peak_open.load(Ordering::SeqCst)
    }
}

/// Manager creating [`SimConnection`]s with configurable faults
#[derive(Debug)]
pub struct SimManager {
    connect_delay: Duration,
    stale_every: usize,
    fail_every: usize,
    counters: Arc<SimCounters>,
}

impl SimManager {
    /// Build a manager from workload settings.
    pub fn new(workload: &WorkloadSection) -> (Self, Arc<SimCounters>) {
        let counters = Arc::new(SimCounters::default());
        let manager = Self {
            connect_delay: Duration::from_millis(workload.connect_ms),
            stale_every: workload.stale_every,
            fail_every: workload.fail_every,
            counters: Arc::clone(&counters),
        };
        (manager, counters)
    }
}

fn every(n: usize, count: usize) -> bool {
    n != 0 && count % n == 0
}

impl ResourceManager for SimManager {
    type Resource = SimConnection;
    type Error = SimError;

    fn create(&self) -> Result<SimConnection, SimError> {
        let serial = self.counters.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.connect_delay.is_zero() {
            thread::sleep(self.connect_delay);
        }
        if every(self.fail_every, serial) {
            return Err(SimError::Refused(serial));
        }

        let open = self.counters.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak_open.fetch_max(open, Ordering::SeqCst);

        Ok(SimConnection {
            serial,
            session_tag: None,
            queries: 0,
        })
    }

    fn validate(&self, _conn: &mut SimConnection) -> bool {
        let count = self.counters.validations.fetch_add(1, Ordering::SeqCst) + 1;
        !every(self.stale_every, count)
    }

    fn normalize(&self, conn: &mut SimConnection) {
        conn.session_tag = None;
    }

    fn close(&self, _conn: SimConnection) -> Result<(), SimError> {
        self.counters.open.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
