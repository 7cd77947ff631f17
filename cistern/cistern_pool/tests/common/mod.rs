//! Shared test fixtures: a manager whose resources record how they are used.

#![allow(dead_code)]

use cistern_pool::{PoolConfig, ResourceManager, ResourcePool};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Error raised by the test connection factory
#[derive(Debug)]
pub struct ConnectError(pub String);

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connect failed: {}", self.0)
    }
}

impl std::error::Error for ConnectError {}

/// A fake connection carrying per-lease session state
#[derive(Debug)]
pub struct TestConnection {
    pub serial: usize,
    pub session: HashMap<String, String>,
    pub healthy: bool,
    /// Set while some lease holds this connection
    pub in_use: Arc<AtomicBool>,
}

/// Observations shared between a manager and the test that owns it
#[derive(Debug, Default)]
pub struct Tracker {
    pub created: AtomicUsize,
    pub closed: AtomicUsize,
    pub open: AtomicUsize,
    pub peak_open: AtomicUsize,
    pub normalized: AtomicUsize,
    pub fail_create: AtomicBool,
    /// Serial numbers in the order they were closed
    pub closed_serials: Mutex<Vec<usize>>,
}

impl Tracker {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn open(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub fn peak_open(&self) -> usize {
        self.peak_open.load(Ordering::SeqCst)
    }
}

/// Manager for [`TestConnection`]s
pub struct TestManager {
    pub tracker: Arc<Tracker>,
    pub connect_delay: Duration,
}

impl TestManager {
    pub fn new() -> (Self, Arc<Tracker>) {
        let tracker = Arc::new(Tracker::default());
        let manager = Self {
            tracker: Arc::clone(&tracker),
            connect_delay: Duration::ZERO,
        };
        (manager, tracker)
    }
}

impl ResourceManager for TestManager {
    type Resource = TestConnection;
    type Error = ConnectError;

    fn create(&self) -> Result<TestConnection, ConnectError> {
        if self.tracker.fail_create.load(Ordering::SeqCst) {
            return Err(ConnectError("database unreachable".into()));
        }
        if !self.connect_delay.is_zero() {
            std::thread::sleep(self.connect_delay);
        }

        let serial = self.tracker.created.fetch_add(1, Ordering::SeqCst) + 1;
        let open = self.tracker.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.tracker.peak_open.fetch_max(open, Ordering::SeqCst);

        Ok(TestConnection {
            serial,
            session: HashMap::new(),
            healthy: true,
            in_use: Arc::new(AtomicBool::new(false)),
        })
    }

    fn validate(&self, conn: &mut TestConnection) -> bool {
        conn.healthy
    }

    fn normalize(&self, conn: &mut TestConnection) {
        self.tracker.normalized.fetch_add(1, Ordering::SeqCst);
        conn.session.clear();
    }

    fn close(&self, conn: TestConnection) -> Result<(), ConnectError> {
        self.tracker.closed.fetch_add(1, Ordering::SeqCst);
        self.tracker.open.fetch_sub(1, Ordering::SeqCst);
        self.tracker
            .closed_serials
            .lock()
            .unwrap()
            .push(conn.serial);
        Ok(())
    }
}

pub type TestPool = ResourcePool<TestManager>;

pub fn pool(config: PoolConfig) -> (Arc<TestPool>, Arc<Tracker>) {
    let (manager, tracker) = TestManager::new();
    (ResourcePool::new(manager, config).unwrap(), tracker)
}

/// Wait until `cond` holds, polling briefly.
pub fn wait_for(mut cond: impl FnMut() -> bool) {
    let start = std::time::Instant::now();
    while !cond() {
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "condition not reached in time"
        );
        std::thread::sleep(Duration::from_millis(1));
    }
}
