//! Stress command
//!
//! Runs worker threads against a pool of simulated connections and checks
//! that the pool never opened more connections than its maximum size and
//! never handed out a connection that still carried another lease's state.

use crate::config::CliConfig;
use crate::sim::SimManager;
use anyhow::{anyhow, bail, Context, Result};
use cistern_pool::{PoolError, PoolStats, PoolStatus, ResourcePool};
use clap::Args;
use log::{debug, info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Arguments for the stress command
#[derive(Args, Default)]
pub struct StressArgs {
    /// Path to a configuration file (defaults are used otherwise)
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Number of worker threads
    #[clap(long)]
    pub threads: Option<usize>,

    /// Acquire/release cycles per thread
    #[clap(long)]
    pub iterations: Option<usize>,

    /// Pool capacity
    #[clap(long)]
    pub capacity: Option<usize>,

    /// Extra resources allowed beyond capacity
    #[clap(long)]
    pub overflow: Option<usize>,

    /// Print the report as JSON
    #[clap(long)]
    pub json: bool,
}

impl StressArgs {
    /// Load the configuration file, if any, and apply command-line overrides.
    pub fn resolve(&self) -> Result<CliConfig> {
        let mut config = match &self.config {
            Some(path) => CliConfig::load(path)?,
            None => CliConfig::default(),
        };

        if let Some(threads) = self.threads {
            config.workload.threads = threads;
        }
        if let Some(iterations) = self.iterations {
            config.workload.iterations = iterations;
        }
        if let Some(capacity) = self.capacity {
            config.pool.capacity = capacity;
        }
        if let Some(overflow) = self.overflow {
            config.pool.overflow = overflow;
        }
        Ok(config)
    }
}

/// Outcome of a stress run
#[derive(Debug, Serialize)]
pub struct StressReport {
    /// Number of worker threads
    pub threads: usize,

    /// Acquire attempts per thread
    pub iterations: usize,

    /// Acquires that produced a lease
    pub succeeded: u64,

    /// Acquires that timed out
    pub exhausted: u64,

    /// Acquires that failed because a connection could not be opened
    pub factory_errors: u64,

    /// Any other pool error, including failed returns
    pub unexpected_errors: u64,

    /// Leases that found session state left by a previous holder
    pub leaks: u64,

    /// Most queries served by a single connection
    pub busiest_connection: u64,

    /// Wall-clock duration of the run
    pub elapsed_ms: u64,

    /// `capacity + overflow` of the pool under test
    pub max_size: usize,

    /// Highest number of connections open at once
    pub peak_open: usize,

    /// Connections still open after the pool was shut down
    pub open_after_shutdown: usize,

    /// Whether every check passed
    pub invariant_held: bool,

    /// Pool bookkeeping once all workers finished
    pub status: PoolStatus,

    /// Cumulative pool counters
    pub stats: PoolStats,
}

impl StressReport {
    fn render(&self) -> String {
        format!(
            "Stress run finished in {}ms ({} threads x {} iterations)\n\
             \x20 succeeded:          {}\n\
             \x20 exhausted:          {}\n\
             \x20 factory errors:     {}\n\
             \x20 unexpected errors:  {}\n\
             \x20 state leaks:        {}\n\
             \x20 busiest connection: {} queries\n\
             \x20 peak open:          {} (max size {})\n\
             \x20 created / closed:   {} / {}\n\
             \x20 invalidated:        {}\n\
             \x20 orphans reclaimed:  {}\n\
             \x20 invariant held:     {}\n",
            self.elapsed_ms,
            self.threads,
            self.iterations,
            self.succeeded,
            self.exhausted,
            self.factory_errors,
            self.unexpected_errors,
            self.leaks,
            self.busiest_connection,
            self.peak_open,
            self.max_size,
            self.stats.created,
            self.stats.closed,
            self.stats.invalidated,
            self.stats.orphans_reclaimed,
            self.invariant_held,
        )
    }
}

#[derive(Default)]
struct Tally {
    succeeded: AtomicU64,
    exhausted: AtomicU64,
    factory_errors: AtomicU64,
    unexpected_errors: AtomicU64,
    leaks: AtomicU64,
    busiest_connection: AtomicU64,
}

/// Run the workload described by `config`.
pub fn run(config: &CliConfig) -> Result<StressReport> {
    let pool_config = config.pool_config().context("invalid pool configuration")?;
    let workload = config.workload.clone();
    let max_size = pool_config.max_size();

    let (manager, counters) = SimManager::new(&workload);
    let pool = ResourcePool::new(manager, pool_config)?;
    let tally = Arc::new(Tally::default());
    let hold = Duration::from_millis(workload.hold_ms);

    info!(
        "Starting stress run: {} threads x {} iterations, max size {}",
        workload.threads, workload.iterations, max_size
    );
    let start = Instant::now();

    let handles: Vec<_> = (0..workload.threads)
        .map(|worker| {
            let pool = Arc::clone(&pool);
            let tally = Arc::clone(&tally);
            let iterations = workload.iterations;
            thread::spawn(move || {
                for i in 0..iterations {
                    let mut conn = match pool.acquire() {
                        Ok(conn) => conn,
                        Err(PoolError::Exhausted { waited }) => {
                            debug!("Worker {} gave up after {:?}", worker, waited);
                            tally.exhausted.fetch_add(1, Ordering::SeqCst);
                            continue;
                        }
                        Err(PoolError::Factory(err)) => {
                            debug!("Worker {} could not connect: {}", worker, err);
                            tally.factory_errors.fetch_add(1, Ordering::SeqCst);
                            continue;
                        }
                        Err(err) => {
                            warn!("Worker {} hit an unexpected pool error: {}", worker, err);
                            tally.unexpected_errors.fetch_add(1, Ordering::SeqCst);
                            continue;
                        }
                    };

                    if conn.session_tag.is_some() {
                        tally.leaks.fetch_add(1, Ordering::SeqCst);
                    }
                    conn.session_tag = Some(format!("worker-{}", worker));
                    conn.queries += 1;
                    tally.busiest_connection.fetch_max(conn.queries, Ordering::SeqCst);

                    if !hold.is_zero() {
                        thread::sleep(hold);
                    }

                    // Every tenth lease is abandoned to exercise reclamation.
                    if i % 10 == 9 {
                        drop(conn);
                    } else if let Err(err) = conn.close() {
                        warn!("Worker {} failed to return a connection: {}", worker, err);
                        tally.unexpected_errors.fetch_add(1, Ordering::SeqCst);
                    }
                    tally.succeeded.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();

    for handle in handles {
        handle
            .join()
            .map_err(|_| anyhow!("stress worker panicked"))?;
    }

    let elapsed = start.elapsed();
    let status = pool.status();
    let stats = pool.stats();
    pool.shutdown();

    let peak_open = counters.peak_open();
    let open_after_shutdown = counters.open();
    let leaks = tally.leaks.load(Ordering::SeqCst);
    let unexpected_errors = tally.unexpected_errors.load(Ordering::SeqCst);
    let invariant_held =
        peak_open <= max_size && leaks == 0 && unexpected_errors == 0 && open_after_shutdown == 0;

    info!(
        "Stress run finished in {:?}: peak open {} of {}",
        elapsed, peak_open, max_size
    );

    Ok(StressReport {
        threads: workload.threads,
        iterations: workload.iterations,
        succeeded: tally.succeeded.load(Ordering::SeqCst),
        exhausted: tally.exhausted.load(Ordering::SeqCst),
        factory_errors: tally.factory_errors.load(Ordering::SeqCst),
        unexpected_errors,
        leaks,
        busiest_connection: tally.busiest_connection.load(Ordering::SeqCst),
        elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        max_size,
        peak_open,
        open_after_shutdown,
        invariant_held,
        status,
        stats,
    })
}

/// Implementation of the stress command
pub fn execute(args: &StressArgs) -> Result<()> {
    let config = args.resolve()?;
    let report = run(&config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render());
    }

    if !report.invariant_held {
        bail!(
            "pool invariant violated: peak open {} (max {}), {} state leaks, {} unexpected errors",
            report.peak_open,
            report.max_size,
            report.leaks,
            report.unexpected_errors
        );
    }
    Ok(())
}
