#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

//! # Cistern Pool
//!
//! A bounded, thread-safe pool of expensive-to-create resources.
//!
//! The pool lends resources out through [`Lease`] handles. A lease
//! dereferences to the resource it wraps and gives it back to the pool
//! exactly once, either through [`Lease::close`] or when it is dropped.
//!
//! - Resources are created lazily by a [`ResourceManager`], never pre-warmed
//! - At most `capacity` resources are kept idle for reuse
//! - Up to `overflow` extra resources may exist under load; they are closed
//!   when returned to a full idle queue
//! - Callers that find the pool saturated wait in FIFO order, up to the
//!   configured timeout
//!
//! ```
//! use cistern_pool::{FnManager, PoolConfig, ResourcePool};
//! use std::convert::Infallible;
//!
//! let manager = FnManager::new(
//!     || Ok::<_, Infallible>(Vec::<u8>::new()),
//!     |_buf: &mut Vec<u8>| true,
//!     |buf: &mut Vec<u8>| buf.clear(),
//! );
//! let pool = ResourcePool::new(manager, PoolConfig::new(2)).unwrap();
//!
//! let mut lease = pool.acquire().unwrap();
//! lease.extend_from_slice(b"scratch");
//! lease.close().unwrap();
//!
//! assert!(pool.acquire().unwrap().is_empty());
//! ```

/// Pool configuration and validation
pub mod config;

/// Error types returned by the pool
pub mod error;

/// The resource manager seam: creation, validation, normalization, closing
pub mod manager;

/// The pool itself and the leases it hands out
pub mod pool;

/// Pool status snapshots and cumulative counters
pub mod stats;

pub use config::{PoolConfig, PoolSection};
pub use error::{ConfigError, PoolError, UsageError};
pub use manager::{FnManager, ResourceManager};
pub use pool::{Lease, ResourceId, ResourcePool};
pub use stats::{PoolStats, PoolStatus};
