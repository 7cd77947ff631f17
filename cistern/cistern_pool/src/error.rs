//! Error types for the resource pool.
//!
//! Errors are split by who has to act on them: [`ConfigError`] is fatal at
//! construction, [`PoolError`] is what `acquire` reports, and [`UsageError`]
//! signals a caller bug when returning a lease.

use crate::pool::ResourceId;
use std::time::Duration;
use thiserror::Error;

/// Error returned when a pool configuration is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The idle queue must be able to hold at least one resource
    #[error("pool capacity must be at least 1")]
    ZeroCapacity,

    /// `capacity + overflow` does not fit in a `usize`
    #[error("pool capacity {capacity} plus overflow {overflow} is too large")]
    SizeOverflow {
        /// The requested capacity
        capacity: usize,
        /// The requested overflow
        overflow: usize,
    },

    /// The configuration could not be read or parsed
    #[error("invalid pool configuration: {0}")]
    Invalid(String),
}

/// Error returned when a lease is handed back incorrectly
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// The lease was issued by a different pool
    #[error("lease for resource {0} belongs to a different pool")]
    ForeignLease(ResourceId),

    /// The resource is no longer tracked by the pool, e.g. after `empty_pool`
    #[error("resource {0} is not live in this pool")]
    NotLive(ResourceId),
}

/// Error returned when a resource cannot be acquired from the pool
#[derive(Error, Debug)]
pub enum PoolError<E> {
    /// No resource became available within the timeout
    #[error("resource pool exhausted after waiting {waited:?}")]
    Exhausted {
        /// How long the caller waited before giving up
        waited: Duration,
    },

    /// The pool is shut down
    #[error("resource pool is shut down")]
    Shutdown,

    /// The resource manager failed to create a resource
    #[error("failed to create resource: {0}")]
    Factory(#[source] E),

    /// The pool was used incorrectly
    #[error(transparent)]
    Usage(#[from] UsageError),
}

impl<E> PoolError<E> {
    /// Whether retrying the same call later may succeed.
    ///
    /// Only exhaustion is retryable; factory failures may stand for real
    /// outages and the retry policy for those belongs to the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }

    /// Returns the factory error, if this is one.
    pub fn into_factory_error(self) -> Option<E> {
        match self {
            Self::Factory(err) => Some(err),
            _ => None,
        }
    }
}
