//! Resource pooling and leased access to pooled resources.
//!
//! - [`ResourcePool`] owns the idle queue and the live set and decides when
//!   to create, reuse, trim or close resources
//! - [`Lease`] is the handle callers hold while they use a resource

pub mod lease;
pub mod resource;
mod state;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use lease::Lease;
pub use resource::ResourcePool;

/// Identifier of a resource within its pool
///
/// Assigned at creation and never reused, so a lease that outlives an
/// `empty_pool` can never be mistaken for a newer resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Wrap a raw identifier.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res-{}", self.0)
    }
}
