//! Leased access to a pooled resource.

use super::resource::ResourcePool;
use super::ResourceId;
use crate::error::UsageError;
use crate::manager::ResourceManager;
use log::debug;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A handle to a resource from the pool
///
/// Dereferences to the resource. The resource goes back to the pool exactly
/// once: through [`Lease::close`], or when the lease is dropped.
pub struct Lease<M: ResourceManager> {
    /// Identifier of the resource within its pool
    id: ResourceId,

    /// The resource itself; only empty once it has been handed back
    resource: Option<M::Resource>,

    /// The pool this resource belongs to
    pool: Arc<ResourcePool<M>>,

    /// When this resource was acquired
    acquired_at: Instant,

    /// Set when the pool itself disposes of the lease at the end of a scope
    scoped: bool,
}

impl<M: ResourceManager> Lease<M> {
    pub(super) fn new(id: ResourceId, resource: M::Resource, pool: Arc<ResourcePool<M>>) -> Self {
        Self {
            id,
            resource: Some(resource),
            pool,
            acquired_at: Instant::now(),
            scoped: false,
        }
    }

    /// Identifier of the leased resource
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Get a reference to the resource
    pub fn get(&self) -> &M::Resource {
        self.resource.as_ref().expect("lease resource missing")
    }

    /// Get a mutable reference to the resource
    pub fn get_mut(&mut self) -> &mut M::Resource {
        self.resource.as_mut().expect("lease resource missing")
    }

    /// The pool that issued this lease
    pub fn pool(&self) -> &Arc<ResourcePool<M>> {
        &self.pool
    }

    /// Get the time since this resource was acquired
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }

    /// Whether the pool still tracks this resource.
    ///
    /// False after `empty_pool` or `shutdown`; the resource will be closed
    /// rather than reused when the lease is returned.
    pub fn is_live(&self) -> bool {
        self.pool.is_leased(self.id)
    }

    /// Return the resource to the pool.
    ///
    /// Fails with [`UsageError::NotLive`] if the pool forgot the resource in
    /// the meantime; the resource has been closed in that case.
    pub fn close(mut self) -> Result<(), UsageError> {
        match self.resource.take() {
            Some(resource) => self.pool.return_resource(self.id, resource),
            None => Ok(()),
        }
    }

    /// Take the resource out of the pool for good.
    ///
    /// The pool stops tracking it and frees its slot; closing it becomes the
    /// caller's job.
    pub fn detach(mut self) -> M::Resource {
        let resource = self.resource.take().expect("lease resource missing");
        self.pool.detach(self.id);
        resource
    }

    pub(super) fn set_scoped(&mut self) {
        self.scoped = true;
    }
}

impl<M: ResourceManager> Deref for Lease<M> {
    type Target = M::Resource;

    fn deref(&self) -> &M::Resource {
        self.get()
    }
}

impl<M: ResourceManager> DerefMut for Lease<M> {
    fn deref_mut(&mut self) -> &mut M::Resource {
        self.get_mut()
    }
}

impl<M: ResourceManager> Drop for Lease<M> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            if !self.scoped {
                self.pool.note_orphan(self.id, self.held_for());
            }
            if let Err(err) = self.pool.return_resource(self.id, resource) {
                debug!("Dropped lease could not be returned: {}", err);
            }
        }
    }
}

impl<M> fmt::Debug for Lease<M>
where
    M: ResourceManager,
    M::Resource: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource {
            Some(resource) => write!(f, "Lease({}, {:?})", self.id, resource),
            None => write!(f, "Lease({}, returned)", self.id),
        }
    }
}
