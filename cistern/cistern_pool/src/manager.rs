//! The seam between the pool and the resources it manages.
//!
//! The pool never looks inside a resource. Everything it needs to know is
//! expressed through [`ResourceManager`]: how to create one, how to check
//! that it is still usable, how to scrub state left behind by the previous
//! lease, and how to close it.

use std::fmt;

/// A trait for types that create and maintain pooled resources
///
/// Every hook is required. Skipping validation or normalization is a common
/// source of state leaking between leases, so an implementation has to state
/// explicitly that nothing needs doing.
pub trait ResourceManager: Send + Sync + 'static {
    /// The pooled resource
    type Resource: Send + 'static;

    /// Error produced when creating or closing a resource
    type Error: std::error::Error + Send + Sync + 'static;

    /// Create a new resource.
    ///
    /// Errors are handed to the `acquire` caller unchanged; the pool does not
    /// retry.
    fn create(&self) -> Result<Self::Resource, Self::Error>;

    /// Check that an idle resource is still usable before it is leased again.
    fn validate(&self, resource: &mut Self::Resource) -> bool;

    /// Reset any state a previous lease may have left on the resource.
    fn normalize(&self, resource: &mut Self::Resource);

    /// Close a resource the pool no longer wants.
    ///
    /// Errors are logged and otherwise ignored by the pool.
    fn close(&self, resource: Self::Resource) -> Result<(), Self::Error>;
}

type CreateFn<R, E> = Box<dyn Fn() -> Result<R, E> + Send + Sync>;
type ValidateFn<R> = Box<dyn Fn(&mut R) -> bool + Send + Sync>;
type NormalizeFn<R> = Box<dyn Fn(&mut R) + Send + Sync>;
type CloseFn<R, E> = Box<dyn Fn(R) -> Result<(), E> + Send + Sync>;

/// A [`ResourceManager`] assembled from closures.
///
/// The closures capture whatever connection parameters the factory needs.
pub struct FnManager<R, E> {
    create: CreateFn<R, E>,
    validate: ValidateFn<R>,
    normalize: NormalizeFn<R>,
    close: CloseFn<R, E>,
}

impl<R, E> FnManager<R, E>
where
    R: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    /// Build a manager from a factory, a liveness check and a reset hook.
    ///
    /// Resources are closed by dropping them unless [`FnManager::with_close`]
    /// installs something else.
    pub fn new<C, V, N>(create: C, validate: V, normalize: N) -> Self
    where
        C: Fn() -> Result<R, E> + Send + Sync + 'static,
        V: Fn(&mut R) -> bool + Send + Sync + 'static,
        N: Fn(&mut R) + Send + Sync + 'static,
    {
        Self {
            create: Box::new(create),
            validate: Box::new(validate),
            normalize: Box::new(normalize),
            close: Box::new(|resource: R| -> Result<(), E> {
                drop(resource);
                Ok(())
            }),
        }
    }

    /// Replace the close hook.
    pub fn with_close<F>(mut self, close: F) -> Self
    where
        F: Fn(R) -> Result<(), E> + Send + Sync + 'static,
    {
        self.close = Box::new(close);
        self
    }
}

impl<R, E> ResourceManager for FnManager<R, E>
where
    R: Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    type Resource = R;
    type Error = E;

    fn create(&self) -> Result<R, E> {
        (self.create)()
    }

    fn validate(&self, resource: &mut R) -> bool {
        (self.validate)(resource)
    }

    fn normalize(&self, resource: &mut R) {
        (self.normalize)(resource)
    }

    fn close(&self, resource: R) -> Result<(), E> {
        (self.close)(resource)
    }
}

impl<R, E> fmt::Debug for FnManager<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnManager").finish_non_exhaustive()
    }
}
