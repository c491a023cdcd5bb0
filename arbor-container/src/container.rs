//! The container — registration, sealing, resolution, shutdown.
//!
//! # Lifecycle
//! ```text
//! Container::new()  ──register*──>  registering
//!                                       │
//!                                    build()          (seals, eager singletons)
//!                                       │
//!                                       ▼
//!                                    sealed  ──resolve*──>  sealed
//!                                       │
//!                                   shutdown()
//!                                       │
//!                                       ▼
//!                                   shut down          (terminal)
//! ```
//!
//! # Examples
//! ```rust
//! use arbor_container::prelude::*;
//! use std::sync::Arc;
//!
//! struct Config { url: String }
//! struct Database { config: Arc<Config> }
//!
//! fn new_config() -> Arc<Config> {
//!     Arc::new(Config { url: "postgres://localhost".into() })
//! }
//! fn new_database(config: Arc<Config>) -> Arc<Database> {
//!     Arc::new(Database { config })
//! }
//!
//! # fn main() -> Result<()> {
//! let container = Container::new();
//! container.register(new_config)?;
//! container.register(new_database)?;
//! container.build()?;
//!
//! let db: Arc<Database> = container.resolve()?;
//! assert_eq!(db.config.url, "postgres://localhost");
//! # Ok(())
//! # }
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, info, instrument, trace, warn};

use crate::construct::{Construct, Resolver};
use crate::error::{
    ArborError, ProviderNotFoundError, ProviderSlot, Result, ShutdownFailedError,
    TypeMismatchError,
};
use crate::graph::BuildPass;
use crate::key::TypeKey;
use crate::provider::{Closeable, Options, ProviderRecord, SingletonEntry};
use crate::registry::Registry;

/// A dependency injection container.
///
/// Register constructors, call [`build`](Container::build) once to validate
/// the dependency graph and eagerly instantiate all singletons, then resolve
/// fully-wired values by type or by name. After a successful build the
/// container is sealed and safe for unbounded concurrent resolution.
pub struct Container {
    inner: RwLock<Inner>,
}

struct Inner {
    registry: Registry,
    singletons: HashMap<TypeKey, SingletonEntry>,
    /// Closers in construction order; drained in reverse on shutdown.
    closers: Vec<Box<dyn Closeable>>,
    built: bool,
    shut_down: bool,
}

impl Container {
    /// Creates an empty container ready for registration.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                registry: Registry::new(),
                singletons: HashMap::new(),
                closers: Vec::new(),
                built: false,
                shut_down: false,
            }),
        }
    }

    // ── Registration ──

    /// Registers a constructor with the default [`Lifetime::Singleton`](crate::lifetime::Lifetime::Singleton).
    ///
    /// The constructor's parameter types are its dependencies, resolved by
    /// type when it runs. Registration order does not matter.
    pub fn register<C, M>(&self, ctor: C) -> Result<()>
    where
        C: Construct<M>,
    {
        self.register_with(ctor, Options::default())
    }

    /// Registers a constructor with explicit [`Options`].
    pub fn register_with<C, M>(&self, ctor: C, options: Options<C::Output>) -> Result<()>
    where
        C: Construct<M>,
    {
        self.insert_record(None, ctor, options)
    }

    /// Registers a named constructor.
    ///
    /// Named providers live in a separate namespace and are resolved via
    /// [`resolve_named`](Container::resolve_named). They are validated at
    /// build time but always constructed fresh on every resolution;
    /// singleton semantics apply only to their dependencies.
    pub fn register_named<C, M>(&self, name: &str, ctor: C) -> Result<()>
    where
        C: Construct<M>,
    {
        self.register_named_with(name, ctor, Options::default())
    }

    /// Registers a named constructor with explicit [`Options`].
    pub fn register_named_with<C, M>(
        &self,
        name: &str,
        ctor: C,
        options: Options<C::Output>,
    ) -> Result<()>
    where
        C: Construct<M>,
    {
        if name.is_empty() {
            return Err(ArborError::InvalidConstructorShape {
                reason: "name cannot be empty",
            });
        }
        self.insert_record(Some(name.to_owned()), ctor, options)
    }

    fn insert_record<C, M>(
        &self,
        name: Option<String>,
        ctor: C,
        options: Options<C::Output>,
    ) -> Result<()>
    where
        C: Construct<M>,
    {
        let mut inner = self.inner.write();
        if inner.built {
            return Err(ArborError::AlreadyBuilt);
        }
        inner.registry.register(ProviderRecord::new(ctor, name, options))
    }

    // ── Build ──

    /// Validates the full dependency graph — detecting missing providers and
    /// circular dependencies — and eagerly instantiates all singleton
    /// providers in dependency order. On success the container is sealed;
    /// no further registrations are accepted.
    ///
    /// The pass is transactional: on failure nothing is cached, the
    /// registrations stay intact, and `build` may be retried once the
    /// registrations are fixed.
    #[instrument(skip(self), name = "container_build")]
    pub fn build(&self) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.built {
            return Err(ArborError::AlreadyBuilt);
        }

        info!(registered = inner.registry.len(), "building container");
        let output = BuildPass::new(&inner.registry).run()?;

        inner.singletons = output.singletons;
        inner.closers = output.closers;
        inner.built = true;

        info!(
            singletons = inner.singletons.len(),
            closers = inner.closers.len(),
            "container built"
        );
        Ok(())
    }

    // ── Resolution ──

    /// Resolves a value by type.
    ///
    /// For singleton providers the instance cached at build time is
    /// returned (cloned — register `Arc<T>` for cheap sharing); for
    /// transient providers a new instance is constructed on each call.
    ///
    /// ```rust,ignore
    /// let db: Arc<Database> = container.resolve()?;
    /// ```
    pub fn resolve<T: Clone + Send + Sync + 'static>(&self) -> Result<T> {
        let key = TypeKey::of::<T>();
        downcast::<T>(self.resolve_key(key)?, key, None)
    }

    /// Resolves a named provider.
    ///
    /// The named provider's output type must be exactly `T`; otherwise the
    /// call fails with [`ArborError::TypeMismatch`]. A fresh instance is
    /// constructed on every call regardless of the declared lifetime.
    pub fn resolve_named<T: Clone + Send + Sync + 'static>(&self, name: &str) -> Result<T> {
        let key = TypeKey::of::<T>();
        downcast::<T>(self.resolve_key_named(name, key)?, key, Some(name))
    }

    /// Untyped resolution path: resolves the value for a [`TypeKey`].
    pub fn resolve_key(&self, key: TypeKey) -> Result<Box<dyn Any + Send + Sync>> {
        let inner = self.inner.read();
        if !inner.built {
            return Err(ArborError::NotBuilt);
        }

        trace!(key = %key, "resolving");
        if let Some(entry) = inner.singletons.get(&key) {
            return Ok((entry.instance)());
        }

        let record = inner.registry.get(&key).ok_or_else(|| {
            ArborError::ProviderNotFound(ProviderNotFoundError {
                slot: ProviderSlot::Type(key),
                required_by: None,
                owner: None,
            })
        })?;

        let ctx = ResolveCtx::new(&inner.singletons, &inner.registry);
        (record.construct)(&ctx)
    }

    /// Untyped named resolution path.
    pub fn resolve_key_named(&self, name: &str, key: TypeKey) -> Result<Box<dyn Any + Send + Sync>> {
        let inner = self.inner.read();
        if !inner.built {
            return Err(ArborError::NotBuilt);
        }

        trace!(name = %name, key = %key, "resolving named");
        let record = inner.registry.get_named(name).ok_or_else(|| {
            ArborError::ProviderNotFound(ProviderNotFoundError {
                slot: ProviderSlot::Name(name.to_owned()),
                required_by: None,
                owner: None,
            })
        })?;

        if record.key != key {
            return Err(ArborError::TypeMismatch(TypeMismatchError {
                name: Some(name.to_owned()),
                expected: key,
                actual: Some(record.key),
            }));
        }

        let ctx = ResolveCtx::new(&inner.singletons, &inner.registry);
        (record.construct)(&ctx)
    }

    // ── Shutdown ──

    /// Gracefully closes every tracked singleton, in the reverse of the
    /// order they were constructed (dependents before their dependencies).
    ///
    /// The deadline is advisory and checked only between closer invocations;
    /// once it expires, remaining closers are skipped and
    /// [`ArborError::DeadlineExceeded`] joins the result. Individual close
    /// failures are collected rather than short-circuiting. The container is
    /// marked shut down regardless of outcome; a second call returns
    /// [`ArborError::AlreadyShutdown`].
    pub fn shutdown(&self, deadline: Option<Instant>) -> Result<()> {
        let mut inner = self.inner.write();
        if !inner.built {
            return Err(ArborError::NotBuilt);
        }
        if inner.shut_down {
            return Err(ArborError::AlreadyShutdown);
        }
        inner.shut_down = true;

        let closers = std::mem::take(&mut inner.closers);
        debug!(closers = closers.len(), "shutting down");

        let mut failures = Vec::new();
        for closer in closers.iter().rev() {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    warn!("shutdown deadline exceeded, skipping remaining closers");
                    failures.push(ArborError::DeadlineExceeded);
                    break;
                }
            }
            if let Err(source) = closer.close() {
                failures.push(ArborError::CloseFailed { source });
            }
        }

        if failures.is_empty() {
            info!("shutdown complete");
            Ok(())
        } else {
            Err(ArborError::ShutdownFailed(ShutdownFailedError { failures }))
        }
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Container")
            .field("registered", &inner.registry.len())
            .field("built", &inner.built)
            .field("shut_down", &inner.shut_down)
            .finish()
    }
}

fn downcast<T: Send + Sync + 'static>(
    boxed: Box<dyn Any + Send + Sync>,
    key: TypeKey,
    name: Option<&str>,
) -> Result<T> {
    boxed.downcast::<T>().map(|b| *b).map_err(|_| {
        ArborError::TypeMismatch(TypeMismatchError {
            name: name.map(str::to_owned),
            expected: key,
            actual: None,
        })
    })
}

// ═══════════════════════════════════════════
// ResolveCtx
// ═══════════════════════════════════════════

/// Resolution context over sealed (or sealing) state.
///
/// Serves singleton inputs from the cache and recursively constructs
/// transient inputs. Only reads the cache and registry, so it is safe both
/// under the build pass and under a post-seal read lock.
pub(crate) struct ResolveCtx<'a> {
    singletons: &'a HashMap<TypeKey, SingletonEntry>,
    registry: &'a Registry,
}

impl<'a> ResolveCtx<'a> {
    pub(crate) fn new(
        singletons: &'a HashMap<TypeKey, SingletonEntry>,
        registry: &'a Registry,
    ) -> Self {
        Self { singletons, registry }
    }
}

impl Resolver for ResolveCtx<'_> {
    fn resolve_key(&self, key: TypeKey) -> Result<Box<dyn Any + Send + Sync>> {
        if let Some(entry) = self.singletons.get(&key) {
            return Ok((entry.instance)());
        }

        let record = self.registry.get(&key).ok_or_else(|| {
            ArborError::ProviderNotFound(ProviderNotFoundError {
                slot: ProviderSlot::Type(key),
                required_by: None,
                owner: None,
            })
        })?;

        (record.construct)(self)
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::Container;
    pub use crate::construct::{Construct, Resolver};
    pub use crate::error::{ArborError, Result};
    pub use crate::key::TypeKey;
    pub use crate::lifetime::Lifetime;
    pub use crate::provider::{Closeable, Options};
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
