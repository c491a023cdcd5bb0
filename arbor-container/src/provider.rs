//! Provider records and registration options.
//!
//! A [`ProviderRecord`] is the unit of registration: a type-erased
//! constructor, its declared inputs, its output key, a lifetime, an optional
//! name, and an optional closer hook. Records are cheaply clonable (the
//! factory sits behind an `Arc`) and immutable once the container seals.

use std::any::Any;
use std::sync::Arc;

use crate::construct::{Construct, Resolver};
use crate::error::{ArborError, BoxError, Result, TypeMismatchError};
use crate::key::TypeKey;
use crate::lifetime::Lifetime;

/// A resource that requires explicit closing.
///
/// Singletons registered with [`Options::closeable`] are tracked during
/// build and closed by [`Container::shutdown`](crate::container::Container::shutdown)
/// in reverse construction order.
pub trait Closeable: Send + Sync {
    /// Releases the resource. Called at most once per tracked singleton.
    fn close(&self) -> std::result::Result<(), BoxError>;
}

impl<T: Closeable + ?Sized> Closeable for Arc<T> {
    fn close(&self) -> std::result::Result<(), BoxError> {
        (**self).close()
    }
}

fn closer_of<T: Closeable + Clone + 'static>(value: &T) -> Box<dyn Closeable> {
    Box::new(value.clone())
}

/// Per-registration options: lifetime and close tracking.
///
/// `T` is the constructor's output type; it is inferred from the
/// registration call.
///
/// ```rust,ignore
/// container.register_with(NewAuditLog, Options::transient())?;
/// container.register_with(NewDatabase, Options::new().closeable())?;
/// ```
pub struct Options<T> {
    pub(crate) lifetime: Lifetime,
    pub(crate) closer: Option<fn(&T) -> Box<dyn Closeable>>,
}

impl<T> Default for Options<T> {
    fn default() -> Self {
        Self {
            lifetime: Lifetime::Singleton,
            closer: None,
        }
    }
}

impl<T> Options<T> {
    /// Options with the default [`Lifetime::Singleton`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the provider lifetime.
    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Shorthand for `Options::new().lifetime(Lifetime::Transient)`.
    pub fn transient() -> Self {
        Self::new().lifetime(Lifetime::Transient)
    }
}

impl<T: Closeable + Clone + Send + Sync + 'static> Options<T> {
    /// Tracks the constructed singleton for graceful shutdown.
    ///
    /// The hook clones the constructed value, so for `Arc<T>` registrations
    /// the tracked closer shares the underlying resource with the cached
    /// instance. Only singletons instantiated during build are tracked;
    /// transient and named providers are never closed by the container.
    pub fn closeable(mut self) -> Self {
        self.closer = Some(closer_of::<T>);
        self
    }
}

/// Erased constructor: resolves inputs through a [`Resolver`] and returns
/// the boxed output.
///
/// `Arc` rather than `Box` because records are shared between the registry
/// and the build pass, and the container is `Send + Sync`.
pub(crate) type ErasedCtor =
    Arc<dyn Fn(&dyn Resolver) -> Result<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// Erased cache-entry builder: consumes a freshly constructed boxed value
/// and produces the singleton cache entry plus the optional closer.
type CacheFn = Arc<
    dyn Fn(Box<dyn Any + Send + Sync>) -> Result<(SingletonEntry, Option<Box<dyn Closeable>>)>
        + Send
        + Sync,
>;

/// One cached singleton instance. `instance` clones the held value into a
/// fresh box on every call.
pub(crate) struct SingletonEntry {
    pub instance: Arc<dyn Fn() -> Box<dyn Any + Send + Sync> + Send + Sync>,
}

/// The unit of registration.
#[derive(Clone)]
pub(crate) struct ProviderRecord {
    pub key: TypeKey,
    pub name: Option<String>,
    pub lifetime: Lifetime,
    pub dependencies: Vec<TypeKey>,
    pub construct: ErasedCtor,
    pub cache: CacheFn,
}

impl std::fmt::Debug for ProviderRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRecord")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("lifetime", &self.lifetime)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

impl ProviderRecord {
    /// Erases a typed constructor into a record.
    pub(crate) fn new<C, M>(ctor: C, name: Option<String>, options: Options<C::Output>) -> Self
    where
        C: Construct<M>,
    {
        let key = TypeKey::of::<C::Output>();
        let dependencies = ctor.dependencies();

        let construct: ErasedCtor = Arc::new(move |resolver: &dyn Resolver| {
            match ctor.construct(resolver) {
                Ok(value) => Ok(Box::new(value) as Box<dyn Any + Send + Sync>),
                // A failure bubbling up from a dependency gets this record's
                // key prepended, forming the outermost-to-root breadcrumb.
                // A direct failure already carries this key.
                Err(ArborError::ConstructorFailed { key: inner, source }) if inner != key => {
                    Err(ArborError::ConstructorFailed {
                        key,
                        source: Box::new(ArborError::ConstructorFailed { key: inner, source }),
                    })
                }
                Err(err) => Err(err),
            }
        });

        let closer_hook = options.closer;
        let cache: CacheFn = Arc::new(move |boxed: Box<dyn Any + Send + Sync>| {
            let value = boxed.downcast::<C::Output>().map_err(|_| {
                ArborError::TypeMismatch(TypeMismatchError {
                    name: None,
                    expected: key,
                    actual: None,
                })
            })?;
            let value = *value;
            let closer = closer_hook.map(|hook| hook(&value));
            let entry = SingletonEntry {
                instance: Arc::new(move || Box::new(value.clone()) as Box<dyn Any + Send + Sync>),
            };
            Ok((entry, closer))
        });

        Self {
            key,
            name,
            lifetime: options.lifetime,
            dependencies,
            construct,
            cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Conn;

    impl Closeable for Conn {
        fn close(&self) -> std::result::Result<(), BoxError> {
            Ok(())
        }
    }

    fn new_conn() -> Conn {
        Conn
    }

    #[test]
    fn record_captures_output_key_and_lifetime() {
        let record = ProviderRecord::new(new_conn, None, Options::transient());
        assert_eq!(record.key, TypeKey::of::<Conn>());
        assert_eq!(record.lifetime, Lifetime::Transient);
        assert!(record.dependencies.is_empty());
    }

    #[test]
    fn cache_entry_clones_instance_and_extracts_closer() {
        let record = ProviderRecord::new(new_conn, None, Options::new().closeable());

        let (entry, closer) = (record.cache)(Box::new(Conn)).unwrap();
        assert!(closer.is_some());

        let a = (entry.instance)();
        assert!(a.downcast::<Conn>().is_ok());
    }

    #[test]
    fn no_closer_without_opt_in() {
        let record = ProviderRecord::new(new_conn, None, Options::new());
        let (_, closer) = (record.cache)(Box::new(Conn)).unwrap();
        assert!(closer.is_none());
    }

    #[test]
    fn arc_closeable_blanket() {
        let conn = Arc::new(Conn);
        assert!(conn.close().is_ok());
    }
}
