//! The constructor contract.
//!
//! A constructor is any function or closure of the shape
//! `Fn(D1, .., Dn) -> T` or `Fn(D1, .., Dn) -> Result<T, E>`, up to eight
//! parameters. Its parameter types are its declared dependencies; the
//! container resolves them by type and invokes the function. [`Construct`]
//! erases that shape into something the registry can store.
//!
//! Every dependency and output type must be `Clone + Send + Sync + 'static`:
//! singleton instances are served by cloning the cached value, so services
//! are registered as `Arc<T>` for cheap sharing.

use std::any::Any;
use std::marker::PhantomData;

use crate::error::{ArborError, Result, TypeMismatchError};
use crate::key::TypeKey;

/// Type-erased source of constructor inputs.
///
/// Implemented by the container's resolution context; constructors receive
/// it to pull their declared dependencies.
pub trait Resolver {
    /// Resolves the value for `key`, boxed and type-erased.
    fn resolve_key(&self, key: TypeKey) -> Result<Box<dyn Any + Send + Sync>>;
}

/// Resolves a typed dependency from an erased [`Resolver`].
pub(crate) fn resolve_dep<T: Send + Sync + 'static>(resolver: &dyn Resolver) -> Result<T> {
    let key = TypeKey::of::<T>();
    let boxed = resolver.resolve_key(key)?;
    boxed.downcast::<T>().map(|b| *b).map_err(|_| {
        ArborError::TypeMismatch(TypeMismatchError {
            name: None,
            expected: key,
            actual: None,
        })
    })
}

/// Marker for constructors returning `T` directly.
pub struct ByValue<A>(PhantomData<A>);

/// Marker for constructors returning `Result<T, E>`.
pub struct ByResult<A>(PhantomData<A>);

/// A registrable constructor.
///
/// `M` is an inference marker distinguishing the plain and fallible return
/// shapes; callers never name it. Implemented for functions and closures of
/// arity 0..=8 — see the module docs.
pub trait Construct<M>: Send + Sync + 'static {
    /// The type this constructor produces.
    type Output: Clone + Send + Sync + 'static;

    /// The declared input types, in parameter order.
    fn dependencies(&self) -> Vec<TypeKey>;

    /// Resolves all declared inputs from `resolver` and invokes the
    /// constructor. A user error is wrapped as
    /// [`ArborError::ConstructorFailed`] under this constructor's output key.
    fn construct(&self, resolver: &dyn Resolver) -> Result<Self::Output>;
}

macro_rules! impl_construct {
    ($($dep:ident),*) => {
        impl<F, T, $($dep,)*> Construct<ByValue<($($dep,)*)>> for F
        where
            F: Fn($($dep),*) -> T + Send + Sync + 'static,
            T: Clone + Send + Sync + 'static,
            $($dep: Clone + Send + Sync + 'static,)*
        {
            type Output = T;

            fn dependencies(&self) -> Vec<TypeKey> {
                vec![$(TypeKey::of::<$dep>()),*]
            }

            #[allow(non_snake_case, unused_variables)]
            fn construct(&self, resolver: &dyn Resolver) -> Result<T> {
                $(let $dep: $dep = resolve_dep::<$dep>(resolver)?;)*
                Ok((self)($($dep),*))
            }
        }

        impl<F, T, E, $($dep,)*> Construct<ByResult<($($dep,)*)>> for F
        where
            F: Fn($($dep),*) -> std::result::Result<T, E> + Send + Sync + 'static,
            T: Clone + Send + Sync + 'static,
            E: std::error::Error + Send + Sync + 'static,
            $($dep: Clone + Send + Sync + 'static,)*
        {
            type Output = T;

            fn dependencies(&self) -> Vec<TypeKey> {
                vec![$(TypeKey::of::<$dep>()),*]
            }

            #[allow(non_snake_case, unused_variables)]
            fn construct(&self, resolver: &dyn Resolver) -> Result<T> {
                $(let $dep: $dep = resolve_dep::<$dep>(resolver)?;)*
                match (self)($($dep),*) {
                    Ok(value) => Ok(value),
                    Err(err) => Err(ArborError::ConstructorFailed {
                        key: TypeKey::of::<T>(),
                        source: Box::new(err),
                    }),
                }
            }
        }
    };
}

impl_construct!();
impl_construct!(D1);
impl_construct!(D1, D2);
impl_construct!(D1, D2, D3);
impl_construct!(D1, D2, D3, D4);
impl_construct!(D1, D2, D3, D4, D5);
impl_construct!(D1, D2, D3, D4, D5, D6);
impl_construct!(D1, D2, D3, D4, D5, D6, D7);
impl_construct!(D1, D2, D3, D4, D5, D6, D7, D8);
