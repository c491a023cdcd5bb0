//! Provider lifetimes.
//!
//! A [`Lifetime`] controls how many instances of a provider the container
//! creates:
//! - [`Lifetime::Singleton`] — one instance, built eagerly during
//!   [`Container::build`](crate::container::Container::build) and shared by
//!   every resolution.
//! - [`Lifetime::Transient`] — a fresh instance on every resolution.

use std::fmt;

/// Defines the lifetime of a provider within the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// One instance shared across the entire application.
    ///
    /// The constructor runs exactly once, during build, and the result is
    /// cached for every subsequent resolve.
    ///
    /// # When to use
    /// - Database connection pools
    /// - Configuration objects
    /// - Shared caches
    #[default]
    Singleton,

    /// A new instance is constructed on every resolve call.
    ///
    /// Never cached and never tracked for shutdown.
    ///
    /// # When to use
    /// - Lightweight stateless services
    /// - Objects with mutable state that shouldn't be shared
    Transient,
}

impl Lifetime {
    /// Returns `true` for [`Lifetime::Singleton`].
    #[inline]
    pub fn is_singleton(&self) -> bool {
        matches!(self, Lifetime::Singleton)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Singleton => write!(f, "singleton"),
            Lifetime::Transient => write!(f, "transient"),
        }
    }
}
