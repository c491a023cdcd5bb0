//! Core engine of the `arbor` dependency injection container.
//!
//! Most users should depend on the `arbor` facade crate instead; this crate
//! holds the engine: the provider registry, the build pass that validates
//! the dependency graph and eagerly instantiates singletons, and the sealed
//! resolution paths.
//!
//! The entry point is [`Container`]:
//!
//! ```rust
//! use arbor_container::prelude::*;
//! use std::sync::Arc;
//!
//! struct Greeter { greeting: &'static str }
//!
//! # fn main() -> Result<()> {
//! let container = Container::new();
//! container.register(|| Arc::new(Greeter { greeting: "hello" }))?;
//! container.build()?;
//!
//! let greeter: Arc<Greeter> = container.resolve()?;
//! assert_eq!(greeter.greeting, "hello");
//! # Ok(())
//! # }
//! ```

mod construct;
mod container;
mod error;
mod graph;
mod key;
mod lifetime;
mod provider;
mod registry;

pub use construct::{ByResult, ByValue, Construct, Resolver};
pub use container::{Container, prelude};
pub use error::{
    ArborError, BoxError, CircularDependencyError, ProviderNotFoundError, ProviderSlot, Result,
    ShutdownFailedError, TypeMismatchError,
};
pub use key::TypeKey;
pub use lifetime::Lifetime;
pub use provider::{Closeable, Options};
