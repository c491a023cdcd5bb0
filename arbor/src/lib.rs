//! # Arbor — Dependency Injection Container for Rust
//!
//! A constructor-based IoC container: register plain functions whose
//! parameters are their dependencies, build once to validate the graph and
//! eagerly wire every singleton, then resolve fully-constructed values by
//! type or by name.
//!
//! ## Quick start
//!
//! ```rust
//! use arbor::prelude::*;
//! use std::sync::Arc;
//!
//! struct Config { dsn: String }
//! struct Database { config: Arc<Config> }
//! struct UserService { db: Arc<Database> }
//!
//! fn new_config() -> Arc<Config> {
//!     Arc::new(Config { dsn: "postgres://localhost/app".into() })
//! }
//! fn new_database(config: Arc<Config>) -> Arc<Database> {
//!     Arc::new(Database { config })
//! }
//! fn new_user_service(db: Arc<Database>) -> Arc<UserService> {
//!     Arc::new(UserService { db })
//! }
//!
//! # fn main() -> Result<()> {
//! let container = Container::new();
//!
//! // Registration order does not matter; the graph is wired at build time.
//! container.register(new_user_service)?;
//! container.register(new_database)?;
//! container.register(new_config)?;
//!
//! container.build()?;
//!
//! let users: Arc<UserService> = container.resolve()?;
//! assert_eq!(users.db.config.dsn, "postgres://localhost/app");
//! # Ok(())
//! # }
//! ```
//!
//! ## Lifetimes
//!
//! Providers default to [`Lifetime::Singleton`]: one instance, constructed
//! during [`Container::build`], shared by every dependent. Register with
//! [`Options::transient`] for a fresh instance per resolution:
//!
//! ```rust
//! # use arbor::prelude::*;
//! # use std::sync::Arc;
//! # struct RequestId(u64);
//! # fn main() -> Result<()> {
//! let container = Container::new();
//! container.register_with(|| Arc::new(RequestId(7)), Options::transient())?;
//! container.build()?;
//!
//! let a: Arc<RequestId> = container.resolve()?;
//! let b: Arc<RequestId> = container.resolve()?;
//! assert!(!Arc::ptr_eq(&a, &b));
//! # Ok(())
//! # }
//! ```
//!
//! Register `Arc<T>` rather than bare `T` for anything non-trivial: resolved
//! values are returned by clone, and cloning an `Arc` shares the instance.
//!
//! ## Named providers
//!
//! Several constructors for the same output type can coexist under distinct
//! names. Named providers are validated at build time but constructed fresh
//! on every [`Container::resolve_named`] call; their dependencies still
//! follow normal lifetime rules.
//!
//! ```rust
//! # use arbor::prelude::*;
//! # use std::sync::Arc;
//! # struct Cache { capacity: usize }
//! # fn main() -> Result<()> {
//! let container = Container::new();
//! container.register_named("sessions", || Arc::new(Cache { capacity: 1024 }))?;
//! container.register_named("avatars", || Arc::new(Cache { capacity: 64 }))?;
//! container.build()?;
//!
//! let sessions: Arc<Cache> = container.resolve_named("sessions")?;
//! assert_eq!(sessions.capacity, 1024);
//! # Ok(())
//! # }
//! ```
//!
//! ## Graceful shutdown
//!
//! Implement [`Closeable`] for resources that hold connections or file
//! handles and register them with [`Options::closeable`]. On
//! [`Container::shutdown`] tracked singletons are closed in reverse
//! construction order, so dependents release before their dependencies. An
//! optional deadline bounds the teardown; close failures are aggregated
//! rather than aborting the sweep.
//!
//! ```rust
//! # use arbor::prelude::*;
//! # use arbor::BoxError;
//! # use std::sync::Arc;
//! # use std::time::{Duration, Instant};
//! struct Pool;
//!
//! impl Closeable for Pool {
//!     fn close(&self) -> std::result::Result<(), BoxError> {
//!         // drain connections...
//!         Ok(())
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let container = Container::new();
//! container.register_with(|| Arc::new(Pool), Options::new().closeable())?;
//! container.build()?;
//!
//! container.shutdown(Some(Instant::now() + Duration::from_secs(5)))?;
//! # Ok(())
//! # }
//! ```

pub use arbor_container::*;
