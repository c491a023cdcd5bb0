//! A small layered application wired through the container: config from the
//! environment, a shared logger, a closeable database handle, and a service
//! layer on top.
//!
//! Run with:
//! ```sh
//! RUST_LOG=debug DATABASE_DSN=postgres://localhost/users cargo run --example userapp
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use arbor::prelude::*;
use arbor::BoxError;

struct Config {
    dsn: String,
    app_name: String,
}

fn new_config() -> Arc<Config> {
    Arc::new(Config {
        dsn: std::env::var("DATABASE_DSN")
            .unwrap_or_else(|_| "postgres://localhost/users".into()),
        app_name: std::env::var("APP_NAME").unwrap_or_else(|_| "userapp".into()),
    })
}

struct Database {
    dsn: String,
}

fn new_database(config: Arc<Config>) -> Result<Arc<Database>> {
    tracing::info!(dsn = %config.dsn, "connecting to database");
    Ok(Arc::new(Database { dsn: config.dsn.clone() }))
}

impl Closeable for Database {
    fn close(&self) -> std::result::Result<(), BoxError> {
        tracing::info!(dsn = %self.dsn, "closing database connection");
        Ok(())
    }
}

struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    fn find(&self, id: u64) -> String {
        format!("user#{id}@{}", self.db.dsn)
    }
}

fn new_user_repository(db: Arc<Database>) -> Arc<UserRepository> {
    Arc::new(UserRepository { db })
}

struct UserService {
    repo: Arc<UserRepository>,
    config: Arc<Config>,
}

impl UserService {
    fn greet(&self, id: u64) -> String {
        format!("[{}] hello, {}", self.config.app_name, self.repo.find(id))
    }
}

fn new_user_service(repo: Arc<UserRepository>, config: Arc<Config>) -> Arc<UserService> {
    Arc::new(UserService { repo, config })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let container = Container::new();
    container.register(new_config)?;
    container.register_with(new_database, Options::new().closeable())?;
    container.register(new_user_repository)?;
    container.register(new_user_service)?;

    container.build()?;

    let users: Arc<UserService> = container.resolve()?;
    println!("{}", users.greet(42));

    container.shutdown(Some(Instant::now() + Duration::from_secs(5)))?;
    Ok(())
}
