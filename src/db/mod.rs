//! Persistence: connection pool, schema migrations and the store port

mod pool;
pub mod postgres;
pub mod store;

pub use pool::{create_pool, run_migrations};
pub use postgres::PgStore;
pub use store::{Store, StoreError};
