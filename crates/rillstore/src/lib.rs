//! Persistence layer for the rill workflow engine
//!
//! Two implementations of the repository contracts: a PostgreSQL store
//! backed by sqlx for the server, and an in-memory store for the CLI
//! and tests. Both stamp terminal timestamps the same way, so engine
//! behavior is identical against either.

pub mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
