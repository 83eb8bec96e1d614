//! Refresh credential trust store adapters.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryRefreshStore;
pub use postgres::PostgresRefreshStore;
