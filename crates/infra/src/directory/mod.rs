//! Principal and RBAC directory adapters.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryDirectory;
pub use postgres::PostgresDirectory;
