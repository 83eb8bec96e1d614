//! Infrastructure layer: configuration and storage adapters for the auth core.

pub mod config;
pub mod db;
pub mod directory;
pub mod refresh_store;


use std::sync::Arc;

use sqlx::PgPool;

use warden_auth::AuthBackends;

use crate::directory::{InMemoryDirectory, PostgresDirectory};
use crate::refresh_store::{InMemoryRefreshStore, PostgresRefreshStore};

/// In-memory backends plus handles to the concrete stores for seeding.
pub struct InMemoryBackends {
    pub backends: AuthBackends,
    pub refresh_store: Arc<InMemoryRefreshStore>,
    pub directory: Arc<InMemoryDirectory>,
}

pub fn in_memory_backends() -> InMemoryBackends {
    let refresh_store = Arc::new(InMemoryRefreshStore::new());
    let directory = Arc::new(InMemoryDirectory::new());
    InMemoryBackends {
        backends: AuthBackends {
            refresh_store: refresh_store.clone(),
            principals: directory.clone(),
            rbac: directory.clone(),
        },
        refresh_store,
        directory,
    }
}

pub fn postgres_backends(pool: PgPool) -> AuthBackends {
    let directory = Arc::new(PostgresDirectory::new(pool.clone()));
    AuthBackends {
        refresh_store: Arc::new(PostgresRefreshStore::new(pool)),
        principals: directory.clone(),
        rbac: directory,
    }
}
