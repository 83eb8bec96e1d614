use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use warden_auth::{AuthService, Registration, USER_PERMISSIONS};
use warden_core::SystemClock;
use warden_infra::config::Settings;
use warden_infra::{db, postgres_backends};

pub struct CreateSuperuserArgs {
    pub database_url: Option<String>,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub password: String,
}

impl std::fmt::Debug for CreateSuperuserArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateSuperuserArgs")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("full_name", &self.full_name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum Action {
    SweepTokens { database_url: Option<String> },
    SyncPermissions { database_url: Option<String> },
    CreateSuperuser(CreateSuperuserArgs),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if configuration, the database or the operation fails.
    pub async fn execute(self) -> Result<()> {
        match self {
            Action::SweepTokens { database_url } => {
                let service = connect(database_url).await?;
                let removed = service.sweep_expired().await?;
                println!("removed {removed} expired refresh token(s)");
            }
            Action::SyncPermissions { database_url } => {
                let service = connect(database_url).await?;
                let added = service.sync_permissions(USER_PERMISSIONS).await?;
                if added.is_empty() {
                    println!("permissions already in sync");
                }
                for name in added {
                    println!("added {name}");
                }
            }
            Action::CreateSuperuser(args) => {
                let service = connect(args.database_url).await?;
                let principal = service
                    .register(&Registration {
                        email: args.email,
                        username: args.username,
                        password: args.password,
                        full_name: args.full_name,
                        is_superuser: true,
                    })
                    .await?;
                info!(principal_id = %principal.id, "superuser created");
                println!("created superuser {} (id {})", principal.username, principal.id);
            }
        }
        Ok(())
    }
}

/// Build an `AuthService` over Postgres; `--database-url` wins over settings.
async fn connect(database_url: Option<String>) -> Result<AuthService> {
    let settings = Settings::from_env().context("failed to load configuration")?;
    let url = database_url
        .or(settings.database_url.clone())
        .context("DATABASE_URL is required")?;

    let pool = db::connect(&url)
        .await
        .context("failed to connect to the database")?;

    Ok(AuthService::new(
        &settings.auth,
        postgres_backends(pool),
        Arc::new(SystemClock),
    )?)
}
