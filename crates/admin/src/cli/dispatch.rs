use anyhow::{Context, Result, bail};

use crate::cli::actions::{Action, CreateSuperuserArgs};

pub const SUPERUSER_PASSWORD: &str = "WARDEN_SUPERUSER_PASSWORD";

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let Some((name, sub)) = matches.subcommand() else {
        bail!("a command is required");
    };
    // Global, so it is propagated into the subcommand's matches.
    let database_url = sub.get_one::<String>("database-url").cloned();

    match name {
        "sweep-tokens" => Ok(Action::SweepTokens { database_url }),
        "sync-permissions" => Ok(Action::SyncPermissions { database_url }),
        "create-superuser" => {
            let email = sub
                .get_one::<String>("email")
                .cloned()
                .context("missing required argument: --email")?;
            let username = sub
                .get_one::<String>("username")
                .cloned()
                .context("missing required argument: --username")?;
            let full_name = sub.get_one::<String>("full-name").cloned();
            let password = std::env::var(SUPERUSER_PASSWORD)
                .ok()
                .filter(|p| !p.is_empty())
                .with_context(|| format!("{SUPERUSER_PASSWORD} must be set"))?;

            Ok(Action::CreateSuperuser(CreateSuperuserArgs {
                database_url,
                email,
                username,
                full_name,
                password,
            }))
        }
        other => bail!("unknown command: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn test_sweep_tokens() {
        let matches = commands::new().get_matches_from(vec![
            "warden-admin",
            "sweep-tokens",
            "--database-url",
            "postgres://localhost/warden",
        ]);

        match handler(&matches).unwrap() {
            Action::SweepTokens { database_url } => {
                assert_eq!(database_url.as_deref(), Some("postgres://localhost/warden"));
            }
            other => panic!("unexpected action: {other:?}"),
        }
    }
}
