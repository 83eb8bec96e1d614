use clap::{Arg, Command};

#[must_use]
pub fn new() -> Command {
    Command::new("warden-admin")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("database-url")
                .long("database-url")
                .help("Postgres connection string")
                .env("DATABASE_URL")
                .hide_env_values(true)
                .global(true),
        )
        .subcommand(
            Command::new("sweep-tokens")
                .about("Delete refresh tokens whose expiry has passed"),
        )
        .subcommand(
            Command::new("sync-permissions")
                .about("Insert built-in permission definitions missing from storage"),
        )
        .subcommand(
            Command::new("create-superuser")
                .about("Register a principal that bypasses role and permission checks")
                .long_about(
                    "Register a principal that bypasses role and permission checks. \
                     The password is read from WARDEN_SUPERUSER_PASSWORD.",
                )
                .arg(
                    Arg::new("email")
                        .long("email")
                        .help("Login email")
                        .required(true),
                )
                .arg(
                    Arg::new("username")
                        .long("username")
                        .help("Login username")
                        .required(true),
                )
                .arg(
                    Arg::new("full-name")
                        .long("full-name")
                        .help("Display name"),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let command = new();
        assert_eq!(command.get_name(), "warden-admin");
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_create_superuser_args() {
        let matches = new().get_matches_from(vec![
            "warden-admin",
            "create-superuser",
            "--email",
            "root@example.com",
            "--username",
            "root",
        ]);

        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "create-superuser");
        assert_eq!(
            sub.get_one::<String>("email").cloned(),
            Some("root@example.com".to_string())
        );
        assert_eq!(sub.get_one::<String>("full-name"), None);
    }

    #[test]
    fn test_create_superuser_requires_username() {
        let result = new().try_get_matches_from(vec![
            "warden-admin",
            "create-superuser",
            "--email",
            "root@example.com",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(new().try_get_matches_from(vec!["warden-admin"]).is_err());
    }
}
