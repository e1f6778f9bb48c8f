//! Command line arguments.

use clap::{Parser, Subcommand};

/// Look up, list, update and delete users through a SCIM 2.0 endpoint.
#[derive(Debug, Parser)]
#[command(name = "scim")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Base URL of the instance.
    #[arg(long, env = "SCIM_BASE_URL")]
    pub url: String,

    /// SCIM bearer token.
    #[arg(long, env = "SCIM_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Outbound HTTPS proxy.
    #[arg(long, env = "SCIM_PROXY")]
    pub proxy: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, env = "SCIM_TIMEOUT_SECS")]
    pub timeout: Option<u64>,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print one user as JSON.
    Get {
        /// Account ID.
        account_id: String,
    },

    /// Print every user as a JSON array.
    List,

    /// Change a user's active flag or role.
    Update {
        /// Account ID.
        account_id: String,

        /// Activate or deactivate the account.
        #[arg(long)]
        active: Option<bool>,

        /// New role: Registered, Moderator or Admin.
        #[arg(long)]
        role: Option<String>,
    },

    /// Delete a user, demoting moderators and admins first.
    Delete {
        /// Account ID.
        account_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    const BASE: [&str; 5] = [
        "scim",
        "--url",
        "https://acme.stackenterprise.co",
        "--token",
        "abc",
    ];

    fn parse(extra: &[&str]) -> Cli {
        Cli::try_parse_from(BASE.iter().chain(extra.iter()).copied()).unwrap()
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_update() {
        let cli = parse(&["update", "8", "--active", "false", "--role", "Registered"]);
        match cli.command {
            Command::Update {
                account_id,
                active,
                role,
            } => {
                assert_eq!(account_id, "8");
                assert_eq!(active, Some(false));
                assert_eq!(role.as_deref(), Some("Registered"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_global_options() {
        let cli = parse(&["--proxy", "http://proxy:3128", "--timeout", "10", "-v", "list"]);
        assert_eq!(cli.proxy.as_deref(), Some("http://proxy:3128"));
        assert_eq!(cli.timeout, Some(10));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::List));
    }

    #[test]
    fn rejects_non_boolean_active() {
        let result = Cli::try_parse_from(
            BASE.iter()
                .chain(["update", "8", "--active", "maybe"].iter())
                .copied(),
        );
        assert!(result.is_err());
    }
}
