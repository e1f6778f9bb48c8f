//! # scim
//!
//! Operator command line for SCIM 2.0 user directories.

#![forbid(unsafe_code)]

mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};
use scim_core::ScimConfig;
use scim_users::DirectoryClient;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_client(cli: &Cli) -> anyhow::Result<DirectoryClient> {
    let mut config =
        ScimConfig::new(cli.url.as_str(), cli.token.as_str()).context("invalid SCIM settings")?;
    if let Some(proxy) = &cli.proxy {
        config = config.with_proxy(proxy.as_str());
    }
    if let Some(seconds) = cli.timeout {
        config = config.with_timeout(seconds);
    }

    DirectoryClient::from_config(config).context("failed to create SCIM client")
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let client = build_client(&cli)?;

    match cli.command {
        Command::Get { account_id } => match client.get_user(&account_id).await {
            Some(user) => {
                println!("{}", serde_json::to_string_pretty(&user)?);
                Ok(ExitCode::SUCCESS)
            }
            None => Ok(ExitCode::FAILURE),
        },
        Command::List => {
            let users = client.get_all_users().await;
            println!("{}", serde_json::to_string_pretty(&users)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Update {
            account_id,
            active,
            role,
        } => {
            client
                .update_user(&account_id, active, role.as_deref())
                .await;
            Ok(ExitCode::SUCCESS)
        }
        Command::Delete { account_id } => {
            client.delete_user(&account_id).await;
            Ok(ExitCode::SUCCESS)
        }
    }
}
