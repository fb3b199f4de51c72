//! dailytracker CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use dailytracker_client::cli::{AuthAction, Cli, Command, ConfigAction};
use dailytracker_client::commands;
use dailytracker_client::config::ClientConfig;
use dailytracker_client::error::{ClientError, ClientResult};
use dailytracker_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::cli()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let config_path = cli.config_path();
    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path).map_err(ClientError::Config)?,
        None => ClientConfig::load().map_err(ClientError::Config)?,
    };

    match cli.command {
        Some(Command::Auth { action }) => match action {
            AuthAction::Login {
                client_id,
                client_secret,
                credentials_file,
                force,
            } => {
                commands::auth::login(
                    client_id,
                    client_secret,
                    credentials_file,
                    force,
                    &config,
                    &config_path,
                )
                .await
            }
            AuthAction::Logout => commands::auth::logout(&config).await,
            AuthAction::Status => commands::auth::status(&config),
        },
        Some(Command::Submit {
            date,
            counts,
            overwhelm,
            meltdown,
        }) => commands::submit::run(date, counts, overwhelm, meltdown, &config).await,
        Some(Command::Form) => commands::form::run(&config).await,
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
        None => {
            println!("dailytracker - log daily symptom counts to a Google Sheet");
            println!();
            println!("Run 'dailytracker --help' for usage information.");
            println!();
            println!("Quick start:");
            println!(
                "  1. Sign in: dailytracker auth login --client-id <ID> --client-secret <SECRET>"
            );
            println!("  2. Log today: dailytracker submit --count S=2 --count M=1");
            println!("  3. Or use the form: dailytracker form");
            Ok(())
        }
    }
}
