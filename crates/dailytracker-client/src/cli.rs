//! Command-line interface definition.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dailytracker_core::{Category, parse_count_assignment};

/// dailytracker - log daily symptom counts to a Google Sheet
#[derive(Debug, Parser)]
#[command(name = "dailytracker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "DAILYTRACKER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Returns the configuration file in use.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::ClientConfig::default_path)
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in, sign out, or show the session
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Submit one day's record
    Submit {
        /// Date of the record (YYYY-MM-DD), defaults to today (UTC)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Count for a category, e.g. `--count S/M=2` (can be repeated)
        #[arg(long = "count", value_name = "LABEL=N", value_parser = parse_count_arg, action = clap::ArgAction::Append)]
        counts: Vec<(Category, u32)>,

        /// An overwhelm occurred
        #[arg(long)]
        overwhelm: bool,

        /// A meltdown occurred
        #[arg(long)]
        meltdown: bool,
    },

    /// Enter records interactively, keeping the session fresh in the background
    Form,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Session commands.
#[derive(Debug, Subcommand)]
pub enum AuthAction {
    /// Sign in with Google
    Login {
        /// OAuth client ID (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_ID")]
        client_id: Option<String>,

        /// OAuth client secret (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_SECRET")]
        client_secret: Option<String>,

        /// Path to Google Cloud Console credentials JSON file
        #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
        credentials_file: Option<PathBuf>,

        /// Sign out first and go through consent again
        #[arg(long, short)]
        force: bool,
    },

    /// Revoke the token and forget the session
    Logout,

    /// Show the session state without contacting Google
    Status,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

fn parse_count_arg(value: &str) -> Result<(Category, u32), String> {
    parse_count_assignment(value).map_err(|e| e.to_string())
}
