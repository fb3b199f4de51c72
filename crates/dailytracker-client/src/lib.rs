//! Command-line front end for the daily tracker.
//!
//! This crate provides the `dailytracker` binary.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod secret;

pub use app::App;
pub use cli::Cli;
pub use error::{ClientError, ClientResult};
