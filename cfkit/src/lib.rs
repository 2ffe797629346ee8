//! Command-line front end for the cloud controller.
//!
//! The binary parses arguments with [`cli::Cli`], loads a [`config::CliConfig`]
//! and runs one command. Commands obtain their API clients from
//! [`clients::new_clients`], which assembles the connection pipeline of
//! `cfkit-client` from the configuration.

pub mod cli;
pub mod clients;
pub mod commands;
pub mod config;
mod error;
pub mod logging;
pub mod ui;

pub use error::{CommandError, ConfigError};
