//! beaconcast CLI library
//!
//! This library provides the components behind the `beaconcast` binary: argument
//! parsing, TOML configuration, and the command handlers that encode payloads and run
//! advertising sessions on the simulated radio.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::{Cli, Commands, PayloadArgs};
pub use commands::CommandDispatcher;
pub use config::AppConfig;
pub use error::{CliError, Result};
