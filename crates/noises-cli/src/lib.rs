//! Backend launcher for Noises.
//!
//! `setup` runs once at install time and acquires the accelerated runtime;
//! `run` activates it on every launch and supervises the backend process.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

#[cfg(test)]
use tokio_test as _;

// Used by the binary target only
use anyhow as _;
use tokio as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;

pub use bootstrap::{CliContext, bootstrap, load_env_files};
pub use commands::Commands;
pub use error::CliError;
pub use handlers::dispatch;
pub use parser::Cli;
