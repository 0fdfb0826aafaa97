//! `lendkeep` - Lending ledger CLI
//!
//! This crate provides the `lk` command-line driver on top of
//! `lendkeep-lib`.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Workspace configuration (`.lendkeep/config.yaml`)
//! - [`error`] - CLI error type wrapping library errors
//! - [`format`] - Output formatting (text, JSON)
//! - [`logging`] - `tracing` subscriber setup

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;

pub use cli::run;
pub use error::{CliError, Result};
