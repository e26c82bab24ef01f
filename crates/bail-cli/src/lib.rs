//! Bail CLI support library
//!
//! # Core Concepts
//!
//! - [`JsonDirStore`]: file-backed [`bail_core::SessionStore`]
//! - [`CliConfig`]: TOML configuration (`data_dir`, `[orchestrator]`)
//! - [`commands`]: output helpers for the `bail` subcommands

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod commands;
mod config;
mod store;

pub use config::{CliConfig, ConfigError, DEFAULT_DATA_DIR};
pub use store::JsonDirStore;
