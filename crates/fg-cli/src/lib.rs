//! Foreground usage CLI library.
//!
//! This crate provides the `fgtime` command-line interface over snapshot
//! directories exported from a device.

mod cli;
pub mod commands;
mod config;
pub mod snapshot;

pub use cli::{Cli, Commands};
pub use config::Config;
