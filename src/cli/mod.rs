//! CLI module for focusfield.
//!
//! This module provides the command-line interface:
//! - `commands`: Command definitions using clap derive
//! - `display`: Output formatting and display logic
//! - `shell`: The interactive timer loop

pub mod commands;
pub mod display;
pub mod shell;

pub use commands::{Cli, Commands, ConfigArgs, RunArgs};
pub use display::Display;
pub use shell::{open_store, parse_command, ShellCommand};
