//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the shakescript binary.

mod commands;
mod story;

pub use commands::Cli;
pub use story::{handle_story_command, report_error};
