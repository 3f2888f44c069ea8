//! CLI module for the DCF worker tool
//!
//! Command handlers, grouped by concern.

pub mod commands;

pub use commands::{handle_config_command, handle_keygen_command, handle_worker_command};
