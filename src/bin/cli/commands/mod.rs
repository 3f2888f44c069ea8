//! Command handlers for the DCF worker CLI

mod config;
mod keys;
mod worker;

pub use config::handle_config_command;
pub use keys::handle_keygen_command;
pub use worker::handle_worker_command;
