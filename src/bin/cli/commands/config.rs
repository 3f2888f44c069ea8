//! Configuration command handlers for the DCF worker CLI

use dcf_worker::{WorkerConfig, WorkerError, WorkerResult};

use crate::ConfigCommands;

pub fn handle_config_command(cmd: ConfigCommands, config: &WorkerConfig) -> WorkerResult<()> {
    match cmd {
        ConfigCommands::Show => {
            let rendered = toml::to_string_pretty(config).map_err(|e| {
                WorkerError::config_error(format!("Failed to serialize config: {}", e))
            })?;
            println!("{}", rendered);
        }
        ConfigCommands::Save { path } => {
            config.save_to_file(&path)?;
            println!("✓ Configuration written to {}", path.display());
        }
    }
    Ok(())
}
