//! Config commands

use crate::ConfigCommands;
use sentinel_console::config::CONFIG_KEYS;
use sentinel_console::ConsoleConfig;

pub fn handle(action: ConfigCommands, profile: Option<&str>) -> anyhow::Result<()> {
    match action {
        ConfigCommands::Init => {
            let path = ConsoleConfig::default().save(profile)?;
            println!("Configuration initialized at {}", path.display());
        }
        ConfigCommands::Set { key, value } => {
            let mut config = ConsoleConfig::read(profile)?;
            config.set(&key, &value)?;
            config.save(profile)?;
            println!("Set {} successfully", key);
        }
        ConfigCommands::Get { key } => {
            if !CONFIG_KEYS.contains(&key.as_str()) {
                anyhow::bail!("Unknown config key: {}", key);
            }
            let config = ConsoleConfig::read(profile)?;
            println!("{}: {}", key, config.get(&key).unwrap_or_else(|| "(not set)".into()));
        }
        ConfigCommands::List => {
            let config = ConsoleConfig::read(profile)?;
            if let Err(e) = config.validate() {
                eprintln!("warning: {}", e);
            }
            for key in CONFIG_KEYS {
                println!("{}: {}", key, config.get(key).unwrap_or_else(|| "(not set)".into()));
            }
        }
    }
    Ok(())
}
