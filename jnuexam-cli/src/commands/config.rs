//! Configuration management CLI commands.
//!
//! Provides `config get`, `config set`, `config list`, and `config path`.

use clap::Subcommand;
use jnuexam::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., download.directory)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., download.directory)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config: &mut ConfigFile) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => {
            let value = parse_key(&key)?.get(config);
            println!("{}", if value.is_empty() { "(not set)" } else { value.as_str() });
            Ok(())
        }
        ConfigCommands::Set { key, value } => {
            let config_key = parse_key(&key)?;
            config_key.set(config, &value)?;
            config.save()?;
            println!("Set {} = {}", config_key.name(), config_key.get(config));
            Ok(())
        }
        ConfigCommands::List => {
            print!("{}", render_list(config));
            Ok(())
        }
        ConfigCommands::Path => {
            println!("{}", config_file_path().display());
            Ok(())
        }
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'jnuexam config list' to see available keys.",
            key
        ))
    })
}

fn render_list(config: &ConfigFile) -> String {
    let mut out = String::new();
    let mut current_section = "";

    for key in ConfigKey::all() {
        let section = key.section();
        if section != current_section {
            if !current_section.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("[{}]\n", section));
            current_section = section;
        }

        let value = key.get(config);
        let shown = if value.is_empty() { "(not set)" } else { value.as_str() };
        out.push_str(&format!("  {} = {}\n", key.key_name(), shown));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_groups_by_section() {
        let text = render_list(&ConfigFile::default());
        assert!(text.starts_with("[source]\n  current = (not set)\n\n[download]\n"));
        assert!(text.contains("[network]\n  connect_timeout_secs = 15\n  read_timeout_secs = 60\n"));
    }

    #[test]
    fn test_unknown_key_message() {
        let err = parse_key("cache.size").unwrap_err();
        assert!(err.to_string().contains("config list"));
    }
}
