//! Persisted settings.
//!
//! Settings live in an INI file under the platform config directory:
//!
//! ```ini
//! [source]
//! current = cloudflare
//!
//! [download]
//! directory = /home/user/Downloads
//!
//! [network]
//! connect_timeout_secs = 15
//! read_timeout_secs = 60
//! ```
//!
//! A missing file or missing keys yield defaults. The stored source id is only
//! a starting point; an id the session does not know falls back to the
//! default source.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::download::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS};
use crate::source::SourceTable;

const APP_DIR: &str = "jnuexam";
const CONFIG_FILE_NAME: &str = "config.ini";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("failed to write config file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// `[source]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSettings {
    /// Last selected source id.
    pub current: Option<String>,
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    /// Where quick downloads are saved.
    pub directory: PathBuf,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            directory: default_download_dir(),
        }
    }
}

/// `[network]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSettings {
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
        }
    }
}

impl NetworkSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

/// The whole settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub source: SourceSettings,
    pub download: DownloadSettings,
    pub network: NetworkSettings,
}

impl ConfigFile {
    /// Load from [`config_file_path`]. Defaults if the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from an explicit path. Defaults if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for key in ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|props| props.get(key.key_name()));
            if let Some(value) = value {
                key.set(&mut config, value)?;
            }
        }

        Ok(config)
    }

    /// Save to [`config_file_path`].
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section())).set(key.key_name(), value);
            }
        }

        ini.write_to_file(path).map_err(write_err)?;
        tracing::debug!(path = %path.display(), "saved config");
        Ok(())
    }
}

/// Path of the settings file.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE_NAME)
}

/// The user's downloads folder, or `~/Downloads` if the platform has none.
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// A setting addressable as `section.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    SourceCurrent,
    DownloadDirectory,
    NetworkConnectTimeoutSecs,
    NetworkReadTimeoutSecs,
}

impl ConfigKey {
    /// Every key, in file order.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::SourceCurrent,
            ConfigKey::DownloadDirectory,
            ConfigKey::NetworkConnectTimeoutSecs,
            ConfigKey::NetworkReadTimeoutSecs,
        ]
    }

    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::SourceCurrent => "source",
            ConfigKey::DownloadDirectory => "download",
            ConfigKey::NetworkConnectTimeoutSecs | ConfigKey::NetworkReadTimeoutSecs => "network",
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::SourceCurrent => "current",
            ConfigKey::DownloadDirectory => "directory",
            ConfigKey::NetworkConnectTimeoutSecs => "connect_timeout_secs",
            ConfigKey::NetworkReadTimeoutSecs => "read_timeout_secs",
        }
    }

    /// Dotted name, e.g. `source.current`.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Current value as text. Empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::SourceCurrent => config.source.current.clone().unwrap_or_default(),
            ConfigKey::DownloadDirectory => config.download.directory.display().to_string(),
            ConfigKey::NetworkConnectTimeoutSecs => config.network.connect_timeout_secs.to_string(),
            ConfigKey::NetworkReadTimeoutSecs => config.network.read_timeout_secs.to_string(),
        }
    }

    /// Validate and store `value`.
    ///
    /// An empty source id clears it. Source ids must name a built-in mirror.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match self {
            ConfigKey::SourceCurrent => {
                if value.is_empty() {
                    config.source.current = None;
                    return Ok(());
                }
                let table = SourceTable::builtin();
                let source = table.resolve(value).map_err(|e| self.invalid(value, e.to_string()))?;
                config.source.current = Some(source.id.clone());
            }
            ConfigKey::DownloadDirectory => {
                if value.is_empty() {
                    return Err(self.invalid(value, "directory must not be empty"));
                }
                config.download.directory = PathBuf::from(value);
            }
            ConfigKey::NetworkConnectTimeoutSecs => {
                config.network.connect_timeout_secs = self.parse_secs(value)?;
            }
            ConfigKey::NetworkReadTimeoutSecs => {
                config.network.read_timeout_secs = self.parse_secs(value)?;
            }
        }
        Ok(())
    }

    fn parse_secs(&self, value: &str) -> Result<u64, ConfigError> {
        match value.parse::<u64>() {
            Ok(0) => Err(self.invalid(value, "must be at least 1 second")),
            Ok(secs) => Ok(secs),
            Err(e) => Err(self.invalid(value, e.to_string())),
        }
    }

    fn invalid(&self, value: &str, reason: impl ToString) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}
