use std::{env, fmt, fs, path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::monitoring::{Intervals, ValidationRules};
use crate::notify::TwilioConfig;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config: {0}")]
    ReadFailed(#[source] std::io::Error),
    #[error("failed to write config: {0}")]
    WriteFailed(#[source] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("no config path available (neither XDG_CONFIG_HOME nor HOME is set)")]
    ConfigPathUnavailable,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub workers: WorkersConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Twilio credentials; alerts are only logged when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifier: Option<TwilioConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub check_interval_secs: u64,
    pub rotation_interval_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: path::PathBuf,
    pub logs_dir: path::PathBuf,
    pub checks_collection: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub id_length: usize,
    pub phone_length: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self { check_interval_secs: 60, rotation_interval_secs: 60 * 60 * 24 }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: ".data".into(),
            logs_dir: ".logs".into(),
            checks_collection: "checks".into(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        let rules = ValidationRules::default();
        Self { id_length: rules.id_length, phone_length: rules.phone_length }
    }
}

impl WorkersConfig {
    /// Zero intervals are bumped to one second so the timers stay valid.
    pub fn intervals(&self) -> Intervals {
        Intervals {
            sweep: Duration::from_secs(self.check_interval_secs.max(1)),
            rotation: Duration::from_secs(self.rotation_interval_secs.max(1)),
        }
    }
}

impl ValidationConfig {
    pub fn rules(&self) -> ValidationRules {
        ValidationRules { id_length: self.id_length, phone_length: self.phone_length }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/uppe/workers.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("uppe/workers.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Workers")?;
        write_1(f, "Check Interval (s)", &self.workers.check_interval_secs)?;
        write_1(f, "Rotation Interval (s)", &self.workers.rotation_interval_secs)?;
        write_title_1(f, "Storage")?;
        write_1(f, "Data Directory", &self.storage.data_dir.display())?;
        write_1(f, "Logs Directory", &self.storage.logs_dir.display())?;
        write_1(f, "Checks Collection", &self.storage.checks_collection)?;
        write_title_1(f, "Validation")?;
        write_1(f, "Id Length", &self.validation.id_length)?;
        write_1(f, "Phone Length", &self.validation.phone_length)?;
        write_title_1(f, "Notifier")?;
        match &self.notifier {
            Some(twilio) => {
                write_1(f, "Provider", &"twilio")?;
                write_1(f, "Account SID", &twilio.account_sid)?;
                write_1(f, "Auth Token", &"***")?;
                write_1(f, "From", &twilio.from_phone)?;
                write_1(f, "API Base", &twilio.api_base)?;
            }
            None => write_1(f, "Provider", &"log only")?,
        }

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/uppe/workers.toml
    ///  or the specified path, if one does not exist
    ///
    /// ```rust,ignore
    /// let cfg = config::Config::from_config(None::<&path::Path>)?;
    /// println!("{}", cfg);
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path).map_err(Error::ReadFailed)?;
            Ok(toml::from_str(raw_string.as_str())?)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &std::path::Path) -> Result<(), Error> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(Error::WriteFailed)?;
        }

        std::fs::write(path, config_str).map_err(Error::WriteFailed)
    }
}
