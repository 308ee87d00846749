use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    errors::{ModelError, Result},
    reporting::DEFAULT_DECIMAL_PLACES,
    utils::persistence::{app_data_dir, config_file_in, ensure_dir, write_atomic},
};

const MAX_DECIMAL_PLACES: u8 = 6;

/// User preferences applied by the command line front end.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub currency: String,
    /// Digits after the decimal point in balance and transaction reports.
    pub decimal_places: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_opened_model: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            currency: "USD".into(),
            decimal_places: DEFAULT_DECIMAL_PLACES,
            last_opened_model: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.currency.trim().is_empty() {
            return Err(ModelError::InvalidConfiguration(
                "currency code must not be empty".into(),
            ));
        }
        if self.decimal_places > MAX_DECIMAL_PLACES {
            return Err(ModelError::InvalidConfiguration(format!(
                "decimal places must be at most {}",
                MAX_DECIMAL_PLACES
            )));
        }
        Ok(())
    }
}

/// Loads and saves [`Config`] as pretty JSON under the application directory.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        ensure_dir(&base)?;
        let config_path = config_file_in(&base);
        if let Some(parent) = config_path.parent() {
            ensure_dir(parent)?;
        }
        Ok(Self { config_path })
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Returns the stored config, or defaults when none has been saved yet.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            debug!(path = %self.config_path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&self.config_path)?;
        let config: Config = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.config_path, &json)?;
        debug!(path = %self.config_path.display(), "config saved");
        Ok(())
    }

    /// Stores `name` as the most recently opened model.
    pub fn record_last_model(&self, name: Option<&str>) -> Result<()> {
        let mut config = self.load()?;
        config.last_opened_model = name.map(str::to_string);
        self.save(&config)
    }
}
