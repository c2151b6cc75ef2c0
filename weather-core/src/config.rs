use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

use crate::WeatherError;

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// max_concurrency = 8
/// timeout_secs = 10
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// OpenWeather API key, used when none is given on the command line.
    pub api_key: Option<String>,

    /// Cap on concurrent requests; absent means one request per city at once.
    pub max_concurrency: Option<usize>,

    /// Abort the whole batch after this many seconds.
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Returns the stored API key, ignoring a blank one.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

/// Everything a single run needs, resolved once at startup and passed down
/// by value.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    pub cities: Vec<String>,
    pub api_key: String,
    pub max_concurrency: Option<usize>,
    pub timeout: Option<Duration>,
}

impl FetchSettings {
    /// Combine command-line values with the stored config. Explicit arguments
    /// win over the file.
    pub fn resolve(
        cities: Option<&str>,
        api_key: Option<&str>,
        config: &Config,
    ) -> Result<Self, WeatherError> {
        let cities = parse_cities(cities.unwrap_or_default())?;

        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .or_else(|| config.api_key())
            .ok_or_else(|| {
                WeatherError::Configuration(
                    "API key is required.\n\
                     Hint: pass --api-key, set OPENWEATHER_API_KEY or run `weather configure`."
                        .to_string(),
                )
            })?
            .to_string();

        Ok(Self {
            cities,
            api_key,
            max_concurrency: config.max_concurrency,
            timeout: config.timeout_secs.map(Duration::from_secs),
        })
    }

    pub fn with_max_concurrency(mut self, limit: Option<usize>) -> Self {
        if limit.is_some() {
            self.max_concurrency = limit;
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        if timeout.is_some() {
            self.timeout = timeout;
        }
        self
    }
}

/// Split a comma-separated city list, trimming whitespace around each name.
pub fn parse_cities(raw: &str) -> Result<Vec<String>, WeatherError> {
    if raw.trim().is_empty() {
        return Err(WeatherError::Configuration("must provide at least 1 city".to_string()));
    }

    let cities: Vec<String> = raw.split(',').map(|c| c.trim().to_string()).collect();
    crate::fetch::validate_cities(&cities)?;
    Ok(cities)
}
