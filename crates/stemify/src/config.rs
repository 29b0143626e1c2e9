//! Configuration for stemify
//!
//! Stored as YAML, by default in `~/.config/stemify/config.yaml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::separation::SeparationConfig;

/// Top-level application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StemifyConfig {
    /// Stem separation settings
    pub separation: SeparationConfig,
    /// Directory project folders are created in
    pub output_dir: PathBuf,
}

impl Default for StemifyConfig {
    fn default() -> Self {
        Self {
            separation: SeparationConfig::default(),
            output_dir: default_output_dir(),
        }
    }
}

/// Default output directory: `~/Music/Stemify`, or `./stemify` without a home
pub fn default_output_dir() -> PathBuf {
    dirs::audio_dir()
        .or_else(dirs::home_dir)
        .map(|dir| dir.join("Stemify"))
        .unwrap_or_else(|| PathBuf::from("stemify"))
}

/// Default config file location
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stemify")
        .join("config.yaml")
}

/// Load configuration from a YAML file
///
/// A missing or unreadable file yields the defaults.
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    log::info!("load_config: Loading from {:?}", path);

    if !path.exists() {
        log::info!("load_config: Config file doesn't exist, using defaults");
        return T::default();
    }

    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            log::warn!("load_config: Failed to read config file: {}, using defaults", e);
            return T::default();
        }
    };

    serde_yaml::from_str(&contents).unwrap_or_else(|e| {
        log::warn!("load_config: Failed to parse config: {}, using defaults", e);
        T::default()
    })
}

/// Save configuration to a YAML file, creating parent directories
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    log::info!("save_config: Saving to {:?}", path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    Ok(())
}
