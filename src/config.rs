use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{AppError, AppResult};
use crate::security::MAX_SELECTION;

/// Connection parameters handed to every upload call.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadConfig {
    pub server_base_url: String,
    pub api_token: String,
}

impl UploadConfig {
    pub fn new(server_base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            server_base_url: server_base_url.into(),
            api_token: api_token.into(),
        }
    }
}

// Keeps the token out of logs.
impl std::fmt::Debug for UploadConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadConfig")
            .field("server_base_url", &self.server_base_url)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server_address: String,
    pub api_token: String,
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_address: "http://localhost:8000".to_string(),
            api_token: "changeme".to_string(),
            concurrency: 1,
            timeout_secs: 120,
            max_retries: 0,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn upload_config(&self) -> UploadConfig {
        UploadConfig::new(self.server_address.clone(), self.api_token.clone())
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

pub fn get_config_path() -> AppResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::Config("Could not find config directory".to_string()))?
        .join("LocalPictureSaver");

    Ok(config_dir.join("config.json"))
}

/// Reads the settings file at the default location. A missing file means defaults.
pub fn load_settings() -> AppResult<Settings> {
    let config_path = get_config_path()?;
    load_settings_from(&config_path)
}

pub fn load_settings_from(config_path: &Path) -> AppResult<Settings> {
    if !config_path.exists() {
        log::debug!(
            "No settings file at {}, using defaults",
            config_path.display()
        );
        return Ok(Settings::default());
    }

    let config_str = fs::read_to_string(config_path)?;
    // A broken file must not silently fall back to the default server and token.
    let settings: Settings = serde_json::from_str(&config_str).map_err(|e| {
        log::error!(
            "Failed to parse settings file {}: {}",
            config_path.display(),
            e
        );
        AppError::Json(e)
    })?;

    validate_settings(&settings)?;
    log::info!("Loaded settings from {}", config_path.display());

    Ok(settings)
}

pub fn validate_settings(settings: &Settings) -> AppResult<()> {
    if settings.server_address.trim().is_empty() {
        return Err(AppError::validation("server_address", "Cannot be empty"));
    }

    if settings.concurrency == 0 || settings.concurrency > MAX_SELECTION {
        return Err(AppError::validation("concurrency", "Must be between 1 and 10"));
    }

    if settings.timeout_secs == 0 {
        return Err(AppError::validation("timeout_secs", "Must be greater than 0"));
    }

    if settings.max_retries > 10 {
        return Err(AppError::validation("max_retries", "Must be 10 or fewer"));
    }

    let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
    if !valid_log_levels.contains(&settings.log_level.as_str()) {
        return Err(AppError::validation("log_level", "Must be a valid log level"));
    }

    Ok(())
}
