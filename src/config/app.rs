//! Main application configuration
//!
//! This module defines the primary configuration structures for the paddock
//! ranking service, including environment variable loading, TOML file
//! loading and validation.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub store: StoreSettings,
    pub rating: RatingSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for the HTTP API, health and metrics endpoints
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Rating store settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Path of the JSON snapshot file; unset means in-memory only
    pub snapshot_path: Option<PathBuf>,
}

/// Rating engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingSettings {
    /// K-factor applied to every pairwise exchange
    pub k_factor: f64,
    /// Rating assigned to a pilot at registration
    pub default_rating: f64,
    /// Optional lower K-factor for pilots past the experience threshold
    pub experienced_k: Option<f64>,
    /// Races after which a pilot counts as experienced
    pub experienced_after_races: u32,
    /// Default minimum_races filter for the rankings endpoint
    pub default_minimum_races: u32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "paddock".to_string(),
            log_level: "info".to_string(),
            http_port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for RatingSettings {
    fn default() -> Self {
        Self {
            k_factor: 32.0,
            default_rating: 1000.0,
            experienced_k: None,
            experienced_after_races: 30,
            default_minimum_races: 3,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(port) = env::var("HTTP_PORT") {
            config.service.http_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HTTP_PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // Store settings
        if let Ok(path) = env::var("SNAPSHOT_PATH") {
            config.store.snapshot_path = Some(PathBuf::from(path));
        }

        // Rating settings
        if let Ok(k_factor) = env::var("ELO_K_FACTOR") {
            config.rating.k_factor = k_factor
                .parse()
                .map_err(|_| anyhow!("Invalid ELO_K_FACTOR value: {}", k_factor))?;
        }
        if let Ok(rating) = env::var("ELO_DEFAULT_RATING") {
            config.rating.default_rating = rating
                .parse()
                .map_err(|_| anyhow!("Invalid ELO_DEFAULT_RATING value: {}", rating))?;
        }
        if let Ok(experienced_k) = env::var("ELO_EXPERIENCED_K") {
            config.rating.experienced_k = Some(
                experienced_k
                    .parse()
                    .map_err(|_| anyhow!("Invalid ELO_EXPERIENCED_K value: {}", experienced_k))?,
            );
        }
        if let Ok(threshold) = env::var("ELO_EXPERIENCED_AFTER_RACES") {
            config.rating.experienced_after_races = threshold.parse().map_err(|_| {
                anyhow!("Invalid ELO_EXPERIENCED_AFTER_RACES value: {}", threshold)
            })?;
        }
        if let Ok(minimum) = env::var("DEFAULT_MINIMUM_RACES") {
            config.rating.default_minimum_races = minimum
                .parse()
                .map_err(|_| anyhow!("Invalid DEFAULT_MINIMUM_RACES value: {}", minimum))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, environment is ignored
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate ports
    if config.service.http_port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }

    // Validate timeouts
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    // Validate rating settings
    if !config.rating.k_factor.is_finite() || config.rating.k_factor <= 0.0 {
        return Err(anyhow!("K-factor must be positive"));
    }
    if !config.rating.default_rating.is_finite() || config.rating.default_rating <= 0.0 {
        return Err(anyhow!("Default rating must be positive"));
    }
    if let Some(experienced_k) = config.rating.experienced_k {
        if !experienced_k.is_finite() || experienced_k <= 0.0 {
            return Err(anyhow!("Experienced K-factor must be positive"));
        }
        if experienced_k > config.rating.k_factor {
            return Err(anyhow!(
                "Experienced K-factor must not exceed the base K-factor"
            ));
        }
    }

    Ok(())
}
