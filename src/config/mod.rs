//! Configuration management for the paddock service
//!
//! This module handles all configuration loading from environment variables,
//! optional TOML files, validation, and default values for the ranking
//! service.

pub mod app;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, RatingSettings, ServiceSettings, StoreSettings};
