//! Error types for the ranking service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific ranking scenarios
#[derive(Debug, thiserror::Error)]
pub enum RankingError {
    #[error("Pilot not found: {pilot_id}")]
    PilotNotFound { pilot_id: i64 },

    #[error("Race already applied: {race_id}")]
    RaceAlreadyApplied { race_id: String },

    #[error("Concurrent update conflict for race {race_id}: {reason}")]
    UpdateConflict { race_id: String, reason: String },

    #[error("Invalid race result: {reason}")]
    InvalidRace { reason: String },

    #[error("Invalid pilot data: {reason}")]
    InvalidPilot { reason: String },

    #[error("Rating store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
