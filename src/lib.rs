//! Paddock - Elo ranking microservice for competitive race pilots
//!
//! This crate provides race result ingestion over HTTP, atomic Elo rating
//! updates and ranking queries for competitive race pilots.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod ranking;
pub mod rating;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{RankingError, Result};
pub use types::*;

// Re-export key components
pub use ranking::{EngineStats, RatingEngine};
pub use rating::{EloRaceCalculator, InMemoryRatingStore, RaceCalculator, RatingStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
