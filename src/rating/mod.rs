//! Rating system integration using the Elo algorithm
//!
//! This module provides race delta calculations, the pilot store
//! interface, and integration with the skillratings crate.

pub mod calculator;
pub mod elo;
pub mod store;

// Re-export commonly used types
pub use calculator::RaceCalculator;
pub use elo::{EloRaceCalculator, ExtendedEloConfig};
pub use store::{InMemoryRatingStore, RatingStore};
