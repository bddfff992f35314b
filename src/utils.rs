//! Utility functions for the ranking service

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique race ID
pub fn generate_race_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Round a stored rating to the nearest integer for display.
///
/// Stored ratings stay exact; this is applied only when building the
/// transfer view.
pub fn round_for_display(elo: f64) -> i64 {
    elo.round() as i64
}

/// Calculate the absolute difference between two ratings
pub fn rating_difference(rating1: f64, rating2: f64) -> f64 {
    (rating1 - rating2).abs()
}
