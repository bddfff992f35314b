//! Race calculator trait and implementations
//!
//! This module defines the interface for turning a race finishing order
//! into per-pilot rating changes.

use crate::types::{Pilot, RatingChange};

/// Trait for calculating rating changes after races
pub trait RaceCalculator: Send + Sync {
    /// Calculate rating changes for a finished race
    ///
    /// # Arguments
    /// * `entrants` - Pre-race pilot snapshots in finishing order, first
    ///   entry is the winner
    ///
    /// # Returns
    /// One rating change per entrant, in finishing order
    fn calculate_race_deltas(&self, entrants: &[Pilot]) -> crate::error::Result<Vec<RatingChange>>;

    /// Get the initial rating for new pilots
    fn initial_rating(&self) -> f64;

    /// Get current configuration as JSON
    fn config(&self) -> serde_json::Value;

    /// Update configuration from JSON
    fn update_config(&mut self, config: serde_json::Value) -> crate::error::Result<()>;
}

/// Mock race calculator for testing
#[derive(Debug, Default)]
pub struct MockRaceCalculator {
    calculation_calls: std::sync::Mutex<Vec<Vec<Pilot>>>,
    fixed_result: std::sync::RwLock<Option<Vec<RatingChange>>>,
    initial_rating: f64,
}

impl MockRaceCalculator {
    pub fn new() -> Self {
        Self {
            calculation_calls: std::sync::Mutex::new(Vec::new()),
            fixed_result: std::sync::RwLock::new(None),
            initial_rating: 1000.0,
        }
    }

    /// Set a fixed result to return for all calculations
    pub fn set_fixed_result(&self, result: Vec<RatingChange>) {
        if let Ok(mut fixed) = self.fixed_result.write() {
            *fixed = Some(result);
        }
    }

    /// Get all calculation calls made (for testing)
    pub fn get_calculation_calls(&self) -> Vec<Vec<Pilot>> {
        self.calculation_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Clear recorded calls
    pub fn clear_calls(&self) {
        if let Ok(mut calls) = self.calculation_calls.lock() {
            calls.clear();
        }
    }
}

impl RaceCalculator for MockRaceCalculator {
    fn calculate_race_deltas(&self, entrants: &[Pilot]) -> crate::error::Result<Vec<RatingChange>> {
        // Record the call
        if let Ok(mut calls) = self.calculation_calls.lock() {
            calls.push(entrants.to_vec());
        }

        // Return fixed result if set, otherwise leave ratings untouched
        if let Ok(fixed) = self.fixed_result.read() {
            if let Some(result) = fixed.as_ref() {
                return Ok(result.clone());
            }
        }

        Ok(entrants
            .iter()
            .enumerate()
            .map(|(index, pilot)| RatingChange {
                pilot_id: pilot.id,
                old_elo: pilot.elo,
                new_elo: pilot.elo,
                delta: 0.0,
                position: index as u32 + 1,
            })
            .collect())
    }

    fn initial_rating(&self) -> f64 {
        self.initial_rating
    }

    fn config(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "mock",
            "initial_rating": self.initial_rating,
        })
    }

    fn update_config(&mut self, config: serde_json::Value) -> crate::error::Result<()> {
        if let Some(rating) = config.get("initial_rating").and_then(|v| v.as_f64()) {
            self.initial_rating = rating;
        }
        Ok(())
    }
}
