//! Elo rating system implementation
//!
//! This module provides the concrete race calculator built on the Elo
//! algorithm from the skillratings crate. A race over n pilots is
//! decomposed into the n*(n-1)/2 pairwise match-ups implied by the
//! finishing order, every pair evaluated against the pre-race snapshot so
//! the result does not depend on processing order.

use crate::rating::calculator::RaceCalculator;
use crate::types::{Pilot, RatingChange};
use serde::{Deserialize, Serialize};
use skillratings::elo::{elo, expected_score, EloConfig, EloRating};
use skillratings::Outcomes;
use std::collections::HashSet;

/// Extended configuration for the Elo rating system
/// This wraps the skillratings EloConfig with additional parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendedEloConfig {
    /// Core Elo parameters (the K-factor)
    pub elo_config: EloConfig,
    /// Initial rating for new pilots
    pub initial_rating: f64,
    /// Optional lower K-factor for experienced pilots
    pub experienced_k: Option<f64>,
    /// Races after which a pilot counts as experienced
    pub experienced_after_races: u32,
}

impl Default for ExtendedEloConfig {
    fn default() -> Self {
        Self {
            elo_config: EloConfig { k: 32.0 },
            initial_rating: 1000.0,
            experienced_k: None,
            experienced_after_races: 30,
        }
    }
}

impl ExtendedEloConfig {
    /// Create conservative configuration (slower rating changes)
    pub fn conservative() -> Self {
        Self {
            elo_config: EloConfig { k: 16.0 },
            initial_rating: 1000.0,
            experienced_k: None,
            experienced_after_races: 30,
        }
    }

    /// Create aggressive configuration (faster rating changes)
    pub fn aggressive() -> Self {
        Self {
            elo_config: EloConfig { k: 48.0 },
            initial_rating: 1000.0,
            experienced_k: None,
            experienced_after_races: 30,
        }
    }

    /// Build the configuration from the application settings
    pub fn from_settings(settings: &crate::config::RatingSettings) -> Self {
        Self {
            elo_config: EloConfig {
                k: settings.k_factor,
            },
            initial_rating: settings.default_rating,
            experienced_k: settings.experienced_k,
            experienced_after_races: settings.experienced_after_races,
        }
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> crate::error::Result<()> {
        if !self.elo_config.k.is_finite() || self.elo_config.k <= 0.0 {
            return Err(crate::error::RankingError::ConfigurationError {
                message: "K-factor must be positive".to_string(),
            }
            .into());
        }

        if !self.initial_rating.is_finite() || self.initial_rating <= 0.0 {
            return Err(crate::error::RankingError::ConfigurationError {
                message: "Initial rating must be positive".to_string(),
            }
            .into());
        }

        if let Some(experienced_k) = self.experienced_k {
            if !experienced_k.is_finite() || experienced_k <= 0.0 {
                return Err(crate::error::RankingError::ConfigurationError {
                    message: "Experienced K-factor must be positive".to_string(),
                }
                .into());
            }
            if experienced_k > self.elo_config.k {
                return Err(crate::error::RankingError::ConfigurationError {
                    message: "Experienced K-factor must not exceed the base K-factor".to_string(),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// Elo race calculator implementation
#[derive(Debug)]
pub struct EloRaceCalculator {
    config: ExtendedEloConfig,
}

impl EloRaceCalculator {
    /// Create a new Elo race calculator
    pub fn new(config: ExtendedEloConfig) -> crate::error::Result<Self> {
        config.validate()?;

        Ok(Self { config })
    }

    /// Get the default rating for new pilots
    pub fn default_rating(&self) -> f64 {
        self.config.initial_rating
    }

    /// Probability of the first pilot beating the second, from ratings
    /// alone
    pub fn calculate_expected_score(&self, rating: f64, opponent_rating: f64) -> f64 {
        let (expected, _) = expected_score(
            &EloRating { rating },
            &EloRating {
                rating: opponent_rating,
            },
        );
        expected
    }

    /// K-factor applicable to a pilot with the given race count
    fn k_for(&self, races_completed: u32) -> f64 {
        match self.config.experienced_k {
            Some(experienced_k) if races_completed >= self.config.experienced_after_races => {
                experienced_k
            }
            _ => self.config.elo_config.k,
        }
    }

    /// K-factor for a pairing: the lower of the two pilots' K-factors, so
    /// the exchange stays exactly zero-sum
    fn pair_k(&self, winner: &Pilot, loser: &Pilot) -> f64 {
        self.k_for(winner.races_completed)
            .min(self.k_for(loser.races_completed))
    }

    fn validate_entrants(&self, entrants: &[Pilot]) -> crate::error::Result<()> {
        if entrants.len() < 2 {
            return Err(crate::error::RankingError::InvalidRace {
                reason: "A race needs at least two finishers".to_string(),
            }
            .into());
        }

        let mut seen = HashSet::with_capacity(entrants.len());
        for pilot in entrants {
            if !seen.insert(pilot.id) {
                return Err(crate::error::RankingError::InvalidRace {
                    reason: format!("Pilot {} appears more than once", pilot.id),
                }
                .into());
            }
        }

        Ok(())
    }
}

impl RaceCalculator for EloRaceCalculator {
    fn calculate_race_deltas(&self, entrants: &[Pilot]) -> crate::error::Result<Vec<RatingChange>> {
        self.validate_entrants(entrants)?;

        // Accumulate every pairwise exchange against the pre-race
        // snapshot; entrants[i] finished ahead of entrants[j] for i < j
        let mut deltas = vec![0.0; entrants.len()];
        for i in 0..entrants.len() {
            for j in (i + 1)..entrants.len() {
                let pair_config = EloConfig {
                    k: self.pair_k(&entrants[i], &entrants[j]),
                };
                let winner = EloRating {
                    rating: entrants[i].elo,
                };
                let loser = EloRating {
                    rating: entrants[j].elo,
                };
                let (new_winner, new_loser) = elo(&winner, &loser, &Outcomes::WIN, &pair_config);
                deltas[i] += new_winner.rating - winner.rating;
                deltas[j] += new_loser.rating - loser.rating;
            }
        }

        Ok(entrants
            .iter()
            .enumerate()
            .map(|(index, pilot)| RatingChange {
                pilot_id: pilot.id,
                old_elo: pilot.elo,
                new_elo: pilot.elo + deltas[index],
                delta: deltas[index],
                position: index as u32 + 1,
            })
            .collect())
    }

    fn initial_rating(&self) -> f64 {
        self.default_rating()
    }

    fn config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null)
    }

    fn update_config(&mut self, config: serde_json::Value) -> crate::error::Result<()> {
        let new_config: ExtendedEloConfig = serde_json::from_value(config).map_err(|e| {
            crate::error::RankingError::ConfigurationError {
                message: format!("Invalid Elo configuration: {}", e),
            }
        })?;

        new_config.validate()?;
        self.config = new_config;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PilotProfile;
    use proptest::prelude::*;

    fn test_pilot(id: i64, elo: f64) -> Pilot {
        Pilot::new(
            id,
            PilotProfile {
                license_number: format!("FR-{:03}", id),
                first_name: "Test".to_string(),
                last_name: "Pilot".to_string(),
                pseudo: format!("pilot-{}", id),
            },
            elo,
        )
    }

    fn test_pilot_with_races(id: i64, elo: f64, races: u32) -> Pilot {
        let mut pilot = test_pilot(id, elo);
        pilot.races_completed = races;
        pilot
    }

    /// Reference pairwise exchange: what the winner of a single pairing
    /// gains at the given K
    fn reference_winner_gain(winner_elo: f64, loser_elo: f64, k: f64) -> f64 {
        let expected = 1.0 / (1.0 + 10f64.powf((loser_elo - winner_elo) / 400.0));
        k * (1.0 - expected)
    }

    #[test]
    fn test_extended_elo_config_default() {
        let config = ExtendedEloConfig::default();
        assert_eq!(config.elo_config.k, 32.0);
        assert_eq!(config.initial_rating, 1000.0);
        assert!(config.experienced_k.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_extended_elo_config_validation() {
        let mut config = ExtendedEloConfig::default();
        assert!(config.validate().is_ok());

        // Invalid K-factor
        config.elo_config.k = 0.0;
        assert!(config.validate().is_err());

        // Invalid initial rating
        config = ExtendedEloConfig::default();
        config.initial_rating = -100.0;
        assert!(config.validate().is_err());

        // Experienced K above the base K
        config = ExtendedEloConfig::default();
        config.experienced_k = Some(64.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_presets() {
        let conservative = ExtendedEloConfig::conservative();
        let aggressive = ExtendedEloConfig::aggressive();
        let default = ExtendedEloConfig::default();

        assert!(conservative.elo_config.k < default.elo_config.k);
        assert!(aggressive.elo_config.k > default.elo_config.k);

        assert!(conservative.validate().is_ok());
        assert!(aggressive.validate().is_ok());
        assert!(default.validate().is_ok());
    }

    #[test]
    fn test_config_from_settings() {
        let mut settings = crate::config::RatingSettings::default();
        settings.k_factor = 24.0;
        settings.default_rating = 1200.0;
        settings.experienced_k = Some(12.0);

        let config = ExtendedEloConfig::from_settings(&settings);
        assert_eq!(config.elo_config.k, 24.0);
        assert_eq!(config.initial_rating, 1200.0);
        assert_eq!(config.experienced_k, Some(12.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_calculator_creation() {
        let calculator = EloRaceCalculator::new(ExtendedEloConfig::default()).unwrap();
        assert_eq!(calculator.initial_rating(), 1000.0);

        let mut bad_config = ExtendedEloConfig::default();
        bad_config.elo_config.k = -1.0;
        assert!(EloRaceCalculator::new(bad_config).is_err());
    }

    #[test]
    fn test_two_equal_pilots_head_to_head() {
        let calculator = EloRaceCalculator::new(ExtendedEloConfig::default()).unwrap();
        let entrants = vec![test_pilot(1, 1000.0), test_pilot(2, 1000.0)];

        let changes = calculator.calculate_race_deltas(&entrants).unwrap();
        assert_eq!(changes.len(), 2);

        // Equal ratings, K=32: the winner takes exactly 16 points
        assert!((changes[0].new_elo - 1016.0).abs() < 1e-9);
        assert!((changes[1].new_elo - 984.0).abs() < 1e-9);
        assert_eq!(changes[0].position, 1);
        assert_eq!(changes[1].position, 2);
        assert!((changes[0].delta + changes[1].delta).abs() < 1e-9);
    }

    #[test]
    fn test_three_equal_pilots_middle_nets_zero() {
        let calculator = EloRaceCalculator::new(ExtendedEloConfig::default()).unwrap();
        let entrants = vec![
            test_pilot(1, 1000.0),
            test_pilot(2, 1000.0),
            test_pilot(3, 1000.0),
        ];

        let changes = calculator.calculate_race_deltas(&entrants).unwrap();

        // Winner gains from both pairings, the middle pilot's win and
        // loss cancel, the last pilot pays for both
        assert!((changes[0].delta - 32.0).abs() < 1e-9);
        assert!(changes[1].delta.abs() < 1e-9);
        assert!((changes[2].delta + 32.0).abs() < 1e-9);
    }

    #[test]
    fn test_underdog_win_pays_more() {
        let calculator = EloRaceCalculator::new(ExtendedEloConfig::default()).unwrap();

        let upset = calculator
            .calculate_race_deltas(&[test_pilot(1, 1200.0), test_pilot(2, 1400.0)])
            .unwrap();
        let expected_gain = calculator
            .calculate_race_deltas(&[test_pilot(1, 1400.0), test_pilot(2, 1200.0)])
            .unwrap();

        // Beating a stronger opponent moves more points than beating a
        // weaker one
        assert!(upset[0].delta > 16.0);
        assert!(expected_gain[0].delta < 16.0);
        assert!(upset[0].delta > expected_gain[0].delta);
    }

    #[test]
    fn test_deltas_follow_reference_formula() {
        let calculator = EloRaceCalculator::new(ExtendedEloConfig::default()).unwrap();
        let entrants = vec![
            test_pilot(1, 1350.0),
            test_pilot(2, 1100.0),
            test_pilot(3, 980.0),
        ];

        let changes = calculator.calculate_race_deltas(&entrants).unwrap();

        // Every pairing is evaluated on the pre-race snapshot, so each
        // pilot's delta is the sum of its independent pairwise exchanges
        let gain_1_2 = reference_winner_gain(1350.0, 1100.0, 32.0);
        let gain_1_3 = reference_winner_gain(1350.0, 980.0, 32.0);
        let gain_2_3 = reference_winner_gain(1100.0, 980.0, 32.0);

        assert!((changes[0].delta - (gain_1_2 + gain_1_3)).abs() < 1e-9);
        assert!((changes[1].delta - (gain_2_3 - gain_1_2)).abs() < 1e-9);
        assert!((changes[2].delta - (-gain_1_3 - gain_2_3)).abs() < 1e-9);
    }

    #[test]
    fn test_expected_score_calculation() {
        let calculator = EloRaceCalculator::new(ExtendedEloConfig::default()).unwrap();

        assert!((calculator.calculate_expected_score(1000.0, 1000.0) - 0.5).abs() < 1e-9);
        assert!(calculator.calculate_expected_score(1700.0, 1300.0) > 0.9);
        assert!(calculator.calculate_expected_score(1300.0, 1700.0) < 0.1);

        // 200 point favorite: 1 / (1 + 10^(-0.5))
        let favorite = calculator.calculate_expected_score(1400.0, 1200.0);
        assert!((favorite - 1.0 / (1.0 + 10f64.powf(-0.5))).abs() < 1e-9);
    }

    #[test]
    fn test_tiered_k_uses_the_lower_factor() {
        let mut config = ExtendedEloConfig::default();
        config.experienced_k = Some(16.0);
        config.experienced_after_races = 30;
        let calculator = EloRaceCalculator::new(config).unwrap();

        let rookie = test_pilot_with_races(1, 1000.0, 0);
        let veteran = test_pilot_with_races(2, 1000.0, 45);

        let changes = calculator
            .calculate_race_deltas(&[rookie, veteran])
            .unwrap();

        // The pairing runs at the veteran's K so the exchange stays
        // zero-sum
        assert!((changes[0].delta - 8.0).abs() < 1e-9);
        assert!((changes[1].delta + 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_inputs() {
        let calculator = EloRaceCalculator::new(ExtendedEloConfig::default()).unwrap();

        // No entrants
        assert!(calculator.calculate_race_deltas(&[]).is_err());

        // A single finisher is not a race
        assert!(calculator
            .calculate_race_deltas(&[test_pilot(1, 1000.0)])
            .is_err());

        // Duplicated pilot
        let result =
            calculator.calculate_race_deltas(&[test_pilot(1, 1000.0), test_pilot(1, 1000.0)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_update_config_revalidates() {
        let mut calculator = EloRaceCalculator::new(ExtendedEloConfig::default()).unwrap();

        let good = serde_json::to_value(ExtendedEloConfig::conservative()).unwrap();
        calculator.update_config(good).unwrap();
        assert_eq!(calculator.config()["elo_config"]["k"], 16.0);

        let mut bad = ExtendedEloConfig::default();
        bad.elo_config.k = 0.0;
        let bad = serde_json::to_value(bad).unwrap();
        assert!(calculator.update_config(bad).is_err());
    }

    proptest! {
        #[test]
        fn prop_race_deltas_sum_to_zero(
            ratings in prop::collection::vec(600.0f64..2400.0, 2..8),
            races in prop::collection::vec(0u32..60, 8),
        ) {
            let mut config = ExtendedEloConfig::default();
            config.experienced_k = Some(16.0);
            let calculator = EloRaceCalculator::new(config).unwrap();

            let entrants: Vec<Pilot> = ratings
                .iter()
                .enumerate()
                .map(|(index, rating)| {
                    test_pilot_with_races(index as i64 + 1, *rating, races[index])
                })
                .collect();

            let changes = calculator.calculate_race_deltas(&entrants).unwrap();
            let total: f64 = changes.iter().map(|change| change.delta).sum();
            prop_assert!(total.abs() < 1e-9);
        }

        #[test]
        fn prop_winner_never_loses_points(
            winner_elo in 600.0f64..2400.0,
            loser_elo in 600.0f64..2400.0,
        ) {
            let calculator = EloRaceCalculator::new(ExtendedEloConfig::default()).unwrap();
            let changes = calculator
                .calculate_race_deltas(&[test_pilot(1, winner_elo), test_pilot(2, loser_elo)])
                .unwrap();

            prop_assert!(changes[0].delta > 0.0);
            prop_assert!(changes[1].delta < 0.0);
        }
    }
}
