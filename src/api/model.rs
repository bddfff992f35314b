//! Request and response models for the HTTP API
//!
//! Wire shapes use camelCase field names. Ratings leave the API rounded
//! to the nearest integer; exact values stay internal to the store.

use crate::types::{PilotProfile, RaceId, RaceOutcome, RaceResult, RatingChange};
use crate::utils;
use serde::{Deserialize, Serialize};

/// Pilot registration or profile update request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PilotRegistration {
    pub license_number: String,
    pub first_name: String,
    pub last_name: String,
    pub pseudo: String,
}

impl PilotRegistration {
    pub fn into_profile(self) -> PilotProfile {
        PilotProfile {
            license_number: self.license_number,
            first_name: self.first_name,
            last_name: self.last_name,
            pseudo: self.pseudo,
        }
    }
}

/// Race result submission
///
/// The race id comes from the client so that a retried submission is
/// recognized as the same race.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceSubmission {
    pub race_id: RaceId,
    /// Pilot ids ordered first place to last
    pub finishing_order: Vec<i64>,
}

impl RaceSubmission {
    pub fn into_result(self) -> RaceResult {
        RaceResult::new(self.race_id, self.finishing_order)
    }
}

/// Per-pilot rating movement in an applied race
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingChangeModel {
    pub pilot_id: i64,
    pub old_elo: i64,
    pub new_elo: i64,
    pub delta: f64,
    pub position: u32,
}

impl From<&RatingChange> for RatingChangeModel {
    fn from(change: &RatingChange) -> Self {
        Self {
            pilot_id: change.pilot_id,
            old_elo: utils::round_for_display(change.old_elo),
            new_elo: utils::round_for_display(change.new_elo),
            delta: change.delta,
            position: change.position,
        }
    }
}

/// Outcome of a race submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceOutcomeModel {
    pub race_id: RaceId,
    pub status: String,
    pub changes: Vec<RatingChangeModel>,
}

impl From<&RaceOutcome> for RaceOutcomeModel {
    fn from(outcome: &RaceOutcome) -> Self {
        match outcome {
            RaceOutcome::Applied { race_id, changes } => Self {
                race_id: *race_id,
                status: "applied".to_string(),
                changes: changes.iter().map(RatingChangeModel::from).collect(),
            },
            RaceOutcome::AlreadyApplied { race_id } => Self {
                race_id: *race_id,
                status: "already_applied".to_string(),
                changes: Vec::new(),
            },
        }
    }
}

/// Query parameters for ranking requests
#[derive(Debug, Clone, Deserialize)]
pub struct RankingParams {
    pub minimum_races: Option<u32>,
}
