//! Common types used throughout the ranking service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for pilots
pub type PilotId = i64;

/// Unique identifier for races
pub type RaceId = Uuid;

/// Descriptive pilot data, set at registration and mutable only through
/// administrative updates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PilotProfile {
    pub license_number: String,
    pub first_name: String,
    pub last_name: String,
    pub pseudo: String,
}

/// A pilot as held by the rating store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pilot {
    pub id: PilotId,
    pub license_number: String,
    pub first_name: String,
    pub last_name: String,
    pub pseudo: String,
    /// Current rating, mutated only by the rating engine
    pub elo: f64,
    /// Number of races applied to this pilot, incremented once per race
    pub races_completed: u32,
    pub created_at: DateTime<Utc>,
    pub last_race_at: Option<DateTime<Utc>>,
}

impl Pilot {
    /// Create a freshly registered pilot with the given initial rating
    pub fn new(id: PilotId, profile: PilotProfile, initial_elo: f64) -> Self {
        Self {
            id,
            license_number: profile.license_number,
            first_name: profile.first_name,
            last_name: profile.last_name,
            pseudo: profile.pseudo,
            elo: initial_elo,
            races_completed: 0,
            created_at: crate::utils::current_timestamp(),
            last_race_at: None,
        }
    }
}

/// The finishing order of a completed race, first entry is the winner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceResult {
    /// Idempotence key: submitting the same race id twice is a no-op
    pub race_id: RaceId,
    pub finishing_order: Vec<PilotId>,
    pub recorded_at: DateTime<Utc>,
}

impl RaceResult {
    pub fn new(race_id: RaceId, finishing_order: Vec<PilotId>) -> Self {
        Self {
            race_id,
            finishing_order,
            recorded_at: crate::utils::current_timestamp(),
        }
    }
}

/// Rating change information for a single pilot in a race
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingChange {
    pub pilot_id: PilotId,
    pub old_elo: f64,
    pub new_elo: f64,
    pub delta: f64,
    /// Finishing position, 1 is the winner
    pub position: u32,
}

/// Commit payload handed to the rating store after a race is computed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingUpdate {
    pub pilot_id: PilotId,
    pub new_elo: f64,
    /// Expected post-commit race count; the predecessor count acts as an
    /// optimistic version for conflict detection
    pub new_races_completed: u32,
}

/// Result of committing rating updates to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    /// The race id was seen before, nothing was changed
    AlreadyApplied,
}

/// Result of processing a race through the rating engine
#[derive(Debug, Clone)]
pub enum RaceOutcome {
    Applied {
        race_id: RaceId,
        changes: Vec<RatingChange>,
    },
    AlreadyApplied {
        race_id: RaceId,
    },
}

impl RaceOutcome {
    pub fn race_id(&self) -> RaceId {
        match self {
            RaceOutcome::Applied { race_id, .. } => *race_id,
            RaceOutcome::AlreadyApplied { race_id } => *race_id,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, RaceOutcome::Applied { .. })
    }
}

/// Transfer shape returned by ranking queries, rating rounded for display
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PilotStanding {
    pub id: PilotId,
    pub license_number: String,
    pub first_name: String,
    pub last_name: String,
    pub pseudo: String,
    pub elo: i64,
}

impl From<&Pilot> for PilotStanding {
    fn from(pilot: &Pilot) -> Self {
        Self {
            id: pilot.id,
            license_number: pilot.license_number.clone(),
            first_name: pilot.first_name.clone(),
            last_name: pilot.last_name.clone(),
            pseudo: pilot.pseudo.clone(),
            elo: crate::utils::round_for_display(pilot.elo),
        }
    }
}
