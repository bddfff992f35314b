//! Rating engine orchestration
//!
//! `RatingEngine` ties the store and the calculator together: it validates
//! incoming race results, snapshots the entrants, computes rating deltas
//! from pre-race state and commits them atomically. Replayed races are
//! detected by race id and ignored. A submission lock serializes race
//! applications so the snapshot a computation ran on is the state its
//! commit lands on.

use crate::error::{RankingError, Result};
use crate::metrics::MetricsCollector;
use crate::ranking::standings;
use crate::rating::calculator::RaceCalculator;
use crate::rating::store::RatingStore;
use crate::types::{
    CommitOutcome, Pilot, PilotStanding, RaceOutcome, RaceResult, RatingUpdate,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;
use tracing::{info, warn};

/// Running totals for engine activity
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    pub races_processed: u64,
    pub races_replayed: u64,
    pub races_rejected: u64,
    pub ranking_queries: u64,
}

/// Orchestrates race processing and ranking queries
#[derive(Clone)]
pub struct RatingEngine {
    store: Arc<dyn RatingStore>,
    calculator: Arc<dyn RaceCalculator>,
    stats: Arc<RwLock<EngineStats>>,
    metrics_collector: Arc<MetricsCollector>,
    // Serializes submissions so snapshot and commit see the same state
    submission_lock: Arc<Mutex<()>>,
}

impl RatingEngine {
    pub fn new(store: Arc<dyn RatingStore>, calculator: Arc<dyn RaceCalculator>) -> Self {
        let metrics_collector = Arc::new(MetricsCollector::new().unwrap_or_else(|e| {
            warn!("Failed to create metrics collector: {}, using default", e);
            MetricsCollector::default()
        }));

        Self::with_metrics(store, calculator, metrics_collector)
    }

    pub fn with_metrics(
        store: Arc<dyn RatingStore>,
        calculator: Arc<dyn RaceCalculator>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            store,
            calculator,
            stats: Arc::new(RwLock::new(EngineStats::default())),
            metrics_collector,
            submission_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Apply a race result to the standings
    ///
    /// Replays of an already applied race id succeed without touching any
    /// rating. Invalid races are rejected before the store is consulted.
    pub fn process_race(&self, race: &RaceResult) -> Result<RaceOutcome> {
        let start_time = Instant::now();

        info!(
            "Processing race {} with {} finishers",
            race.race_id,
            race.finishing_order.len()
        );

        let result = self.apply_race(race);
        let duration = start_time.elapsed();

        match &result {
            Ok(RaceOutcome::Applied { changes, .. }) => {
                if let Ok(mut stats) = self.stats.write() {
                    stats.races_processed += 1;
                }
                self.metrics_collector
                    .record_race_processed(duration, changes.len());
                for change in changes {
                    self.metrics_collector.record_rating(change.new_elo);
                }
                info!(
                    "Race {} applied - finishers: {}, duration: {:.2}ms",
                    race.race_id,
                    changes.len(),
                    duration.as_secs_f64() * 1000.0
                );
            }
            Ok(RaceOutcome::AlreadyApplied { .. }) => {
                if let Ok(mut stats) = self.stats.write() {
                    stats.races_replayed += 1;
                }
                self.metrics_collector.record_race_replayed();
                info!("Race {} already applied, ratings unchanged", race.race_id);
            }
            Err(e) => {
                if let Ok(mut stats) = self.stats.write() {
                    stats.races_rejected += 1;
                }
                self.metrics_collector.record_race_rejected(rejection_label(e));
                warn!("Race {} rejected: {}", race.race_id, e);
            }
        }

        result
    }

    fn apply_race(&self, race: &RaceResult) -> Result<RaceOutcome> {
        validate_race(race)?;

        let _guard = self.submission_lock.lock().map_err(|_| {
            RankingError::InternalError {
                message: "Failed to acquire submission lock".to_string(),
            }
        })?;

        if self.store.race_applied(race.race_id)? {
            return Ok(RaceOutcome::AlreadyApplied {
                race_id: race.race_id,
            });
        }

        // Pre-race snapshot: every pairwise expectation is computed from
        // ratings as they stood before the race
        let entrants = self.store.snapshot_pilots(&race.finishing_order)?;

        let calc_start = Instant::now();
        let changes = self.calculator.calculate_race_deltas(&entrants)?;
        self.metrics_collector
            .record_rating_calculation(calc_start.elapsed());

        let updates: Vec<RatingUpdate> = entrants
            .iter()
            .zip(changes.iter())
            .map(|(pilot, change)| RatingUpdate {
                pilot_id: change.pilot_id,
                new_elo: change.new_elo,
                new_races_completed: pilot.races_completed + 1,
            })
            .collect();

        match self.store.apply_rating_updates(&updates, race.race_id)? {
            CommitOutcome::Applied => Ok(RaceOutcome::Applied {
                race_id: race.race_id,
                changes,
            }),
            // A replay that slipped past the fast-path check lands here
            CommitOutcome::AlreadyApplied => Ok(RaceOutcome::AlreadyApplied {
                race_id: race.race_id,
            }),
        }
    }

    /// Rank pilots with at least `minimum_races` completed races, best
    /// rating first, exact ratings preserved
    pub fn rank_pilots(&self, minimum_races: u32) -> Result<Vec<Pilot>> {
        let start_time = Instant::now();

        let pilots = self.store.list_pilots()?;
        let ranked = standings::rank_pilots(pilots, minimum_races);

        if let Ok(mut stats) = self.stats.write() {
            stats.ranking_queries += 1;
        }
        self.metrics_collector
            .record_ranking_query(start_time.elapsed());

        Ok(ranked)
    }

    /// Ranking as the rounded transfer view
    pub fn standings(&self, minimum_races: u32) -> Result<Vec<PilotStanding>> {
        let ranked = self.rank_pilots(minimum_races)?;
        Ok(standings::build_standings(&ranked))
    }

    pub fn get_stats(&self) -> Result<EngineStats> {
        let stats = self.stats.read().map_err(|_| RankingError::InternalError {
            message: "Failed to acquire stats lock".to_string(),
        })?;
        Ok(stats.clone())
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics_collector.clone()
    }
}

/// Structural checks that need no store access
fn validate_race(race: &RaceResult) -> Result<()> {
    if race.finishing_order.len() < 2 {
        return Err(RankingError::InvalidRace {
            reason: "A race needs at least two finishers".to_string(),
        }
        .into());
    }

    let mut seen = HashSet::new();
    for pilot_id in &race.finishing_order {
        if !seen.insert(*pilot_id) {
            return Err(RankingError::InvalidRace {
                reason: format!("Pilot {} appears more than once", pilot_id),
            }
            .into());
        }
    }

    Ok(())
}

fn rejection_label(error: &anyhow::Error) -> &'static str {
    match error.downcast_ref::<RankingError>() {
        Some(RankingError::InvalidRace { .. }) => "invalid_race",
        Some(RankingError::PilotNotFound { .. }) => "unknown_pilot",
        Some(RankingError::UpdateConflict { .. }) => "conflict",
        Some(RankingError::StoreUnavailable { .. }) => "store_unavailable",
        _ => "internal",
    }
}
