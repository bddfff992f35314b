//! Rating store interface and implementations
//!
//! This module defines the interface for persisting and retrieving pilot
//! records, with an in-memory implementation that can mirror itself into a
//! JSON snapshot file after every committed change.

use crate::error::RankingError;
use crate::types::{CommitOutcome, Pilot, PilotId, PilotProfile, RaceId, RatingUpdate};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

/// Snapshot document format version
const SNAPSHOT_VERSION: u32 = 1;

/// Trait for rating store operations
///
/// Implementations must apply multi-pilot updates atomically: either every
/// update of a race commits or none does, and a race id is only ever
/// applied once.
pub trait RatingStore: Send + Sync {
    /// Register a new pilot, assigning the next id and the initial rating
    fn register_pilot(&self, profile: PilotProfile) -> crate::error::Result<Pilot>;

    /// Get a single pilot
    fn get_pilot(&self, pilot_id: PilotId) -> crate::error::Result<Option<Pilot>>;

    /// Get all pilots (unordered)
    fn list_pilots(&self) -> crate::error::Result<Vec<Pilot>>;

    /// Read multiple pilots from one consistent snapshot, in the given
    /// order; fails if any id is unknown
    fn snapshot_pilots(&self, pilot_ids: &[PilotId]) -> crate::error::Result<Vec<Pilot>>;

    /// Commit all rating updates of a race atomically
    ///
    /// Replaying an already-applied race id is a no-op reported as
    /// `CommitOutcome::AlreadyApplied`. A pilot whose race count moved
    /// since the updates were computed fails the whole commit with an
    /// `UpdateConflict` error.
    fn apply_rating_updates(
        &self,
        updates: &[RatingUpdate],
        race_id: RaceId,
    ) -> crate::error::Result<CommitOutcome>;

    /// Administrative update of the descriptive fields only
    fn update_profile(&self, pilot_id: PilotId, profile: PilotProfile)
        -> crate::error::Result<Pilot>;

    /// Whether a race id has already been applied
    fn race_applied(&self, race_id: RaceId) -> crate::error::Result<bool>;

    /// Total number of registered pilots
    fn pilot_count(&self) -> crate::error::Result<usize>;

    /// Total number of applied races
    fn race_count(&self) -> crate::error::Result<usize>;

    /// Persist the current state if a snapshot file is configured
    fn flush(&self) -> crate::error::Result<()>;
}

/// Everything the store guards behind a single lock, so commits are atomic
/// and readers always observe a consistent snapshot
#[derive(Debug)]
struct StoreState {
    pilots: HashMap<PilotId, Pilot>,
    applied_races: HashSet<RaceId>,
    next_pilot_id: PilotId,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            pilots: HashMap::new(),
            applied_races: HashSet::new(),
            next_pilot_id: 1,
        }
    }
}

/// On-disk snapshot document
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDocument {
    version: u32,
    next_pilot_id: PilotId,
    pilots: Vec<Pilot>,
    applied_races: Vec<RaceId>,
}

/// In-memory rating store, optionally mirrored into a JSON snapshot file
#[derive(Debug)]
pub struct InMemoryRatingStore {
    state: RwLock<StoreState>,
    initial_rating: f64,
    snapshot_path: Option<PathBuf>,
}

impl InMemoryRatingStore {
    /// Create a new in-memory rating store
    pub fn new(initial_rating: f64) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            initial_rating,
            snapshot_path: None,
        }
    }

    /// Create a store backed by a JSON snapshot file
    ///
    /// The snapshot is loaded at construction (a missing file means an
    /// empty store) and rewritten after every committed change.
    pub fn with_snapshot(initial_rating: f64, path: PathBuf) -> crate::error::Result<Self> {
        let state = match Self::load_snapshot(&path)? {
            Some(state) => {
                info!(
                    pilots = state.pilots.len(),
                    races = state.applied_races.len(),
                    "Loaded rating snapshot from {}",
                    path.display()
                );
                state
            }
            None => {
                info!("No rating snapshot at {}, starting empty", path.display());
                StoreState::default()
            }
        };

        Ok(Self {
            state: RwLock::new(state),
            initial_rating,
            snapshot_path: Some(path),
        })
    }

    fn read_state(&self) -> crate::error::Result<RwLockReadGuard<'_, StoreState>> {
        self.state.read().map_err(|_| {
            RankingError::InternalError {
                message: "Failed to acquire store read lock".to_string(),
            }
            .into()
        })
    }

    fn write_state(&self) -> crate::error::Result<RwLockWriteGuard<'_, StoreState>> {
        self.state.write().map_err(|_| {
            RankingError::InternalError {
                message: "Failed to acquire store write lock".to_string(),
            }
            .into()
        })
    }

    fn load_snapshot(path: &Path) -> crate::error::Result<Option<StoreState>> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path).map_err(|err| RankingError::StoreUnavailable {
            message: format!("Failed to read snapshot {}: {}", path.display(), err),
        })?;
        let document: SnapshotDocument =
            serde_json::from_str(&contents).map_err(|err| RankingError::StoreUnavailable {
                message: format!("Failed to parse snapshot {}: {}", path.display(), err),
            })?;
        if document.version != SNAPSHOT_VERSION {
            return Err(RankingError::StoreUnavailable {
                message: format!("Unsupported snapshot version: {}", document.version),
            }
            .into());
        }

        Ok(Some(StoreState {
            next_pilot_id: document.next_pilot_id,
            pilots: document
                .pilots
                .into_iter()
                .map(|pilot| (pilot.id, pilot))
                .collect(),
            applied_races: document.applied_races.into_iter().collect(),
        }))
    }

    /// Rewrite the snapshot file from the given state, via a temporary
    /// file and rename so a crash never leaves a half-written snapshot
    fn persist_if_configured(&self, state: &StoreState) -> crate::error::Result<()> {
        let path = match &self.snapshot_path {
            Some(path) => path,
            None => return Ok(()),
        };

        let mut pilots: Vec<Pilot> = state.pilots.values().cloned().collect();
        pilots.sort_by_key(|pilot| pilot.id);
        let document = SnapshotDocument {
            version: SNAPSHOT_VERSION,
            next_pilot_id: state.next_pilot_id,
            pilots,
            applied_races: state.applied_races.iter().copied().collect(),
        };

        let serialized = serde_json::to_string_pretty(&document).map_err(|err| {
            RankingError::StoreUnavailable {
                message: format!("Failed to serialize snapshot: {}", err),
            }
        })?;
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, serialized).map_err(|err| RankingError::StoreUnavailable {
            message: format!("Failed to write snapshot {}: {}", tmp_path.display(), err),
        })?;
        fs::rename(&tmp_path, path).map_err(|err| RankingError::StoreUnavailable {
            message: format!("Failed to move snapshot into place: {}", err),
        })?;

        Ok(())
    }
}

impl Default for InMemoryRatingStore {
    fn default() -> Self {
        Self::new(1000.0)
    }
}

impl RatingStore for InMemoryRatingStore {
    fn register_pilot(&self, profile: PilotProfile) -> crate::error::Result<Pilot> {
        validate_profile(&profile)?;

        let mut state = self.write_state()?;
        if state
            .pilots
            .values()
            .any(|pilot| pilot.license_number == profile.license_number)
        {
            return Err(RankingError::InvalidPilot {
                reason: format!(
                    "License number already registered: {}",
                    profile.license_number
                ),
            }
            .into());
        }

        let pilot_id = state.next_pilot_id;
        let pilot = Pilot::new(pilot_id, profile, self.initial_rating);
        state.next_pilot_id += 1;
        state.pilots.insert(pilot_id, pilot.clone());

        if let Err(err) = self.persist_if_configured(&state) {
            state.pilots.remove(&pilot_id);
            state.next_pilot_id = pilot_id;
            return Err(err);
        }

        Ok(pilot)
    }

    fn get_pilot(&self, pilot_id: PilotId) -> crate::error::Result<Option<Pilot>> {
        let state = self.read_state()?;
        Ok(state.pilots.get(&pilot_id).cloned())
    }

    fn list_pilots(&self) -> crate::error::Result<Vec<Pilot>> {
        let state = self.read_state()?;
        Ok(state.pilots.values().cloned().collect())
    }

    fn snapshot_pilots(&self, pilot_ids: &[PilotId]) -> crate::error::Result<Vec<Pilot>> {
        let state = self.read_state()?;

        let mut pilots = Vec::with_capacity(pilot_ids.len());
        for pilot_id in pilot_ids {
            let pilot = state
                .pilots
                .get(pilot_id)
                .ok_or(RankingError::PilotNotFound {
                    pilot_id: *pilot_id,
                })?;
            pilots.push(pilot.clone());
        }

        Ok(pilots)
    }

    fn apply_rating_updates(
        &self,
        updates: &[RatingUpdate],
        race_id: RaceId,
    ) -> crate::error::Result<CommitOutcome> {
        let mut state = self.write_state()?;

        if state.applied_races.contains(&race_id) {
            return Ok(CommitOutcome::AlreadyApplied);
        }

        // Validate every update before touching anything
        for update in updates {
            let pilot = state
                .pilots
                .get(&update.pilot_id)
                .ok_or(RankingError::PilotNotFound {
                    pilot_id: update.pilot_id,
                })?;

            let expected_previous = match update.new_races_completed.checked_sub(1) {
                Some(value) => value,
                None => {
                    return Err(RankingError::UpdateConflict {
                        race_id: race_id.to_string(),
                        reason: "post-race count must be at least 1".to_string(),
                    }
                    .into());
                }
            };
            if pilot.races_completed != expected_previous {
                return Err(RankingError::UpdateConflict {
                    race_id: race_id.to_string(),
                    reason: format!(
                        "pilot {} has {} races, update expected {}",
                        update.pilot_id, pilot.races_completed, expected_previous
                    ),
                }
                .into());
            }
        }

        let now = crate::utils::current_timestamp();
        let mut previous = Vec::with_capacity(updates.len());
        for update in updates {
            let pilot = state
                .pilots
                .get_mut(&update.pilot_id)
                .ok_or(RankingError::PilotNotFound {
                    pilot_id: update.pilot_id,
                })?;
            previous.push(pilot.clone());
            pilot.elo = update.new_elo;
            pilot.races_completed = update.new_races_completed;
            pilot.last_race_at = Some(now);
        }
        state.applied_races.insert(race_id);

        if let Err(err) = self.persist_if_configured(&state) {
            // Roll the commit back so memory and disk stay in agreement
            for pilot in previous {
                state.pilots.insert(pilot.id, pilot);
            }
            state.applied_races.remove(&race_id);
            return Err(err);
        }

        Ok(CommitOutcome::Applied)
    }

    fn update_profile(
        &self,
        pilot_id: PilotId,
        profile: PilotProfile,
    ) -> crate::error::Result<Pilot> {
        validate_profile(&profile)?;

        let mut state = self.write_state()?;
        if state
            .pilots
            .values()
            .any(|pilot| pilot.id != pilot_id && pilot.license_number == profile.license_number)
        {
            return Err(RankingError::InvalidPilot {
                reason: format!(
                    "License number already registered: {}",
                    profile.license_number
                ),
            }
            .into());
        }

        let pilot = state
            .pilots
            .get_mut(&pilot_id)
            .ok_or(RankingError::PilotNotFound { pilot_id })?;
        let before = pilot.clone();
        pilot.license_number = profile.license_number;
        pilot.first_name = profile.first_name;
        pilot.last_name = profile.last_name;
        pilot.pseudo = profile.pseudo;
        let updated = pilot.clone();

        if let Err(err) = self.persist_if_configured(&state) {
            state.pilots.insert(pilot_id, before);
            return Err(err);
        }

        Ok(updated)
    }

    fn race_applied(&self, race_id: RaceId) -> crate::error::Result<bool> {
        let state = self.read_state()?;
        Ok(state.applied_races.contains(&race_id))
    }

    fn pilot_count(&self) -> crate::error::Result<usize> {
        let state = self.read_state()?;
        Ok(state.pilots.len())
    }

    fn race_count(&self) -> crate::error::Result<usize> {
        let state = self.read_state()?;
        Ok(state.applied_races.len())
    }

    fn flush(&self) -> crate::error::Result<()> {
        let state = self.read_state()?;
        self.persist_if_configured(&state)
    }
}

fn validate_profile(profile: &PilotProfile) -> crate::error::Result<()> {
    if profile.license_number.trim().is_empty() {
        return Err(RankingError::InvalidPilot {
            reason: "License number cannot be empty".to_string(),
        }
        .into());
    }
    if profile.pseudo.trim().is_empty() {
        return Err(RankingError::InvalidPilot {
            reason: "Pseudo cannot be empty".to_string(),
        }
        .into());
    }
    Ok(())
}

/// Mock rating store for testing, records every commit it receives
#[derive(Debug, Default)]
pub struct MockRatingStore {
    inner: InMemoryRatingStore,
    apply_calls: RwLock<Vec<(RaceId, Vec<RatingUpdate>)>>,
}

impl MockRatingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all apply calls made (for testing)
    pub fn get_apply_calls(&self) -> Vec<(RaceId, Vec<RatingUpdate>)> {
        self.apply_calls
            .read()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Clear recorded apply calls (for testing)
    pub fn clear_apply_calls(&self) {
        if let Ok(mut calls) = self.apply_calls.write() {
            calls.clear();
        }
    }
}

impl RatingStore for MockRatingStore {
    fn register_pilot(&self, profile: PilotProfile) -> crate::error::Result<Pilot> {
        self.inner.register_pilot(profile)
    }

    fn get_pilot(&self, pilot_id: PilotId) -> crate::error::Result<Option<Pilot>> {
        self.inner.get_pilot(pilot_id)
    }

    fn list_pilots(&self) -> crate::error::Result<Vec<Pilot>> {
        self.inner.list_pilots()
    }

    fn snapshot_pilots(&self, pilot_ids: &[PilotId]) -> crate::error::Result<Vec<Pilot>> {
        self.inner.snapshot_pilots(pilot_ids)
    }

    fn apply_rating_updates(
        &self,
        updates: &[RatingUpdate],
        race_id: RaceId,
    ) -> crate::error::Result<CommitOutcome> {
        // Record the call for testing
        if let Ok(mut calls) = self.apply_calls.write() {
            calls.push((race_id, updates.to_vec()));
        }
        self.inner.apply_rating_updates(updates, race_id)
    }

    fn update_profile(
        &self,
        pilot_id: PilotId,
        profile: PilotProfile,
    ) -> crate::error::Result<Pilot> {
        self.inner.update_profile(pilot_id, profile)
    }

    fn race_applied(&self, race_id: RaceId) -> crate::error::Result<bool> {
        self.inner.race_applied(race_id)
    }

    fn pilot_count(&self) -> crate::error::Result<usize> {
        self.inner.pilot_count()
    }

    fn race_count(&self) -> crate::error::Result<usize> {
        self.inner.race_count()
    }

    fn flush(&self) -> crate::error::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::generate_race_id;

    fn test_profile(license: &str, pseudo: &str) -> PilotProfile {
        PilotProfile {
            license_number: license.to_string(),
            first_name: "Test".to_string(),
            last_name: "Pilot".to_string(),
            pseudo: pseudo.to_string(),
        }
    }

    fn update_for(pilot: &Pilot, new_elo: f64) -> RatingUpdate {
        RatingUpdate {
            pilot_id: pilot.id,
            new_elo,
            new_races_completed: pilot.races_completed + 1,
        }
    }

    #[test]
    fn test_register_assigns_sequential_ids_and_defaults() {
        let store = InMemoryRatingStore::new(1000.0);

        let first = store.register_pilot(test_profile("FR-001", "Maverick")).unwrap();
        let second = store.register_pilot(test_profile("FR-002", "Goose")).unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.elo, 1000.0);
        assert_eq!(first.races_completed, 0);
        assert!(first.last_race_at.is_none());
        assert_eq!(store.pilot_count().unwrap(), 2);
    }

    #[test]
    fn test_register_rejects_blank_and_duplicate_license() {
        let store = InMemoryRatingStore::new(1000.0);

        assert!(store.register_pilot(test_profile("", "Maverick")).is_err());
        assert!(store.register_pilot(test_profile("FR-001", "  ")).is_err());

        store.register_pilot(test_profile("FR-001", "Maverick")).unwrap();
        let duplicate = store.register_pilot(test_profile("FR-001", "Impostor"));
        assert!(duplicate.is_err());
        assert_eq!(store.pilot_count().unwrap(), 1);
    }

    #[test]
    fn test_get_and_list_pilots() {
        let store = InMemoryRatingStore::new(1000.0);
        let pilot = store.register_pilot(test_profile("FR-001", "Maverick")).unwrap();

        let fetched = store.get_pilot(pilot.id).unwrap().unwrap();
        assert_eq!(fetched.pseudo, "Maverick");
        assert!(store.get_pilot(99).unwrap().is_none());

        store.register_pilot(test_profile("FR-002", "Goose")).unwrap();
        assert_eq!(store.list_pilots().unwrap().len(), 2);
    }

    #[test]
    fn test_update_profile_keeps_rating_state() {
        let store = InMemoryRatingStore::new(1000.0);
        let pilot = store.register_pilot(test_profile("FR-001", "Maverick")).unwrap();

        store
            .apply_rating_updates(&[update_for(&pilot, 1016.0)], generate_race_id())
            .unwrap();

        let updated = store
            .update_profile(pilot.id, test_profile("FR-100", "Iceman"))
            .unwrap();
        assert_eq!(updated.license_number, "FR-100");
        assert_eq!(updated.pseudo, "Iceman");
        assert_eq!(updated.elo, 1016.0);
        assert_eq!(updated.races_completed, 1);

        assert!(store.update_profile(42, test_profile("FR-200", "Ghost")).is_err());
    }

    #[test]
    fn test_snapshot_pilots_fails_on_unknown_id() {
        let store = InMemoryRatingStore::new(1000.0);
        let pilot = store.register_pilot(test_profile("FR-001", "Maverick")).unwrap();

        let snapshot = store.snapshot_pilots(&[pilot.id]).unwrap();
        assert_eq!(snapshot.len(), 1);

        let missing = store.snapshot_pilots(&[pilot.id, 42]);
        assert!(missing.is_err());
    }

    #[test]
    fn test_apply_updates_commits_all_pilots() {
        let store = InMemoryRatingStore::new(1000.0);
        let a = store.register_pilot(test_profile("FR-001", "Maverick")).unwrap();
        let b = store.register_pilot(test_profile("FR-002", "Goose")).unwrap();

        let race_id = generate_race_id();
        let outcome = store
            .apply_rating_updates(&[update_for(&a, 1016.0), update_for(&b, 984.0)], race_id)
            .unwrap();
        assert_eq!(outcome, CommitOutcome::Applied);

        let a = store.get_pilot(a.id).unwrap().unwrap();
        let b = store.get_pilot(b.id).unwrap().unwrap();
        assert_eq!(a.elo, 1016.0);
        assert_eq!(b.elo, 984.0);
        assert_eq!(a.races_completed, 1);
        assert_eq!(b.races_completed, 1);
        assert!(a.last_race_at.is_some());
        assert!(store.race_applied(race_id).unwrap());
        assert_eq!(store.race_count().unwrap(), 1);
    }

    #[test]
    fn test_apply_updates_replay_is_noop() {
        let store = InMemoryRatingStore::new(1000.0);
        let a = store.register_pilot(test_profile("FR-001", "Maverick")).unwrap();
        let b = store.register_pilot(test_profile("FR-002", "Goose")).unwrap();

        let race_id = generate_race_id();
        let updates = vec![update_for(&a, 1016.0), update_for(&b, 984.0)];
        store.apply_rating_updates(&updates, race_id).unwrap();

        // Replaying the same race id changes nothing
        let replay = store.apply_rating_updates(&updates, race_id).unwrap();
        assert_eq!(replay, CommitOutcome::AlreadyApplied);

        let a = store.get_pilot(a.id).unwrap().unwrap();
        assert_eq!(a.elo, 1016.0);
        assert_eq!(a.races_completed, 1);
        assert_eq!(store.race_count().unwrap(), 1);
    }

    #[test]
    fn test_apply_updates_unknown_pilot_has_no_partial_effect() {
        let store = InMemoryRatingStore::new(1000.0);
        let a = store.register_pilot(test_profile("FR-001", "Maverick")).unwrap();

        let race_id = generate_race_id();
        let updates = vec![
            update_for(&a, 1016.0),
            RatingUpdate {
                pilot_id: 42,
                new_elo: 984.0,
                new_races_completed: 1,
            },
        ];
        assert!(store.apply_rating_updates(&updates, race_id).is_err());

        let a = store.get_pilot(a.id).unwrap().unwrap();
        assert_eq!(a.elo, 1000.0);
        assert_eq!(a.races_completed, 0);
        assert!(!store.race_applied(race_id).unwrap());
    }

    #[test]
    fn test_apply_updates_detects_stale_race_count() {
        let store = InMemoryRatingStore::new(1000.0);
        let a = store.register_pilot(test_profile("FR-001", "Maverick")).unwrap();
        let b = store.register_pilot(test_profile("FR-002", "Goose")).unwrap();

        // Commit one race normally
        store
            .apply_rating_updates(&[update_for(&a, 1016.0), update_for(&b, 984.0)], generate_race_id())
            .unwrap();

        // A second commit computed from the pre-race snapshot must conflict
        let stale = store.apply_rating_updates(
            &[update_for(&a, 1030.0), update_for(&b, 970.0)],
            generate_race_id(),
        );
        assert!(stale.is_err());

        let a = store.get_pilot(a.id).unwrap().unwrap();
        assert_eq!(a.elo, 1016.0);
        assert_eq!(a.races_completed, 1);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let path = std::env::temp_dir().join(format!("paddock-store-{}.json", uuid::Uuid::new_v4()));

        {
            let store = InMemoryRatingStore::with_snapshot(1000.0, path.clone()).unwrap();
            let a = store.register_pilot(test_profile("FR-001", "Maverick")).unwrap();
            let b = store.register_pilot(test_profile("FR-002", "Goose")).unwrap();
            store
                .apply_rating_updates(
                    &[update_for(&a, 1016.0), update_for(&b, 984.0)],
                    generate_race_id(),
                )
                .unwrap();
        }

        let reopened = InMemoryRatingStore::with_snapshot(1000.0, path.clone()).unwrap();
        assert_eq!(reopened.pilot_count().unwrap(), 2);
        assert_eq!(reopened.race_count().unwrap(), 1);
        let a = reopened.get_pilot(1).unwrap().unwrap();
        assert_eq!(a.elo, 1016.0);

        // New registrations continue from the persisted id sequence
        let c = reopened.register_pilot(test_profile("FR-003", "Viper")).unwrap();
        assert_eq!(c.id, 3);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_snapshot_missing_file_starts_empty() {
        let path = std::env::temp_dir().join(format!("paddock-missing-{}.json", uuid::Uuid::new_v4()));
        let store = InMemoryRatingStore::with_snapshot(1000.0, path.clone()).unwrap();
        assert_eq!(store.pilot_count().unwrap(), 0);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_mock_store_records_apply_calls() {
        let store = MockRatingStore::new();
        let a = store.register_pilot(test_profile("FR-001", "Maverick")).unwrap();
        let b = store.register_pilot(test_profile("FR-002", "Goose")).unwrap();

        let race_id = generate_race_id();
        store
            .apply_rating_updates(&[update_for(&a, 1016.0), update_for(&b, 984.0)], race_id)
            .unwrap();

        let calls = store.get_apply_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, race_id);
        assert_eq!(calls[0].1.len(), 2);

        store.clear_apply_calls();
        assert!(store.get_apply_calls().is_empty());
    }
}
