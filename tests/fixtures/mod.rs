//! Test fixtures and helpers for integration testing

use paddock::config::AppConfig;
use paddock::service::AppState;
use paddock::types::{PilotProfile, RaceResult};
use std::sync::Arc;
use uuid::Uuid;

/// Realistic pilot roster used across integration tests
pub fn sample_roster() -> Vec<PilotProfile> {
    vec![
        ("FR-2024-0117", "Lea", "Moreau", "swift"),
        ("FR-2024-0214", "Noa", "Garnier", "apex"),
        ("BE-2023-0042", "Milan", "Peeters", "latebrake"),
        ("FR-2022-0771", "Camille", "Roche", "slipstream"),
        ("CH-2024-0008", "Elia", "Baumann", "chicane"),
        ("FR-2023-0390", "Sacha", "Delorme", "hairpin"),
        ("IT-2024-0155", "Luca", "Ferri", "tifoso"),
        ("FR-2024-0520", "Jules", "Arnaud", "undercut"),
    ]
    .into_iter()
    .map(|(license, first, last, pseudo)| PilotProfile {
        license_number: license.to_string(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        pseudo: pseudo.to_string(),
    })
    .collect()
}

/// Create a started application state with default configuration
pub async fn create_test_state() -> Arc<AppState> {
    create_test_state_with_config(AppConfig::default()).await
}

/// Create a started application state with the given configuration
pub async fn create_test_state_with_config(config: AppConfig) -> Arc<AppState> {
    let state = Arc::new(AppState::new(config).expect("Failed to create app state"));
    state.start().await.expect("Failed to start app state");
    state
}

/// Register the first `count` roster pilots and return their ids
pub fn register_pilots(state: &AppState, count: usize) -> Vec<i64> {
    sample_roster()
        .into_iter()
        .take(count)
        .map(|profile| {
            state
                .store()
                .register_pilot(profile)
                .expect("Failed to register pilot")
                .id
        })
        .collect()
}

/// Build a race result with a fresh id
pub fn race(finishing_order: Vec<i64>) -> RaceResult {
    RaceResult::new(Uuid::new_v4(), finishing_order)
}
