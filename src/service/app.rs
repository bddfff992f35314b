//! Main application state and service coordination
//!
//! This module wires the rating store, the calculator and the rating
//! engine together into the state the HTTP layer serves from.

use crate::config::AppConfig;
use crate::metrics::MetricsCollector;
use crate::ranking::RatingEngine;
use crate::rating::elo::{EloRaceCalculator, ExtendedEloConfig};
use crate::rating::store::{InMemoryRatingStore, RatingStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Shutdown error: {message}")]
    Shutdown { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Rating store holding pilots and applied race ids
    store: Arc<dyn RatingStore>,

    /// Rating engine for race processing and ranking queries
    engine: Arc<RatingEngine>,

    /// Metrics collector shared with the engine
    metrics_collector: Arc<MetricsCollector>,

    /// Service status
    is_running: Arc<RwLock<bool>>,

    /// Startup instant for uptime reporting
    started_at: Instant,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing paddock ranking service");
        info!(
            "Configuration: service={}, k_factor={}, default_rating={}",
            config.service.name, config.rating.k_factor, config.rating.default_rating
        );

        crate::config::validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: e.to_string(),
        })?;

        let metrics_collector =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let store = Self::initialize_store(&config)?;
        let engine = Self::initialize_engine(&config, store.clone(), metrics_collector.clone())?;

        Ok(Self {
            config,
            store,
            engine,
            metrics_collector,
            is_running: Arc::new(RwLock::new(false)),
            started_at: Instant::now(),
        })
    }

    /// Mark the service as ready to handle requests
    pub async fn start(&self) -> Result<(), ServiceError> {
        info!("Starting paddock ranking service");

        *self.is_running.write().await = true;

        match self.store.pilot_count() {
            Ok(count) => {
                self.metrics_collector.set_pilots_registered(count as i64);
                info!("Rating store ready with {} registered pilots", count);
            }
            Err(e) => warn!("Failed to read pilot count at startup: {}", e),
        }

        info!("✅ Paddock ranking service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of paddock service");

        *self.is_running.write().await = false;

        if let Err(e) = self.store.flush() {
            warn!("Failed to flush rating store: {}", e);
        } else {
            info!("✅ Rating store flushed");
        }

        let final_stats = self
            .engine
            .get_stats()
            .map_err(|e| ServiceError::Shutdown {
                message: format!("Failed to get final stats: {}", e),
            })?;

        info!("Final service statistics: {:?}", final_stats);
        info!("✅ Paddock service shutdown completed");

        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Get the rating store
    pub fn store(&self) -> Arc<dyn RatingStore> {
        self.store.clone()
    }

    /// Get the rating engine
    pub fn engine(&self) -> Arc<RatingEngine> {
        self.engine.clone()
    }

    /// Get the metrics collector
    pub fn metrics_collector(&self) -> Arc<MetricsCollector> {
        self.metrics_collector.clone()
    }

    /// Time elapsed since initialization
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    fn initialize_store(config: &AppConfig) -> Result<Arc<dyn RatingStore>, ServiceError> {
        let initial_rating = config.rating.default_rating;

        let store: Arc<dyn RatingStore> = match &config.store.snapshot_path {
            Some(path) => {
                info!("Opening rating store with snapshot at {}", path.display());
                Arc::new(
                    InMemoryRatingStore::with_snapshot(initial_rating, path.clone()).map_err(
                        |e| ServiceError::Initialization {
                            message: format!("Failed to open rating store: {}", e),
                        },
                    )?,
                )
            }
            None => {
                info!("Using in-memory rating store without snapshots");
                Arc::new(InMemoryRatingStore::new(initial_rating))
            }
        };

        Ok(store)
    }

    fn initialize_engine(
        config: &AppConfig,
        store: Arc<dyn RatingStore>,
        metrics_collector: Arc<MetricsCollector>,
    ) -> Result<Arc<RatingEngine>, ServiceError> {
        let elo_config = ExtendedEloConfig::from_settings(&config.rating);
        let calculator =
            Arc::new(
                EloRaceCalculator::new(elo_config).map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to initialize rating calculator: {}", e),
                })?,
            );

        Ok(Arc::new(RatingEngine::with_metrics(
            store,
            calculator,
            metrics_collector,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PilotProfile, RaceResult};
    use uuid::Uuid;

    fn create_test_state() -> AppState {
        AppState::new(AppConfig::default()).expect("Failed to create app state")
    }

    #[tokio::test]
    async fn test_app_state_lifecycle() {
        let state = create_test_state();
        assert!(!state.is_running().await);

        state.start().await.unwrap();
        assert!(state.is_running().await);

        state.shutdown().await.unwrap();
        assert!(!state.is_running().await);
    }

    #[tokio::test]
    async fn test_state_wires_engine_to_store() {
        let state = create_test_state();
        state.start().await.unwrap();

        let store = state.store();
        let first = store
            .register_pilot(PilotProfile {
                license_number: "FR-2024-0001".to_string(),
                first_name: "Lea".to_string(),
                last_name: "Moreau".to_string(),
                pseudo: "swift".to_string(),
            })
            .unwrap();
        let second = store
            .register_pilot(PilotProfile {
                license_number: "FR-2024-0002".to_string(),
                first_name: "Noa".to_string(),
                last_name: "Garnier".to_string(),
                pseudo: "apex".to_string(),
            })
            .unwrap();

        let race = RaceResult::new(Uuid::new_v4(), vec![first.id, second.id]);
        state.engine().process_race(&race).unwrap();

        let standings = state.engine().standings(0).unwrap();
        assert_eq!(standings[0].elo, 1016);
        assert_eq!(standings[1].elo, 984);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = AppConfig::default();
        config.rating.k_factor = 0.0;

        let result = AppState::new(config);
        assert!(matches!(result, Err(ServiceError::Configuration { .. })));
    }
}
