//! HTTP endpoints for the paddock ranking service
//!
//! This module provides the public API (pilots, races, rankings) together
//! with health checks and Prometheus metrics for the paddock ranking
//! service using Axum.

use crate::api::model::{
    PilotRegistration, RaceOutcomeModel, RaceSubmission, RankingParams,
};
use crate::error::RankingError;
use crate::service::app::AppState;
use crate::service::health::{HealthCheck, HealthStatus};
use crate::types::PilotStanding;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};

/// API error carrying the HTTP status and a `{"detail": ...}` body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        let status = match error.downcast_ref::<RankingError>() {
            Some(RankingError::PilotNotFound { .. }) => StatusCode::NOT_FOUND,
            Some(RankingError::InvalidRace { .. })
            | Some(RankingError::InvalidPilot { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            Some(RankingError::RaceAlreadyApplied { .. })
            | Some(RankingError::UpdateConflict { .. }) => StatusCode::CONFLICT,
            Some(RankingError::StoreUnavailable { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Internal error serving request: {}", error);
        }

        Self {
            status,
            detail: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/rankings", get(rankings_handler))
        .route("/pilots", get(list_pilots_handler).post(register_pilot_handler))
        .route(
            "/pilots/{id}",
            get(get_pilot_handler).put(update_pilot_handler),
        )
        .route("/races", post(submit_race_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/alive", get(alive_handler))
        .route("/metrics", get(metrics_handler))
        .route("/stats", get(stats_handler))
        .with_state(state)
}

/// Root endpoint handler - shows service information
async fn root_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let info = json!({
        "service": state.config().service.name,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/rankings",
            "/pilots",
            "/races",
            "/health",
            "/ready",
            "/alive",
            "/metrics",
            "/stats"
        ]
    });

    Json(info)
}

/// Ranking endpoint handler
///
/// `minimum_races` falls back to the configured default when absent. An
/// empty result maps to 404, matching the public contract.
async fn rankings_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RankingParams>,
) -> Result<Json<Vec<PilotStanding>>, ApiError> {
    let minimum_races = params
        .minimum_races
        .unwrap_or(state.config().rating.default_minimum_races);

    debug!("Ranking requested with minimum_races={}", minimum_races);

    let standings = state.engine().standings(minimum_races)?;
    if standings.is_empty() {
        return Err(ApiError::not_found(
            "No pilots found with the specified number of races",
        ));
    }

    Ok(Json(standings))
}

/// List every pilot in ranking order, no race minimum
async fn list_pilots_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PilotStanding>>, ApiError> {
    let standings = state.engine().standings(0)?;
    if standings.is_empty() {
        return Err(ApiError::not_found("No pilots found"));
    }

    Ok(Json(standings))
}

/// Register a new pilot
async fn register_pilot_handler(
    State(state): State<Arc<AppState>>,
    Json(registration): Json<PilotRegistration>,
) -> Result<(StatusCode, Json<PilotStanding>), ApiError> {
    let pilot = state.store().register_pilot(registration.into_profile())?;

    if let Ok(count) = state.store().pilot_count() {
        state.metrics_collector().set_pilots_registered(count as i64);
    }

    Ok((StatusCode::CREATED, Json(PilotStanding::from(&pilot))))
}

/// Fetch a single pilot
async fn get_pilot_handler(
    State(state): State<Arc<AppState>>,
    Path(pilot_id): Path<i64>,
) -> Result<Json<PilotStanding>, ApiError> {
    match state.store().get_pilot(pilot_id)? {
        Some(pilot) => Ok(Json(PilotStanding::from(&pilot))),
        None => Err(ApiError::not_found("Pilot not found")),
    }
}

/// Update a pilot profile, rating state untouched
async fn update_pilot_handler(
    State(state): State<Arc<AppState>>,
    Path(pilot_id): Path<i64>,
    Json(registration): Json<PilotRegistration>,
) -> Result<Json<PilotStanding>, ApiError> {
    let pilot = state
        .store()
        .update_profile(pilot_id, registration.into_profile())?;
    state.metrics_collector().record_profile_update();

    Ok(Json(PilotStanding::from(&pilot)))
}

/// Submit a race result
///
/// Both a fresh application and a recognized replay return 200; the
/// `status` field tells them apart.
async fn submit_race_handler(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<RaceSubmission>,
) -> Result<Json<RaceOutcomeModel>, ApiError> {
    let race = submission.into_result();
    let outcome = state.engine().process_race(&race)?;

    Ok(Json(RaceOutcomeModel::from(&outcome)))
}

/// Lightweight health check endpoint handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Health check requested");

    let service = state.config().service.name.clone();
    match HealthCheck::liveness_check(state).await {
        Ok(HealthStatus::Healthy) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "service": service,
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Ok(HealthStatus::Degraded) => (
            StatusCode::OK,
            Json(json!({
                "status": "degraded",
                "service": service,
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Ok(HealthStatus::Unhealthy) | Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "service": service,
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
    }
}

/// Readiness check endpoint handler
async fn ready_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Readiness check requested");

    match HealthCheck::readiness_check(state).await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "Ready"),
        Ok(HealthStatus::Degraded) => (StatusCode::OK, "Degraded but ready"),
        Ok(HealthStatus::Unhealthy) => (StatusCode::SERVICE_UNAVAILABLE, "Not ready"),
        Err(e) => {
            error!("Readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Not ready")
        }
    }
}

/// Liveness check endpoint handler
async fn alive_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Liveness check requested");

    match HealthCheck::liveness_check(state).await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "Alive"),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "Not alive"),
    }
}

/// Prometheus metrics endpoint handler
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    debug!("Metrics endpoint requested");

    let registry = state.metrics_collector().registry();
    let metric_families = registry.gather();
    let encoder = TextEncoder::new();

    match encoder.encode_to_string(&metric_families) {
        Ok(metrics_output) => {
            debug!("Serving {} metric families", metric_families.len());

            (
                StatusCode::OK,
                [("content-type", encoder.format_type().to_string())],
                metrics_output,
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to encode metrics: {}", e);

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics".to_string(),
            )
                .into_response()
        }
    }
}

/// Detailed service statistics endpoint handler (for debugging/human consumption)
async fn stats_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Stats endpoint requested");

    let service = state.config().service.name.clone();
    match HealthCheck::check(state).await {
        Ok(health) => {
            let stats = json!({
                "service": {
                    "name": service,
                    "version": env!("CARGO_PKG_VERSION"),
                    "status": health.status,
                    "uptime": health.stats.uptime_info
                },
                "pilots": {
                    "registered": health.stats.pilots_registered
                },
                "races": {
                    "applied": health.stats.races_applied,
                    "replayed": health.stats.races_replayed,
                    "rejected": health.stats.races_rejected
                },
                "queries": {
                    "rankings": health.stats.ranking_queries
                },
                "components": health.checks,
                "timestamp": chrono::Utc::now()
            });

            (StatusCode::OK, Json(stats))
        }
        Err(e) => {
            error!("Failed to get stats: {}", e);

            let error_response = json!({
                "service": {
                    "name": service,
                    "version": env!("CARGO_PKG_VERSION"),
                    "status": "error"
                },
                "error": "Failed to get service stats",
                "timestamp": chrono::Utc::now()
            });

            (StatusCode::SERVICE_UNAVAILABLE, Json(error_response))
        }
    }
}
