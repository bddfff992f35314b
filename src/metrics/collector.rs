//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the paddock ranking
//! service using Prometheus metrics.

use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry,
};
use std::sync::Arc;
use std::time::Duration;

/// Main metrics collector for the ranking service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Race processing metrics
    race_metrics: RaceMetrics,

    /// Pilot population metrics
    pilot_metrics: PilotMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,
}

/// Race processing metrics
#[derive(Clone)]
pub struct RaceMetrics {
    /// Total races applied to the standings
    pub races_applied_total: IntCounter,

    /// Total replayed race submissions ignored
    pub races_replayed_total: IntCounter,

    /// Total rejected race submissions by reason
    pub races_rejected_total: IntCounterVec,

    /// Field size of applied races
    pub race_field_size: Histogram,
}

/// Pilot population metrics
#[derive(Clone)]
pub struct PilotMetrics {
    /// Registered pilots
    pub pilots_registered: IntGauge,

    /// Total profile updates
    pub profile_updates_total: IntCounter,

    /// Distribution of ratings after applied races
    pub rating_distribution: Histogram,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Race processing time, validation to commit
    pub race_processing_duration: Histogram,

    /// Pairwise rating calculation time
    pub rating_calculation_duration: Histogram,

    /// Ranking query time
    pub ranking_query_duration: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let race_metrics = RaceMetrics::new(&registry)?;
        let pilot_metrics = PilotMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            race_metrics,
            pilot_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Get race metrics
    pub fn race(&self) -> &RaceMetrics {
        &self.race_metrics
    }

    /// Get pilot metrics
    pub fn pilot(&self) -> &PilotMetrics {
        &self.pilot_metrics
    }

    /// Get performance metrics
    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Record a race being applied to the standings
    pub fn record_race_processed(&self, duration: Duration, field_size: usize) {
        self.race_metrics.races_applied_total.inc();
        self.race_metrics.race_field_size.observe(field_size as f64);
        self.performance_metrics
            .race_processing_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a replayed race submission being ignored
    pub fn record_race_replayed(&self) {
        self.race_metrics.races_replayed_total.inc();
    }

    /// Record a rejected race submission
    pub fn record_race_rejected(&self, reason: &str) {
        self.race_metrics
            .races_rejected_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Record the duration of a pairwise rating calculation
    pub fn record_rating_calculation(&self, duration: Duration) {
        self.performance_metrics
            .rating_calculation_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a post-race rating in the distribution
    pub fn record_rating(&self, rating: f64) {
        self.pilot_metrics.rating_distribution.observe(rating);
    }

    /// Record a ranking query
    pub fn record_ranking_query(&self, duration: Duration) {
        self.performance_metrics
            .ranking_query_duration
            .observe(duration.as_secs_f64());
    }

    /// Update the registered pilot count
    pub fn set_pilots_registered(&self, count: i64) {
        self.pilot_metrics.pilots_registered.set(count);
    }

    /// Record a pilot profile update
    pub fn record_profile_update(&self) {
        self.pilot_metrics.profile_updates_total.inc();
    }

    /// Update service uptime
    pub fn set_uptime(&self, uptime: Duration) {
        self.service_metrics
            .uptime_seconds
            .set(uptime.as_secs() as i64);
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update component health
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        let status = if healthy { 1 } else { 0 };
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(status);
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds = IntGauge::new("paddock_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::new(
            "paddock_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new("paddock_component_health", "Component health status"),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
            component_health,
        })
    }
}

impl RaceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let races_applied_total =
            IntCounter::new("paddock_races_applied_total", "Total races applied")?;
        registry.register(Box::new(races_applied_total.clone()))?;

        let races_replayed_total = IntCounter::new(
            "paddock_races_replayed_total",
            "Total replayed race submissions ignored",
        )?;
        registry.register(Box::new(races_replayed_total.clone()))?;

        let races_rejected_total = IntCounterVec::new(
            Opts::new(
                "paddock_races_rejected_total",
                "Total rejected race submissions",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(races_rejected_total.clone()))?;

        let race_field_size = Histogram::with_opts(
            HistogramOpts::new("paddock_race_field_size", "Field size of applied races")
                .buckets(vec![2.0, 3.0, 4.0, 6.0, 8.0, 12.0, 16.0, 24.0]),
        )?;
        registry.register(Box::new(race_field_size.clone()))?;

        Ok(Self {
            races_applied_total,
            races_replayed_total,
            races_rejected_total,
            race_field_size,
        })
    }
}

impl PilotMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let pilots_registered =
            IntGauge::new("paddock_pilots_registered", "Registered pilots")?;
        registry.register(Box::new(pilots_registered.clone()))?;

        let profile_updates_total = IntCounter::new(
            "paddock_profile_updates_total",
            "Total pilot profile updates",
        )?;
        registry.register(Box::new(profile_updates_total.clone()))?;

        let rating_distribution = Histogram::with_opts(
            HistogramOpts::new("paddock_rating_distribution", "Pilot rating distribution")
                .buckets(vec![
                    600.0, 800.0, 900.0, 950.0, 1000.0, 1050.0, 1100.0, 1200.0, 1400.0,
                    1600.0, 2000.0,
                ]),
        )?;
        registry.register(Box::new(rating_distribution.clone()))?;

        Ok(Self {
            pilots_registered,
            profile_updates_total,
            rating_distribution,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let race_processing_duration = Histogram::with_opts(
            HistogramOpts::new(
                "paddock_race_processing_duration_seconds",
                "Race processing time",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        )?;
        registry.register(Box::new(race_processing_duration.clone()))?;

        let rating_calculation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "paddock_rating_calculation_duration_seconds",
                "Rating calculation time",
            )
            .buckets(vec![0.00001, 0.0001, 0.001, 0.005, 0.01, 0.05]),
        )?;
        registry.register(Box::new(rating_calculation_duration.clone()))?;

        let ranking_query_duration = Histogram::with_opts(
            HistogramOpts::new(
                "paddock_ranking_query_duration_seconds",
                "Ranking query time",
            )
            .buckets(vec![0.0001, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        )?;
        registry.register(Box::new(ranking_query_duration.clone()))?;

        Ok(Self {
            race_processing_duration,
            rating_calculation_duration,
            ranking_query_duration,
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}
