//! Metrics and monitoring for the paddock ranking service
//!
//! This module provides Prometheus metrics collection for race processing,
//! the pilot population and service health. The `/metrics` endpoint that
//! exposes the registry lives in the API layer.

pub mod collector;

pub use collector::{
    MetricsCollector, PerformanceMetrics, PilotMetrics, RaceMetrics, ServiceMetrics,
};
