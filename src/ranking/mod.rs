//! Race processing and ranking queries
//!
//! The engine applies race results to the standings atomically and
//! idempotently; the standings module holds the ordering rules.

pub mod engine;
pub mod standings;

pub use engine::{EngineStats, RatingEngine};
