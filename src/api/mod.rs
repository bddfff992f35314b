//! HTTP API for the paddock ranking service
//!
//! Wire models and the Axum router. Rankings, pilot management and race
//! submission share one server with the health and metrics endpoints.

pub mod model;
pub mod routes;

pub use routes::{create_router, ApiError};
