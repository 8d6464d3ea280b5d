//! # harvest-api
//!
//! HTTP surface for Harvest Ledger: identity extraction, JSON handlers over
//! the ledger workflows, and error-to-status mapping.
//!
//! ## Configuration
//! See [`config`]: `harvest.toml` plus `HARVEST_*` environment overrides.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

// Re-exports
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::router;
pub use state::AppState;
