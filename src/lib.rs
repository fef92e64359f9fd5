//! Reelcut - Random vertical clip generation service
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (window selection, clip records, av tooling, path safety)
//! - ports/: Trait definitions (source fetching, subprocess execution)
//! - adapters/: Concrete implementations (reqwest, tokio::process, axum HTTP API)
//! - application/: Pipeline services (acquisition, sessions, orchestration)
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

#[cfg(test)]
pub(crate) mod test_support;

pub use adapters::http::{router, AppState};
pub use application::orchestrator::ClipPipeline;
pub use config::{PipelineConfig, ServerConfig};
