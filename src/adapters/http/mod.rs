//! HTTP inbound adapter.
//!
//! JSON API around the clip pipeline plus read-only access to the
//! allow-listed static directories.

pub mod clips;
pub mod error;
pub mod files;
pub mod health;

use crate::application::orchestrator::ClipPipeline;
use crate::domain::path_safety::StaticRoots;
use crate::ports::fetch::SourceFetcher;
use crate::ports::process::CommandRunner;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;

pub struct AppState<F, R> {
    pub pipeline: Arc<ClipPipeline<F, R>>,
    pub static_roots: Arc<StaticRoots>,
}

impl<F, R> AppState<F, R> {
    pub fn new(pipeline: ClipPipeline<F, R>, static_roots: StaticRoots) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            static_roots: Arc::new(static_roots),
        }
    }
}

impl<F, R> Clone for AppState<F, R> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            static_roots: self.static_roots.clone(),
        }
    }
}

pub fn router<F, R>(state: AppState<F, R>) -> Router
where
    F: SourceFetcher + 'static,
    R: CommandRunner + 'static,
{
    Router::new()
        .route("/", get(health::index))
        .route("/health", get(health::health::<F, R>))
        .route("/generate-clip", post(clips::generate_clip::<F, R>))
        .route("/list-clips", get(clips::list_clips::<F, R>))
        .route(
            "/download-clip/:session_id/:filename",
            get(clips::download_clip::<F, R>),
        )
        .route("/clear-clips", delete(clips::clear_clips::<F, R>))
        .route("/directories", get(files::list_directories::<F, R>))
        .route("/files/:dir", get(files::list_directory::<F, R>))
        .route("/files/:dir/*subpath", get(files::list_subdirectory::<F, R>))
        .route("/static/:dir/*path", get(files::serve_static::<F, R>))
        .route("/out/*path", get(files::serve_out::<F, R>))
        .route("/public/*path", get(files::serve_public::<F, R>))
        .with_state(state)
}
