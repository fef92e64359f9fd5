//! Clip server binary
//!
//! Wires up:
//! - Outbound adapters (reqwest source fetcher, tokio subprocess runner)
//! - The clip pipeline
//! - HTTP JSON API and static file access

use reelcut::adapters::fetch::ReqwestFetcher;
use reelcut::adapters::process::TokioCommandRunner;
use reelcut::domain::path_safety::StaticRoots;
use reelcut::{router, AppState, ClipPipeline, ServerConfig};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = ServerConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = config.pipeline.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    // 1. Adapters
    let fetcher = match ReqwestFetcher::new(config.pipeline.download_timeout) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Failed to build HTTP client: {:?}", e);
            std::process::exit(1);
        }
    };
    let runner = TokioCommandRunner::new();

    // 2. Application service
    let pipeline = ClipPipeline::new(fetcher, runner, config.pipeline.clone());
    let static_roots = StaticRoots::new(&config.static_root, config.allowed_static_dirs.clone());

    // 3. HTTP layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(AppState::new(pipeline, static_roots))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // 4. Start server
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.addr, config.port))
        .await
        .expect("Failed to bind TCP listener");
    info!(
        addr = %config.addr,
        port = %config.port,
        source_url = %config.pipeline.source_url,
        clips_root = %config.pipeline.clips_root.display(),
        "clip server listening"
    );
    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
