use super::AppState;
use crate::domain::av::tool_available;
use crate::ports::fetch::SourceFetcher;
use crate::ports::process::CommandRunner;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Vertical clip generation server",
        "endpoints": {
            "/generate-clip": "POST - Generate a random clip",
            "/list-clips": "GET - List generated clips",
            "/download-clip/<session_id>/<filename>": "GET - Download a specific clip",
            "/clear-clips": "DELETE - Delete all clips",
            "/health": "GET - Server and FFmpeg status",
            "/directories": "GET - List available directories",
            "/files/<directory>": "GET - List files in a directory",
            "/static/<directory>/<filename>": "GET - Serve a static file",
            "/out/<filename>": "GET - Serve a file from the render output directory",
            "/public/<filename>": "GET - Serve a file from the public directory",
        }
    }))
}

pub async fn health<F, R>(State(state): State<AppState<F, R>>) -> Json<Value>
where
    F: SourceFetcher + 'static,
    R: CommandRunner + 'static,
{
    let config = state.pipeline.config();
    let runner = state.pipeline.runner();
    let ffmpeg_available = tool_available(runner, &config.tools.ffmpeg).await;
    let ffprobe_available = tool_available(runner, &config.tools.ffprobe).await;
    let clips_directory_exists = tokio::fs::metadata(&config.clips_root)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);

    Json(json!({
        "server": "running",
        "ffmpeg_available": ffmpeg_available,
        "ffprobe_available": ffprobe_available,
        "clips_directory": config.clips_root.display().to_string(),
        "clips_directory_exists": clips_directory_exists,
    }))
}
