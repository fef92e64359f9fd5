use super::error::ApiError;
use super::files::{serve_file, size_mb};
use super::AppState;
use crate::application::session::SessionId;
use crate::domain::clip::ClipReport;
use crate::domain::path_safety::resolve_within;
use crate::ports::fetch::SourceFetcher;
use crate::ports::process::CommandRunner;
use axum::extract::{Path as UrlPath, State};
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Runs the pipeline on its own task: a dropped connection does not cancel it.
pub async fn generate_clip<F, R>(
    State(state): State<AppState<F, R>>,
) -> Result<Json<ClipReport>, ApiError>
where
    F: SourceFetcher + 'static,
    R: CommandRunner + 'static,
{
    info!("clip generation requested");
    let pipeline = state.pipeline.clone();
    let report = tokio::spawn(async move { pipeline.generate_clip().await })
        .await
        .map_err(ApiError::internal)??;
    Ok(Json(report))
}

#[derive(Debug, Serialize)]
pub struct ClipListing {
    pub filename: String,
    pub size_mb: f64,
    pub download_url: String,
}

#[derive(Debug, Serialize)]
pub struct SessionListing {
    pub session_id: String,
    pub clips_count: usize,
    pub clips: Vec<ClipListing>,
}

/// Every session directory under `clips_root` with the `.mp4` files it holds.
pub async fn list_sessions(clips_root: &Path) -> io::Result<Vec<SessionListing>> {
    let mut sessions = Vec::new();
    let mut dirs = match tokio::fs::read_dir(clips_root).await {
        Ok(dirs) => dirs,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(sessions),
        Err(e) => return Err(e),
    };

    while let Some(dir) = dirs.next_entry().await? {
        if !dir.file_type().await?.is_dir() {
            continue;
        }
        let session_id = dir.file_name().to_string_lossy().into_owned();

        let mut clips = Vec::new();
        let mut files = tokio::fs::read_dir(dir.path()).await?;
        while let Some(file) = files.next_entry().await? {
            let path = file.path();
            if path.extension().and_then(|e| e.to_str()) != Some("mp4") {
                continue;
            }
            let filename = file.file_name().to_string_lossy().into_owned();
            let size = file.metadata().await?.len();
            clips.push(ClipListing {
                size_mb: size_mb(size),
                download_url: format!("/download-clip/{}/{}", session_id, filename),
                filename,
            });
        }
        clips.sort_by(|a, b| a.filename.cmp(&b.filename));

        sessions.push(SessionListing {
            clips_count: clips.len(),
            session_id,
            clips,
        });
    }
    sessions.sort_by(|a, b| a.session_id.cmp(&b.session_id));
    Ok(sessions)
}

pub async fn list_clips<F, R>(State(state): State<AppState<F, R>>) -> Result<Json<Value>, ApiError>
where
    F: SourceFetcher + 'static,
    R: CommandRunner + 'static,
{
    let sessions = list_sessions(&state.pipeline.config().clips_root).await?;
    Ok(Json(json!({
        "total_sessions": sessions.len(),
        "sessions": sessions,
    })))
}

pub async fn download_clip<F, R>(
    State(state): State<AppState<F, R>>,
    UrlPath((session_id, filename)): UrlPath<(String, String)>,
) -> Result<Response, ApiError>
where
    F: SourceFetcher + 'static,
    R: CommandRunner + 'static,
{
    let session = SessionId::parse(&session_id).ok_or_else(|| ApiError::not_found("File not found"))?;
    let relative: PathBuf = [session.as_str(), filename.as_str()].iter().collect();
    let path = resolve_within(&state.pipeline.config().clips_root, &relative)?;
    if !path.is_file() {
        return Err(ApiError::not_found("File not found"));
    }
    serve_file(&path, Some(&filename)).await
}

pub async fn clear_clips<F, R>(State(state): State<AppState<F, R>>) -> Result<Json<Value>, ApiError>
where
    F: SourceFetcher + 'static,
    R: CommandRunner + 'static,
{
    state.pipeline.clear_sessions().await?;
    Ok(Json(json!({ "message": "All clips have been deleted" })))
}
