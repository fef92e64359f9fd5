//! Listing and serving files from allow-listed directories.

use super::error::ApiError;
use super::AppState;
use crate::domain::path_safety::resolve_within;
use crate::ports::fetch::SourceFetcher;
use crate::ports::process::CommandRunner;
use axum::body::Body;
use axum::extract::{Path as UrlPath, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Entry {
    File {
        name: String,
        size_bytes: u64,
        size_mb: f64,
        download_url: String,
    },
    Directory {
        name: String,
        #[serde(rename = "type")]
        kind: &'static str,
        list_url: String,
    },
}

pub fn size_mb(bytes: u64) -> f64 {
    (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
}

/// Entries of `dir`, sorted by name. `url_path` is the directory's path below the
/// static root, used to build download and listing links.
pub async fn read_entries(dir: &Path, url_path: &str) -> io::Result<Vec<Entry>> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let meta = match tokio::fs::metadata(entry.path()).await {
            Ok(meta) => meta,
            Err(_) => continue,
        };
        if meta.is_file() {
            entries.push(Entry::File {
                size_bytes: meta.len(),
                size_mb: size_mb(meta.len()),
                download_url: format!("/static/{}/{}", url_path, name),
                name,
            });
        } else if meta.is_dir() {
            entries.push(Entry::Directory {
                kind: "directory",
                list_url: format!("/files/{}/{}", url_path, name),
                name,
            });
        }
    }
    entries.sort_by(|a, b| entry_name(a).cmp(entry_name(b)));
    Ok(entries)
}

fn entry_name(entry: &Entry) -> &str {
    match entry {
        Entry::File { name, .. } | Entry::Directory { name, .. } => name,
    }
}

pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("json") => "application/json",
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") | Some("mjs") => "text/javascript",
        Some("txt") | Some("srt") | Some("vtt") => "text/plain; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Stream a file as the response body, optionally as a named attachment.
pub async fn serve_file(path: &Path, attachment: Option<&str>) -> Result<Response, ApiError> {
    let file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ApiError::not_found("File not found"))
        }
        Err(e) => return Err(e.into()),
    };
    let length = file.metadata().await?.len();
    let body = Body::from_stream(ReaderStream::new(file));

    let mut response = (
        [
            (header::CONTENT_TYPE, content_type(path).to_string()),
            (header::CONTENT_LENGTH, length.to_string()),
        ],
        body,
    )
        .into_response();
    if let Some(name) = attachment {
        if let Ok(value) = format!("attachment; filename=\"{}\"", name.replace('"', "")).parse() {
            response
                .headers_mut()
                .insert(header::CONTENT_DISPOSITION, value);
        }
    }
    Ok(response)
}

async fn listing(dir: &str, subpath: Option<&str>, resolved: &Path) -> Result<Value, ApiError> {
    let url_path = match subpath {
        Some(sub) => format!("{}/{}", dir, sub.trim_end_matches('/')),
        None => dir.to_string(),
    };
    let files = read_entries(resolved, &url_path).await?;
    Ok(json!({
        "directory": url_path,
        "path": resolved.display().to_string(),
        "count": files.len(),
        "files": files,
    }))
}

pub async fn list_directory<F, R>(
    State(state): State<AppState<F, R>>,
    UrlPath(dir): UrlPath<String>,
) -> Result<Json<Value>, ApiError>
where
    F: SourceFetcher + 'static,
    R: CommandRunner + 'static,
{
    let resolved = state.static_roots.resolve(&dir, "")?;
    Ok(Json(listing(&dir, None, &resolved).await?))
}

pub async fn list_subdirectory<F, R>(
    State(state): State<AppState<F, R>>,
    UrlPath((dir, subpath)): UrlPath<(String, String)>,
) -> Result<Response, ApiError>
where
    F: SourceFetcher + 'static,
    R: CommandRunner + 'static,
{
    let resolved = state.static_roots.resolve(&dir, &subpath)?;
    if resolved.is_file() {
        return serve_file(&resolved, None).await;
    }
    Ok(Json(listing(&dir, Some(&subpath), &resolved).await?).into_response())
}

pub async fn serve_static<F, R>(
    State(state): State<AppState<F, R>>,
    UrlPath((dir, path)): UrlPath<(String, String)>,
) -> Result<Response, ApiError>
where
    F: SourceFetcher + 'static,
    R: CommandRunner + 'static,
{
    let resolved = state.static_roots.resolve(&dir, &path)?;
    if !resolved.is_file() {
        return Err(ApiError::not_found("File not found"));
    }
    serve_file(&resolved, None).await
}

async fn serve_under(root: &Path, path: &str) -> Result<Response, ApiError> {
    let resolved = resolve_within(root, Path::new(path))?;
    if !resolved.is_file() {
        return Err(ApiError::not_found("File not found"));
    }
    serve_file(&resolved, None).await
}

/// Files written by the render tool.
pub async fn serve_out<F, R>(
    State(state): State<AppState<F, R>>,
    UrlPath(path): UrlPath<String>,
) -> Result<Response, ApiError>
where
    F: SourceFetcher + 'static,
    R: CommandRunner + 'static,
{
    let root = state
        .pipeline
        .targets()
        .render_output
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    serve_under(&root, &path).await
}

/// Files in the public directory.
pub async fn serve_public<F, R>(
    State(state): State<AppState<F, R>>,
    UrlPath(path): UrlPath<String>,
) -> Result<Response, ApiError>
where
    F: SourceFetcher + 'static,
    R: CommandRunner + 'static,
{
    serve_under(&state.pipeline.config().public_dir, &path).await
}

pub async fn list_directories<F, R>(State(state): State<AppState<F, R>>) -> Json<Value>
where
    F: SourceFetcher + 'static,
    R: CommandRunner + 'static,
{
    let mut directories = Vec::new();
    for name in state.static_roots.allowed() {
        let listing = match state.static_roots.resolve(name, "") {
            Ok(resolved) => read_entries(&resolved, name).await.ok(),
            Err(_) => None,
        };
        directories.push(match listing {
            Some(entries) => {
                let file_count = entries
                    .iter()
                    .filter(|e| matches!(e, Entry::File { .. }))
                    .count();
                json!({
                    "name": name,
                    "exists": true,
                    "file_count": file_count,
                    "dir_count": entries.len() - file_count,
                    "list_url": format!("/files/{}", name),
                    "static_url": format!("/static/{}/", name),
                })
            }
            None => json!({
                "name": name,
                "exists": false,
                "list_url": format!("/files/{}", name),
            }),
        });
    }

    Json(json!({
        "allowed_directories": directories,
        "endpoints": {
            "list_files": "/files/<directory>",
            "serve_static": "/static/<directory>/<filename>",
            "out_files": "/out/<filename>",
            "public_files": "/public/<filename>",
        }
    }))
}
