use super::av::encode::ASPECT_RATIO;
use super::window::ClipWindow;
use serde::Serialize;
use std::path::PathBuf;

/// Locally cached copy of the source video.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceVideo {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Seconds; only set once probing succeeded for this file.
    pub duration: Option<f64>,
}

impl SourceVideo {
    pub fn new(path: PathBuf, size_bytes: u64) -> Self {
        Self {
            path,
            size_bytes,
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Metadata about the produced clip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipResult {
    pub filename: String,
    pub start_time: f64,
    pub duration: u32,
    pub download_url: String,
    pub file_path: String,
    pub aspect_ratio: &'static str,
    /// Path of the rendered, captioned video
    pub out: String,
}

impl ClipResult {
    pub fn new(
        filename: impl Into<String>,
        window: &ClipWindow,
        download_url: impl Into<String>,
        file_path: impl Into<String>,
        out: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            start_time: round2(window.start),
            duration: window.length,
            download_url: download_url.into(),
            file_path: file_path.into(),
            aspect_ratio: ASPECT_RATIO,
            out: out.into(),
        }
    }
}

/// Successful pipeline run, as returned to the HTTP caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipReport {
    pub success: bool,
    pub session_id: String,
    pub video_path: String,
    pub video_duration: f64,
    pub clip: ClipResult,
    pub message: String,
}

impl ClipReport {
    pub fn new(session_id: String, source: &SourceVideo, clip: ClipResult) -> Self {
        Self {
            success: true,
            session_id,
            video_path: source.path.display().to_string(),
            video_duration: round2(source.duration.unwrap_or_default()),
            clip,
            message: format!(
                "Clip generated in {} format and processed successfully",
                ASPECT_RATIO
            ),
        }
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
