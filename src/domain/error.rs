//! Error types for every pipeline stage.
//!
//! Each stage converts its own failures into one of these types at its
//! boundary; `PipelineError` is the stage-tagged union the orchestrator
//! returns to its caller.

use serde::Serialize;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// One discrete step of the clip pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Acquire,
    Probe,
    Session,
    Select,
    Encode,
    Publish,
    Transcribe,
    Render,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Acquire => "acquire",
            Stage::Probe => "probe",
            Stage::Session => "session",
            Stage::Select => "select",
            Stage::Encode => "encode",
            Stage::Publish => "publish",
            Stage::Transcribe => "transcribe",
            Stage::Render => "render",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum AcquisitionError {
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("{url} answered with HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("transport error fetching {url}: {message}")]
    Transport { url: String, message: String },

    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("download of {url} produced an empty file")]
    Empty { url: String },
}

/// Uniform failure of any external process step.
#[derive(thiserror::Error, Debug)]
pub enum ExternalStageError {
    #[error("{stage}: could not start `{program}`: {source}")]
    Spawn {
        stage: &'static str,
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{stage}: `{program}` exited with {}: {stderr}", describe_exit(.code))]
    ExitStatus {
        stage: &'static str,
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{stage}: expected output {path} was not produced")]
    MissingArtifact { stage: &'static str, path: PathBuf },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ProbeError {
    #[error(transparent)]
    Tool(#[from] ExternalStageError),

    #[error("unparseable probe output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("probe output has no duration field")]
    MissingDuration,

    #[error("probe reported an invalid duration: {0}")]
    InvalidDuration(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("no clip of {min_len}-{max_len}s fits in a {duration:.2}s video")]
pub struct InfeasibleWindow {
    pub duration: f64,
    pub min_len: u32,
    pub max_len: u32,
}

/// Terminal failure of a pipeline run, tagged with the stage that failed.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("could not acquire the source video: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("could not read the source video duration: {0}")]
    Probe(#[from] ProbeError),

    #[error("the source video must be at least {minimum} seconds long (got {duration:.2})")]
    TooShort { duration: f64, minimum: f64 },

    #[error("could not prepare the session workspace {path}: {source}")]
    Session {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("the video is too short for a clip of the requested length: {0}")]
    InfeasibleWindow(#[from] InfeasibleWindow),

    #[error("could not encode the clip: {0}")]
    Encode(#[source] ExternalStageError),

    #[error("could not publish the clip to {path}: {source}")]
    Publish {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("transcription failed: {0}")]
    Transcription(#[source] ExternalStageError),

    #[error("render failed: {0}")]
    Render(#[source] ExternalStageError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Acquisition(_) => Stage::Acquire,
            PipelineError::Probe(_) | PipelineError::TooShort { .. } => Stage::Probe,
            PipelineError::Session { .. } => Stage::Session,
            PipelineError::InfeasibleWindow(_) => Stage::Select,
            PipelineError::Encode(_) => Stage::Encode,
            PipelineError::Publish { .. } => Stage::Publish,
            PipelineError::Transcription(_) => Stage::Transcribe,
            PipelineError::Render(_) => Stage::Render,
        }
    }

    /// Short machine-readable tag for the terminal `Failed(..)` state.
    pub fn reason(&self) -> &'static str {
        match self {
            PipelineError::Acquisition(_) => "acquisition",
            PipelineError::Probe(_) => "probe",
            PipelineError::TooShort { .. } => "too_short",
            PipelineError::Session { .. } => "session",
            PipelineError::InfeasibleWindow(_) => "infeasible_window",
            PipelineError::Encode(_) => "encode",
            PipelineError::Publish { .. } => "publish",
            PipelineError::Transcription(_) => "transcription",
            PipelineError::Render(_) => "render",
        }
    }

    /// True when the failure stems from the input rather than a dependency.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::TooShort { .. } | PipelineError::InfeasibleWindow(_)
        )
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("minimum clip length must be at least one second")]
    ZeroClipLength,

    #[error("minimum clip length {min}s exceeds maximum {max}s")]
    InvertedClipRange { min: u32, max: u32 },

    #[error("minimum source duration must be a finite, non-negative number (got {0})")]
    InvalidSourceFloor(f64),

    #[error("download timeout must be positive")]
    ZeroTimeout,

    #[error("{name} must not be empty")]
    EmptyCommand { name: &'static str },
}
