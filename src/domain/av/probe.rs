use crate::domain::error::ProbeError;
use crate::domain::stage::ExternalStage;
use crate::ports::process::{CommandRunner, Invocation};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ProbeReport {
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<Value>,
}

pub fn probe_invocation(ffprobe: &str, media_path: &Path) -> Invocation {
    Invocation::new(ffprobe)
        .args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(media_path)
}

/// Total duration of `media_path` in seconds, as reported by ffprobe.
pub async fn probe_duration<R>(
    runner: &R,
    ffprobe: &str,
    media_path: &Path,
) -> Result<f64, ProbeError>
where
    R: CommandRunner + ?Sized,
{
    let output = ExternalStage::new("probe", probe_invocation(ffprobe, media_path))
        .run(runner)
        .await?;
    parse_duration(&output.stdout)
}

/// Extract `format.duration` from ffprobe's JSON output.
pub fn parse_duration(stdout: &[u8]) -> Result<f64, ProbeError> {
    let report: ProbeReport = serde_json::from_slice(stdout)?;
    let raw = report
        .format
        .and_then(|format| format.duration)
        .ok_or(ProbeError::MissingDuration)?;

    // ffprobe prints the duration as a string; accept a bare number as well.
    let duration = match &raw {
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ProbeError::InvalidDuration(s.clone()))?,
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ProbeError::InvalidDuration(n.to_string()))?,
        other => return Err(ProbeError::InvalidDuration(other.to_string())),
    };

    if !duration.is_finite() || duration < 0.0 {
        return Err(ProbeError::InvalidDuration(raw.to_string()));
    }
    Ok(duration)
}
