//! Per-request scratch workspaces and the published artifact locations.

use crate::config::PipelineConfig;
use chrono::Utc;
use regex::Regex;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// UTC time-based session identifier with microsecond resolution, e.g. `20250301_142530_123456`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Utc::now().format("%Y%m%d_%H%M%S_%6f").to_string())
    }

    /// Accept only strings with the shape `generate` produces.
    pub fn parse(raw: &str) -> Option<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let re = PATTERN.get_or_init(|| Regex::new(r"^\d{8}_\d{6}_\d{3,6}$").unwrap());
        re.is_match(raw).then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A uniquely named scratch directory owned by one pipeline run.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    dir: PathBuf,
}

impl Session {
    /// Create the session directory under `clips_root`. An existing directory
    /// with the same name is reused.
    pub async fn open(clips_root: &Path) -> io::Result<Self> {
        let id = SessionId::generate();
        let dir = clips_root.join(id.as_str());
        tokio::fs::create_dir_all(&dir).await?;
        debug!(session = %id, dir = %dir.display(), "session opened");
        Ok(Self { id, dir })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn scratch_file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Remove the session directory and everything in it.
    pub async fn close(self) -> io::Result<()> {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => {
                debug!(session = %self.id, "session removed");
                Ok(())
            }
        }
    }
}

/// Fixed locations a run publishes to and the downstream tools read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTargets {
    /// Published clip, input of the transcription and render tools
    pub clip: PathBuf,
    /// Transcription side-car written next to the clip
    pub sidecar: PathBuf,
    /// Captioned video written by the render tool
    pub render_output: PathBuf,
}

impl PublishTargets {
    pub fn from_config(config: &PipelineConfig) -> Self {
        let clip = config.public_dir.join(&config.public_clip_name);
        Self {
            sidecar: sidecar_path(&clip),
            clip,
            render_output: config.render_output.clone(),
        }
    }

    /// Remove leftovers of a previous run. Must succeed before encoding starts.
    pub async fn clear_stale(&self) -> io::Result<()> {
        if let Some(parent) = self.clip.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        for path in [&self.clip, &self.sidecar] {
            match tokio::fs::remove_file(path).await {
                Ok(()) => debug!(path = %path.display(), "removed stale artifact"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Best-effort removal of the working copies once the render has consumed them.
    pub async fn discard_working_copies(&self) -> CleanupReport {
        let mut report = CleanupReport::default();
        for path in [&self.clip, &self.sidecar] {
            report.remove_file(path).await;
        }
        report
    }
}

/// Side-car transcription file for a clip: same stem, `.json` extension.
pub fn sidecar_path(clip: &Path) -> PathBuf {
    clip.with_extension("json")
}

/// Outcome of a best-effort cleanup step. Failures are recorded, never raised.
#[derive(Debug, Default)]
#[must_use]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, io::Error)>,
}

impl CleanupReport {
    pub async fn remove_file(&mut self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => self.removed.push(path.to_path_buf()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => self.failed.push((path.to_path_buf(), e)),
        }
    }

    pub async fn remove_session(&mut self, session: Session) {
        let dir = session.dir().to_path_buf();
        match session.close().await {
            Ok(()) => self.removed.push(dir),
            Err(e) => self.failed.push((dir, e)),
        }
    }

    pub fn merge(mut self, other: CleanupReport) -> Self {
        self.removed.extend(other.removed);
        self.failed.extend(other.failed);
        self
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Log every failure at warn level and hand back the number of failures.
    pub fn log(&self) -> usize {
        for (path, error) in &self.failed {
            warn!(path = %path.display(), %error, "cleanup failed");
        }
        for path in &self.removed {
            debug!(path = %path.display(), "cleaned up");
        }
        if self.is_clean() {
            debug!(removed = self.removed.len(), "cleanup complete");
        }
        self.failed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::pipeline_config_in;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_session_id_shape() {
        let id = SessionId::generate();
        assert!(SessionId::parse(id.as_str()).is_some(), "{}", id);
        assert_eq!(id.as_str().len(), "20250101_120000_000000".len());
    }

    #[test]
    fn test_session_id_uses_utc_clock() {
        let id = SessionId::generate();
        let stamped =
            chrono::NaiveDateTime::parse_from_str(&id.as_str()[..15], "%Y%m%d_%H%M%S").unwrap();
        let drift = (Utc::now().naive_utc() - stamped).num_seconds().abs();
        assert!(drift <= 5, "{} is {}s away from UTC now", id, drift);
    }

    #[test]
    fn test_session_id_rejects_traversal() {
        assert!(SessionId::parse("..").is_none());
        assert!(SessionId::parse("20250101_120000_000000/..").is_none());
        assert!(SessionId::parse("../20250101_120000_000000").is_none());
        assert!(SessionId::parse("20250101_120000_123").is_some());
    }

    #[tokio::test]
    async fn test_session_open_and_close() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("generated_clips");

        let session = Session::open(&root).await.unwrap();
        assert!(session.dir().is_dir());
        assert!(session.dir().starts_with(&root));

        fs::write(session.scratch_file("clip_temp_1234.mp4"), b"x").unwrap();
        let session_dir = session.dir().to_path_buf();
        session.close().await.unwrap();
        assert!(!session_dir.exists());
        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn test_session_open_is_idempotent_on_existing_dir() {
        let dir = tempdir().unwrap();
        let session = Session::open(dir.path()).await.unwrap();
        tokio::fs::create_dir_all(session.dir()).await.unwrap();
        assert!(session.dir().is_dir());
    }

    #[test]
    fn test_targets_from_config() {
        let dir = tempdir().unwrap();
        let targets = PublishTargets::from_config(&pipeline_config_in(dir.path()));
        assert_eq!(targets.clip, dir.path().join("public/sample-video.mp4"));
        assert_eq!(targets.sidecar, dir.path().join("public/sample-video.json"));
        assert_eq!(targets.render_output, dir.path().join("out/CaptionedVideo.mp4"));
    }

    #[tokio::test]
    async fn test_clear_stale_removes_previous_run() {
        let dir = tempdir().unwrap();
        let targets = PublishTargets::from_config(&pipeline_config_in(dir.path()));

        // No public directory yet: created, nothing to remove.
        targets.clear_stale().await.unwrap();
        assert!(dir.path().join("public").is_dir());

        fs::write(&targets.clip, b"old clip").unwrap();
        fs::write(&targets.sidecar, b"{}").unwrap();
        targets.clear_stale().await.unwrap();
        assert!(!targets.clip.exists());
        assert!(!targets.sidecar.exists());
    }

    #[tokio::test]
    async fn test_discard_working_copies_reports_failures() {
        let dir = tempdir().unwrap();
        let mut targets = PublishTargets::from_config(&pipeline_config_in(dir.path()));
        fs::create_dir_all(dir.path().join("public")).unwrap();
        fs::write(&targets.clip, b"clip").unwrap();
        // A directory cannot be removed with remove_file.
        targets.sidecar = dir.path().join("public/not-a-file");
        fs::create_dir_all(&targets.sidecar).unwrap();

        let report = targets.discard_working_copies().await;
        assert_eq!(report.removed, vec![targets.clip.clone()]);
        assert_eq!(report.failed.len(), 1);
        assert!(!report.is_clean());
        assert_eq!(report.log(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_report_merges() {
        let dir = tempdir().unwrap();
        let session = Session::open(dir.path()).await.unwrap();
        let mut first = CleanupReport::default();
        first.remove_session(session).await;
        let merged = first.merge(CleanupReport::default());
        assert_eq!(merged.removed.len(), 1);
        assert!(merged.is_clean());
    }
}
