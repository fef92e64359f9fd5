//! The clip pipeline: acquire, probe, select, encode, publish, transcribe, render.
//!
//! Stages run strictly in order and the first failure ends the run with a
//! stage-tagged `PipelineError`. Nothing is retried.

use crate::application::acquire::ensure_source;
use crate::application::session::{CleanupReport, PublishTargets, Session};
use crate::config::PipelineConfig;
use crate::domain::av::encode::encode_clip;
use crate::domain::av::probe::probe_duration;
use crate::domain::clip::{ClipReport, ClipResult, SourceVideo};
use crate::domain::error::PipelineError;
use crate::domain::stage::ExternalStage;
use crate::domain::window::select_window;
use crate::ports::fetch::SourceFetcher;
use crate::ports::process::{CommandRunner, Invocation};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{error, info, info_span, warn, Instrument};

pub struct ClipPipeline<F, R> {
    fetcher: F,
    runner: R,
    config: PipelineConfig,
    targets: PublishTargets,
    /// Serialises downloads into the shared source cache
    source_lock: Mutex<()>,
    /// Held from stale-artifact removal until final cleanup
    publish_lock: Mutex<()>,
}

impl<F, R> ClipPipeline<F, R>
where
    F: SourceFetcher,
    R: CommandRunner,
{
    pub fn new(fetcher: F, runner: R, config: PipelineConfig) -> Self {
        let targets = PublishTargets::from_config(&config);
        Self {
            fetcher,
            runner,
            config,
            targets,
            source_lock: Mutex::new(()),
            publish_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn targets(&self) -> &PublishTargets {
        &self.targets
    }

    /// Delete every session directory. Waits for an in-flight run to finish first.
    pub async fn clear_sessions(&self) -> io::Result<()> {
        let _publish = self.publish_lock.lock().await;
        match tokio::fs::remove_dir_all(&self.config.clips_root).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
            _ => {}
        }
        tokio::fs::create_dir_all(&self.config.clips_root).await
    }

    pub async fn generate_clip(&self) -> Result<ClipReport, PipelineError> {
        let mut rng = StdRng::from_entropy();
        self.generate_clip_with(&mut rng).await
    }

    /// Run the whole pipeline once, drawing the window from `rng`.
    pub async fn generate_clip_with(&self, rng: &mut StdRng) -> Result<ClipReport, PipelineError> {
        let result = self.run(rng).await;
        match &result {
            Ok(report) => info!(
                session = %report.session_id,
                start = report.clip.start_time,
                duration = report.clip.duration,
                "clip pipeline succeeded"
            ),
            Err(e) => error!(stage = %e.stage(), reason = e.reason(), error = %e, "clip pipeline failed"),
        }
        result
    }

    async fn run(&self, rng: &mut StdRng) -> Result<ClipReport, PipelineError> {
        // 1. Acquire source
        let source = {
            let _guard = self.source_lock.lock().await;
            ensure_source(
                &self.fetcher,
                &self.config.source_url,
                &self.config.source_path,
            )
            .await?
        };

        // 2. Probe and check the duration floor
        let duration = probe_duration(&self.runner, &self.config.tools.ffprobe, &source.path).await?;
        info!(duration, "source video probed");
        if duration < self.config.min_source_secs {
            return Err(PipelineError::TooShort {
                duration,
                minimum: self.config.min_source_secs,
            });
        }
        let source = source.with_duration(duration);

        // 3. Open session
        let _publish = self.publish_lock.lock().await;
        self.targets
            .clear_stale()
            .await
            .map_err(|source| PipelineError::Session {
                path: self.targets.clip.clone(),
                source,
            })?;
        let session =
            Session::open(&self.config.clips_root)
                .await
                .map_err(|source| PipelineError::Session {
                    path: self.config.clips_root.clone(),
                    source,
                })?;
        let session_id = session.id().to_string();

        let span = info_span!("session", id = %session_id);
        let outcome = self
            .run_session(&session, &source, rng)
            .instrument(span)
            .await;

        match outcome {
            Ok(clip) => {
                // 9. Cleanup & succeed
                let mut report = CleanupReport::default();
                report.remove_session(session).await;
                let report = report.merge(self.targets.discard_working_copies().await);
                report.log();
                Ok(ClipReport::new(session_id, &source, clip))
            }
            Err(e) => {
                self.abandon_session(session).await;
                Err(e)
            }
        }
    }

    async fn run_session(
        &self,
        session: &Session,
        source: &SourceVideo,
        rng: &mut StdRng,
    ) -> Result<ClipResult, PipelineError> {
        // 4. Select window
        let duration = source.duration.unwrap_or_default();
        let window = select_window(duration, self.config.clip_range(), rng)?;
        info!(start = window.start, end = window.end(), length = window.length, "window selected");

        // 5. Encode into the session
        let temp_clip =
            session.scratch_file(&format!("clip_temp_{}.mp4", rng.gen_range(1000..=9999)));
        encode_clip(
            &self.runner,
            &self.config.tools.ffmpeg,
            &source.path,
            &temp_clip,
            &window,
        )
        .await
        .map_err(PipelineError::Encode)?;

        // 6. Publish
        publish(&temp_clip, &self.targets.clip)
            .await
            .map_err(|source| PipelineError::Publish {
                path: self.targets.clip.clone(),
                source,
            })?;

        // 7. Transcribe
        let tools = &self.config.tools;
        let transcribe = Invocation::new(&tools.transcribe.program)
            .args(&tools.transcribe.args)
            .arg(&self.targets.clip)
            .current_dir(&tools.workdir);
        info!("running transcription");
        ExternalStage::new("transcribe", transcribe)
            .expecting(&self.targets.sidecar)
            .run(&self.runner)
            .await
            .map_err(PipelineError::Transcription)?;

        // 8. Render
        let render = Invocation::new(&tools.render.program)
            .args(&tools.render.args)
            .current_dir(&tools.workdir);
        info!("running render");
        ExternalStage::new("render", render)
            .run(&self.runner)
            .await
            .map_err(PipelineError::Render)?;
        if !tokio::fs::try_exists(&self.targets.render_output)
            .await
            .unwrap_or(false)
        {
            warn!(path = %self.targets.render_output.display(), "render finished without its expected output");
        }

        let public_name = &self.config.public_clip_name;
        Ok(ClipResult::new(
            public_name.clone(),
            &window,
            format!("/public/{}", public_name),
            self.targets.clip.display().to_string(),
            self.targets.render_output.display().to_string(),
        ))
    }

    /// Failure-path policy for a session that was already created.
    async fn abandon_session(&self, session: Session) {
        if self.config.retain_failed_sessions {
            warn!(dir = %session.dir().display(), "keeping session directory of failed run");
            return;
        }
        let mut report = CleanupReport::default();
        report.remove_session(session).await;
        report.log();
    }
}

/// Move the encoded clip into place; fall back to copy when rename is not possible.
async fn publish(from: &Path, to: &Path) -> io::Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    tokio::fs::remove_file(from).await
}
