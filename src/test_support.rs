//! Scripted stand-ins for the external tools and the source fetcher.

use crate::domain::error::AcquisitionError;
use crate::domain::stage::test_support::create_mock_output;
use crate::ports::fetch::SourceFetcher;
use crate::ports::process::{CommandRunner, Invocation};
use async_trait::async_trait;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;

/// Stands in for ffprobe, ffmpeg, the transcriber and the renderer,
/// producing the files each real tool would leave behind.
pub(crate) struct ScriptedRunner {
    pub(crate) calls: StdMutex<Vec<Invocation>>,
    pub(crate) duration: String,
    pub(crate) probe_ok: bool,
    pub(crate) encode_ok: bool,
    pub(crate) transcribe_writes_sidecar: bool,
    pub(crate) render_ok: bool,
    pub(crate) render_output: PathBuf,
    /// Time the render step takes before writing its output
    pub(crate) render_delay: Duration,
}

impl ScriptedRunner {
    pub(crate) fn new(duration: &str, render_output: PathBuf) -> Self {
        Self {
            calls: StdMutex::new(Vec::new()),
            duration: duration.to_string(),
            probe_ok: true,
            encode_ok: true,
            transcribe_writes_sidecar: true,
            render_ok: true,
            render_output,
            render_delay: Duration::ZERO,
        }
    }

    pub(crate) fn programs(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.program.clone())
            .collect()
    }

    pub(crate) fn call(&self, program: &str) -> Option<Invocation> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.program == program)
            .cloned()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> io::Result<Output> {
        self.calls.lock().unwrap().push(invocation.clone());
        if invocation.program == "npx" && !self.render_delay.is_zero() {
            tokio::time::sleep(self.render_delay).await;
        }
        let last_arg = invocation.args.last().map(PathBuf::from);
        let output = match invocation.program.as_str() {
            "ffprobe" if self.probe_ok => create_mock_output(
                &format!(r#"{{"format": {{"duration": "{}"}}}}"#, self.duration),
                "",
                true,
            ),
            "ffprobe" => create_mock_output("", "Invalid data found", false),
            "ffmpeg" if self.encode_ok => {
                fs::write(last_arg.unwrap(), b"encoded clip")?;
                create_mock_output("", "", true)
            }
            "ffmpeg" => create_mock_output("", "Conversion failed!", false),
            "node" => {
                if self.transcribe_writes_sidecar {
                    fs::write(last_arg.unwrap().with_extension("json"), b"{\"captions\":[]}")?;
                }
                create_mock_output("", "", true)
            }
            "npx" if self.render_ok => {
                fs::create_dir_all(self.render_output.parent().unwrap())?;
                fs::write(&self.render_output, b"captioned")?;
                create_mock_output("", "", true)
            }
            "npx" => create_mock_output("", "render crashed", false),
            other => panic!("unexpected program {}", other),
        };
        Ok(output)
    }
}

pub(crate) struct CountingFetcher {
    pub(crate) calls: AtomicUsize,
    pub(crate) fail: bool,
}

impl CountingFetcher {
    pub(crate) fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }
}

#[async_trait]
impl SourceFetcher for CountingFetcher {
    async fn fetch_to(&self, url: &str, dest: &Path) -> Result<u64, AcquisitionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AcquisitionError::Status {
                url: url.to_string(),
                status: 404,
            });
        }
        fs::write(dest, b"source video bytes").unwrap();
        Ok(18)
    }
}
