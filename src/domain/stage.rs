//! Uniform contract for pipeline steps backed by an external process.
//!
//! A stage is an invocation plus an optional artifact the process must leave
//! behind. Running it yields the captured output on success, or an
//! `ExternalStageError` describing which part of the contract was broken.

use super::error::ExternalStageError;
use crate::ports::process::{CommandRunner, Invocation};
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ExternalStage {
    pub name: &'static str,
    pub invocation: Invocation,
    pub expected_artifact: Option<PathBuf>,
}

/// Captured output of a successful stage run.
#[derive(Debug, Clone, Default)]
pub struct StageOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ExternalStage {
    pub fn new(name: &'static str, invocation: Invocation) -> Self {
        Self {
            name,
            invocation,
            expected_artifact: None,
        }
    }

    pub fn expecting(mut self, artifact: impl Into<PathBuf>) -> Self {
        self.expected_artifact = Some(artifact.into());
        self
    }

    pub async fn run<R>(&self, runner: &R) -> Result<StageOutput, ExternalStageError>
    where
        R: CommandRunner + ?Sized,
    {
        debug!(
            stage = self.name,
            program = %self.invocation.program,
            args = ?self.invocation.arg_strings(),
            "running external stage"
        );

        let output =
            runner
                .run(&self.invocation)
                .await
                .map_err(|source| ExternalStageError::Spawn {
                    stage: self.name,
                    program: self.invocation.program.clone(),
                    source,
                })?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            warn!(stage = self.name, status = %output.status, %stderr, "external stage failed");
            return Err(ExternalStageError::ExitStatus {
                stage: self.name,
                program: self.invocation.program.clone(),
                code: output.status.code(),
                stderr,
            });
        }

        if let Some(path) = &self.expected_artifact {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                return Err(ExternalStageError::MissingArtifact {
                    stage: self.name,
                    path: path.clone(),
                });
            }
        }

        Ok(StageOutput {
            stdout: output.stdout,
            stderr,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::os::unix::process::ExitStatusExt;
    use std::process::{ExitStatus, Output};

    pub fn create_mock_output(stdout: &str, stderr: &str, success: bool) -> Output {
        Output {
            // Raw wait status: exit code lives in the high byte.
            status: if success {
                ExitStatus::from_raw(0)
            } else {
                ExitStatus::from_raw(1 << 8)
            },
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }
}
