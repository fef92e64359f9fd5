use crate::ports::process::{CommandRunner, Invocation};
use async_trait::async_trait;
use std::io;
use std::process::{Output, Stdio};
use tokio::process::Command as TokioCommand;

/// Runs invocations as real child processes.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, invocation: &Invocation) -> io::Result<Output> {
        let mut command = TokioCommand::new(&invocation.program);
        command.args(&invocation.args).stdin(Stdio::null());
        if let Some(dir) = &invocation.current_dir {
            command.current_dir(dir);
        }
        command.output().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_captures_output_and_status() {
        let runner = TokioCommandRunner::new();
        let inv = Invocation::new("sh")
            .arg("-c")
            .arg("echo out; echo err 1>&2; exit 3");

        let output = runner.run(&inv).await.unwrap();
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(String::from_utf8_lossy(&output.stdout), "out\n");
        assert_eq!(String::from_utf8_lossy(&output.stderr), "err\n");
    }

    #[tokio::test]
    async fn test_runs_in_working_directory() {
        let dir = tempdir().unwrap();
        let runner = TokioCommandRunner::new();
        let inv = Invocation::new("sh")
            .arg("-c")
            .arg("touch marker")
            .current_dir(dir.path());

        let output = runner.run(&inv).await.unwrap();
        assert!(output.status.success());
        assert!(dir.path().join("marker").exists());
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let runner = TokioCommandRunner::new();
        let inv = Invocation::new("definitely-not-a-real-program-name");
        let err = runner.run(&inv).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
