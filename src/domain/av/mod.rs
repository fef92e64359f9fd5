//! Audio/Video domain modules: ffprobe and ffmpeg invocations.

pub mod encode;
pub mod probe;

use crate::domain::stage::ExternalStage;
use crate::ports::process::{CommandRunner, Invocation};

/// True when `<program> -version` runs and exits zero.
pub async fn tool_available<R>(runner: &R, program: &str) -> bool
where
    R: CommandRunner + ?Sized,
{
    ExternalStage::new("health", Invocation::new(program).arg("-version"))
        .run(runner)
        .await
        .is_ok()
}
