use crate::domain::error::ExternalStageError;
use crate::domain::stage::ExternalStage;
use crate::domain::window::ClipWindow;
use crate::ports::process::{CommandRunner, Invocation};
use std::path::Path;
use tracing::{debug, info};

/// Centre crop of the full frame height to a 9:16 portrait frame.
pub const VERTICAL_CROP_FILTER: &str = "crop=ih*9/16:ih";

pub const ASPECT_RATIO: &str = "9:16";

/// Fixed codec pair and speed-oriented preset for every clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeProfile {
    pub video_codec: &'static str,
    pub audio_codec: &'static str,
    pub preset: &'static str,
}

pub const VERTICAL_PROFILE: EncodeProfile = EncodeProfile {
    video_codec: "libx264",
    audio_codec: "aac",
    preset: "fast",
};

/// Width of the frame produced by `VERTICAL_CROP_FILTER` for a source of `height`.
///
/// ffmpeg truncates the expression and then rounds the width down to the chroma
/// subsampling of yuv420p, i.e. to an even number.
#[cfg(test)]
pub(crate) fn vertical_crop_width(height: u32) -> u32 {
    let width = (height as u64 * 9 / 16) as u32;
    width & !1
}

pub fn encode_invocation(
    ffmpeg: &str,
    source: &Path,
    output: &Path,
    window: &ClipWindow,
) -> Invocation {
    Invocation::new(ffmpeg)
        .arg("-y")
        .arg("-ss")
        .arg(format!("{:.3}", window.start))
        .arg("-i")
        .arg(source)
        .arg("-t")
        .arg(window.length.to_string())
        .arg("-vf")
        .arg(VERTICAL_CROP_FILTER)
        .arg("-c:v")
        .arg(VERTICAL_PROFILE.video_codec)
        .arg("-c:a")
        .arg(VERTICAL_PROFILE.audio_codec)
        .arg("-preset")
        .arg(VERTICAL_PROFILE.preset)
        .arg(output)
}

/// Cut `window` out of `source` into a vertical clip at `output`, overwriting it.
pub async fn encode_clip<R>(
    runner: &R,
    ffmpeg: &str,
    source: &Path,
    output: &Path,
    window: &ClipWindow,
) -> Result<(), ExternalStageError>
where
    R: CommandRunner + ?Sized,
{
    let out = ExternalStage::new("encode", encode_invocation(ffmpeg, source, output, window))
        .run(runner)
        .await?;
    debug!(stderr = %out.stderr, "ffmpeg diagnostics");

    info!(
        start = window.start,
        length = window.length,
        output = %output.display(),
        "clip encoded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stage::test_support::create_mock_output;
    use crate::ports::process::MockCommandRunner;
    use std::path::PathBuf;

    fn window() -> ClipWindow {
        ClipWindow {
            start: 12.3456,
            length: 42,
        }
    }

    #[test]
    fn test_encode_arguments() {
        let inv = encode_invocation(
            "ffmpeg",
            Path::new("./video.mp4"),
            Path::new("generated_clips/s/clip_temp_1234.mp4"),
            &window(),
        );
        assert_eq!(inv.program, "ffmpeg");
        assert_eq!(
            inv.arg_strings(),
            vec![
                "-y",
                "-ss",
                "12.346",
                "-i",
                "./video.mp4",
                "-t",
                "42",
                "-vf",
                "crop=ih*9/16:ih",
                "-c:v",
                "libx264",
                "-c:a",
                "aac",
                "-preset",
                "fast",
                "generated_clips/s/clip_temp_1234.mp4",
            ]
        );
    }

    #[test]
    fn test_crop_width_is_nine_sixteenths_of_height() {
        for height in [240u32, 360, 480, 720, 1080, 1440, 2160, 1081, 999] {
            let width = vertical_crop_width(height);
            let exact = height as f64 * 9.0 / 16.0;
            assert!(
                (exact - width as f64).abs() <= 2.0,
                "height {} gave width {}",
                height,
                width
            );
            assert_eq!(width % 2, 0);
        }
        assert_eq!(vertical_crop_width(1920), 1080);
        assert_eq!(vertical_crop_width(1080), 606);
    }

    #[tokio::test]
    async fn test_encode_clip_success() {
        let out = PathBuf::from("out.mp4");
        let expected_out = out.clone();
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(move |inv| inv.args.last() == Some(&expected_out.clone().into_os_string()))
            .times(1)
            .returning(|_| Ok(create_mock_output("", "frame=  100", true)));

        encode_clip(&runner, "ffmpeg", Path::new("in.mp4"), &out, &window())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_encode_clip_failure_carries_stderr() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .times(1)
            .returning(|_| Ok(create_mock_output("", "Invalid data found", false)));

        let err = encode_clip(
            &runner,
            "ffmpeg",
            Path::new("in.mp4"),
            Path::new("out.mp4"),
            &window(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Invalid data found"));
    }
}
