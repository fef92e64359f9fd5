//! Configuration loaded from the environment (and an optional `.env` file).

use crate::domain::error::ConfigError;
use crate::domain::window::ClipLengthRange;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_SOURCE_URL: &str = "https://portfoliotavm.com/n8n/milei/video.mp4";

/// A program plus its fixed leading arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Split a whitespace-separated command line. Returns `None` when empty.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(String::from);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

/// External tools the pipeline shells out to.
#[derive(Clone, Debug)]
pub struct ToolConfig {
    pub ffprobe: String,
    pub ffmpeg: String,
    /// Transcription command; the published clip path is appended
    pub transcribe: CommandSpec,
    /// Render command; takes no per-run arguments
    pub render: CommandSpec,
    /// Working directory for the transcription and render commands
    pub workdir: PathBuf,
}

/// Everything one clip pipeline run needs to know.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Remote location of the source video
    pub source_url: String,
    /// Local cache path of the source video
    pub source_path: PathBuf,
    /// Root under which per-request session directories are created
    pub clips_root: PathBuf,
    /// Directory holding the published clip and its transcription side-car
    pub public_dir: PathBuf,
    pub public_clip_name: String,
    /// Where the render tool writes the captioned video
    pub render_output: PathBuf,
    pub min_clip_secs: u32,
    pub max_clip_secs: u32,
    /// Sources shorter than this are rejected before any window is drawn
    pub min_source_secs: f64,
    pub download_timeout: Duration,
    /// Keep the session directory after a mid-pipeline failure
    pub retain_failed_sessions: bool,
    pub tools: ToolConfig,
}

impl PipelineConfig {
    pub fn clip_range(&self) -> ClipLengthRange {
        ClipLengthRange {
            min: self.min_clip_secs,
            max: self.max_clip_secs,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_clip_secs == 0 {
            return Err(ConfigError::ZeroClipLength);
        }
        if self.min_clip_secs > self.max_clip_secs {
            return Err(ConfigError::InvertedClipRange {
                min: self.min_clip_secs,
                max: self.max_clip_secs,
            });
        }
        if !self.min_source_secs.is_finite() || self.min_source_secs < 0.0 {
            return Err(ConfigError::InvalidSourceFloor(self.min_source_secs));
        }
        if self.download_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.tools.ffprobe.is_empty() {
            return Err(ConfigError::EmptyCommand { name: "FFPROBE_BIN" });
        }
        if self.tools.ffmpeg.is_empty() {
            return Err(ConfigError::EmptyCommand { name: "FFMPEG_BIN" });
        }
        Ok(())
    }

    /// Load pipeline settings from environment variables.
    pub fn from_env() -> Self {
        Self {
            source_url: env::var("SOURCE_URL").unwrap_or_else(|_| String::from(DEFAULT_SOURCE_URL)),
            source_path: env_path("SOURCE_PATH", "./video.mp4"),
            clips_root: env_path("CLIPS_DIR", "generated_clips"),
            public_dir: env_path("PUBLIC_DIR", "./public"),
            public_clip_name: env::var("PUBLIC_CLIP_NAME")
                .unwrap_or_else(|_| String::from("sample-video.mp4")),
            render_output: env_path("RENDER_OUTPUT", "out/CaptionedVideo.mp4"),
            min_clip_secs: env_parse("MIN_CLIP_SECS", 30),
            max_clip_secs: env_parse("MAX_CLIP_SECS", 60),
            min_source_secs: env_parse("MIN_SOURCE_SECS", 60.0),
            download_timeout: Duration::from_secs(env_parse("DOWNLOAD_TIMEOUT_SECS", 30)),
            retain_failed_sessions: env_parse("RETAIN_FAILED_SESSIONS", true),
            tools: ToolConfig {
                ffprobe: env::var("FFPROBE_BIN").unwrap_or_else(|_| String::from("ffprobe")),
                ffmpeg: env::var("FFMPEG_BIN").unwrap_or_else(|_| String::from("ffmpeg")),
                transcribe: env_command("TRANSCRIBE_CMD", "node ./sub.mjs"),
                render: env_command("RENDER_CMD", "npx remotion render"),
                workdir: env_path("TOOLS_WORKDIR", "."),
            },
        }
    }
}

/// Configuration for the HTTP server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Base directory of the allow-listed static directories
    pub static_root: PathBuf,
    pub allowed_static_dirs: Vec<String>,
    pub pipeline: PipelineConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            addr: env::var("ADDR").unwrap_or_else(|_| String::from("0.0.0.0")),
            port: env::var("PORT").unwrap_or_else(|_| String::from("7930")),
            static_root: env_path("STATIC_ROOT", "."),
            allowed_static_dirs: parse_list(
                &env::var("ALLOWED_STATIC_DIRS")
                    .unwrap_or_else(|_| String::from("out,public,assets,src")),
            ),
            pipeline: PipelineConfig::from_env(),
        }
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    PathBuf::from(env::var(key).unwrap_or_else(|_| String::from(default)))
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => parse_or(key, &raw, default),
        Err(_) => default,
    }
}

/// Parse `raw`, keeping `default` (with a warning) when it is malformed.
fn parse_or<T: FromStr>(key: &str, raw: &str, default: T) -> T {
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(key, value = raw, "unparseable setting, using default");
            default
        }
    }
}

fn env_command(key: &str, default: &str) -> CommandSpec {
    env::var(key)
        .ok()
        .and_then(|line| CommandSpec::parse(&line))
        .or_else(|| CommandSpec::parse(default))
        .unwrap_or(CommandSpec {
            program: String::new(),
            args: Vec::new(),
        })
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::path::Path;

    /// Pipeline settings rooted in `dir`, otherwise using the env defaults.
    pub fn pipeline_config_in(dir: &Path) -> PipelineConfig {
        PipelineConfig {
            source_url: String::from("http://example.invalid/video.mp4"),
            source_path: dir.join("video.mp4"),
            clips_root: dir.join("generated_clips"),
            public_dir: dir.join("public"),
            public_clip_name: String::from("sample-video.mp4"),
            render_output: dir.join("out/CaptionedVideo.mp4"),
            min_clip_secs: 30,
            max_clip_secs: 60,
            min_source_secs: 60.0,
            download_timeout: Duration::from_secs(5),
            retain_failed_sessions: true,
            tools: ToolConfig {
                ffprobe: String::from("ffprobe"),
                ffmpeg: String::from("ffmpeg"),
                transcribe: CommandSpec::parse("node ./sub.mjs").unwrap(),
                render: CommandSpec::parse("npx remotion render").unwrap(),
                workdir: dir.to_path_buf(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::pipeline_config_in;
    use super::*;

    #[test]
    fn test_command_spec_parse() {
        let spec = CommandSpec::parse("  npx remotion   render ").unwrap();
        assert_eq!(spec.program, "npx");
        assert_eq!(spec.args, vec!["remotion", "render"]);
        assert!(CommandSpec::parse("   ").is_none());
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("out, public,,assets "), vec!["out", "public", "assets"]);
    }

    #[test]
    fn test_validate() {
        let dir = std::env::temp_dir();
        let mut config = pipeline_config_in(&dir);
        assert!(config.validate().is_ok());

        config.min_clip_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroClipLength)));

        config.min_clip_secs = 90;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedClipRange { min: 90, max: 60 })
        ));

        config.min_clip_secs = 30;
        config.download_timeout = Duration::ZERO;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout)));
    }

    #[test]
    fn test_validate_rejects_unusable_source_floor() {
        let mut config = pipeline_config_in(&std::env::temp_dir());
        for floor in [f64::NAN, f64::INFINITY, -1.0] {
            config.min_source_secs = floor;
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidSourceFloor(_))
            ));
        }
        config.min_source_secs = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_setting_keeps_default() {
        assert_eq!(parse_or("MIN_CLIP_SECS", "thirty", 30u32), 30);
        assert!(!parse_or("RETAIN_FAILED_SESSIONS", "yes", false));
        assert_eq!(parse_or("MIN_SOURCE_SECS", " 90.5 ", 60.0), 90.5);
        assert_eq!(parse_or("MIN_CLIP_SECS", "", 30u32), 30);
    }

    #[test]
    fn test_clip_range() {
        let config = pipeline_config_in(&std::env::temp_dir());
        assert_eq!(config.clip_range(), ClipLengthRange { min: 30, max: 60 });
    }
}
