//! Pipeline configuration.
//!
//! Every field carries a default so an empty JSON object (or no file at all)
//! yields the stock layout: `stories/`, `images/`, `narrations/`, `mixed/`,
//! `videos/`, `temp/` and `background/background.m4a` under the project root.

mod credentials;

pub use credentials::{Credentials, ELEVENLABS_API_KEY_VAR, OPENAI_API_KEY_VAR};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{Result, StoryflowError};
use crate::pipeline::RetryConfig;

/// File name looked up in the project root when no config path is given.
pub const DEFAULT_CONFIG_FILE: &str = "storyflow.json";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory layout of the artifact store.
    pub layout: LayoutConfig,
    /// Speech synthesis settings.
    pub narration: NarrationConfig,
    /// Music bed settings.
    pub mix: MixConfig,
    /// Thumbnail generation settings.
    pub thumbnail: ThumbnailConfig,
    /// Video rendering settings.
    pub video: VideoConfig,
    /// Retry policy for remote collaborators.
    pub retry: RetryConfig,
}

impl PipelineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| StoryflowError::configuration(format!("invalid configuration: {e}")))
    }

    /// Loads configuration for a project.
    ///
    /// An explicit path must exist. Without one, `<root>/storyflow.json` is used
    /// when present, otherwise defaults apply.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let candidate = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let default = root.join(DEFAULT_CONFIG_FILE);
                default.is_file().then_some(default)
            }
        };

        let Some(path) = candidate else {
            tracing::debug!(root = %root.display(), "No configuration file, using defaults");
            return Ok(Self::new());
        };

        let text = std::fs::read_to_string(&path).map_err(|e| {
            StoryflowError::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Self::from_json(&text)
    }

    /// Sets the speech voice.
    #[must_use]
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.narration.voice = Some(voice.into());
        self
    }

    /// Sets the speech provider.
    #[must_use]
    pub fn with_provider(mut self, provider: SpeechProvider) -> Self {
        self.narration.provider = provider;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Directory and file names of the artifact store, relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Story scripts (`<story>.md`).
    pub stories_dir: PathBuf,
    /// Thumbnails (`<story>.png`).
    pub images_dir: PathBuf,
    /// Narrations (`<story>.mp3`).
    pub narrations_dir: PathBuf,
    /// Narration mixed with music (`<story>.mp3`).
    pub mixed_dir: PathBuf,
    /// Rendered videos (`<story>.mp4`).
    pub videos_dir: PathBuf,
    /// Scratch area, partitioned per story.
    pub temp_dir: PathBuf,
    /// Shared background music track.
    pub background_music: Option<PathBuf>,
    /// Extension of story scripts.
    pub story_extension: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            stories_dir: PathBuf::from("stories"),
            images_dir: PathBuf::from("images"),
            narrations_dir: PathBuf::from("narrations"),
            mixed_dir: PathBuf::from("mixed"),
            videos_dir: PathBuf::from("videos"),
            temp_dir: PathBuf::from("temp"),
            background_music: Some(PathBuf::from("background/background.m4a")),
            story_extension: "md".to_string(),
        }
    }
}

/// Which speech service narrates the stories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechProvider {
    /// OpenAI speech endpoint.
    #[default]
    OpenAi,
    /// ElevenLabs text-to-speech.
    ElevenLabs,
}

impl SpeechProvider {
    /// Voice used when none is configured.
    #[must_use]
    pub fn default_voice(self) -> &'static str {
        match self {
            Self::OpenAi => "alloy",
            Self::ElevenLabs => "EXAVITQu4vr4xnSDxMaL",
        }
    }

    /// Model used when none is configured.
    #[must_use]
    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "tts-1",
            Self::ElevenLabs => "eleven_multilingual_v2",
        }
    }
}

impl fmt::Display for SpeechProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::ElevenLabs => write!(f, "elevenlabs"),
        }
    }
}

impl FromStr for SpeechProvider {
    type Err = StoryflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "elevenlabs" | "eleven_labs" => Ok(Self::ElevenLabs),
            other => Err(StoryflowError::configuration(format!(
                "unknown speech provider '{other}' (expected openai or elevenlabs)"
            ))),
        }
    }
}

/// Speech synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrationConfig {
    /// Speech service.
    pub provider: SpeechProvider,
    /// Voice name or id; provider default when absent.
    pub voice: Option<String>,
    /// Model name; provider default when absent.
    pub model: Option<String>,
    /// Character ceiling per synthesis request.
    pub max_chunk_chars: usize,
    /// Pause between successive chunk submissions, in milliseconds.
    pub chunk_delay_ms: u64,
    /// HTTP request timeout, in seconds.
    pub request_timeout_seconds: f64,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            provider: SpeechProvider::default(),
            voice: None,
            model: None,
            max_chunk_chars: 4000,
            chunk_delay_ms: 500,
            request_timeout_seconds: 120.0,
        }
    }
}

impl NarrationConfig {
    /// The voice that will actually be used.
    #[must_use]
    pub fn effective_voice(&self) -> String {
        self.voice
            .clone()
            .unwrap_or_else(|| self.provider.default_voice().to_string())
    }

    /// The model that will actually be used.
    #[must_use]
    pub fn effective_model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.provider.default_model().to_string())
    }

    /// Delay between chunk submissions.
    #[must_use]
    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }

    /// HTTP timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_seconds)
    }
}

/// Music bed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MixConfig {
    /// Gain applied to the narration, in dB.
    pub narration_gain_db: f64,
    /// Gain applied to the music, in dB.
    pub music_gain_db: f64,
    /// Output bitrate for the mixed mp3.
    pub bitrate: String,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            narration_gain_db: 5.0,
            music_gain_db: -15.0,
            bitrate: "192k".to_string(),
        }
    }
}

/// Thumbnail generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Image model.
    pub model: String,
    /// Size requested from the image service.
    pub request_size: String,
    /// Quality requested from the image service.
    pub quality: String,
    /// Final stored width.
    pub width: u32,
    /// Final stored height.
    pub height: u32,
    /// Text placed before the scene prompt.
    pub style_prefix: String,
    /// Text placed after the scene prompt.
    pub style_suffix: String,
    /// HTTP request timeout, in seconds.
    pub request_timeout_seconds: f64,
    /// Optional JSON object mapping story names to scene prompts, relative
    /// to the project root. Stories without an entry use their title.
    pub prompts_file: Option<PathBuf>,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            model: "dall-e-3".to_string(),
            request_size: "1792x1024".to_string(),
            quality: "hd".to_string(),
            width: 1600,
            height: 900,
            style_prefix: "Classical oil painting style fairy tale illustration \
                           in the style of Pre-Raphaelite masters. "
                .to_string(),
            style_suffix: "\nWarm color palette with rich tones and detailed brushwork \
                           texture like a Renaissance masterpiece. \
                           No text, no words, no letters anywhere in the image."
                .to_string(),
            request_timeout_seconds: 180.0,
            prompts_file: Some(PathBuf::from("prompts.json")),
        }
    }
}

impl ThumbnailConfig {
    /// HTTP timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_seconds)
    }
}

/// Video rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Output frame width.
    pub width: u32,
    /// Output frame height.
    pub height: u32,
    /// Audio bitrate of the AAC track.
    pub audio_bitrate: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            audio_bitrate: "192k".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{BackoffStrategy, JitterStrategy};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::new();
        assert_eq!(config.narration.max_chunk_chars, 4000);
        assert_eq!(config.narration.chunk_delay_ms, 500);
        assert!((config.mix.narration_gain_db - 5.0).abs() < f64::EPSILON);
        assert!((config.mix.music_gain_db + 15.0).abs() < f64::EPSILON);
        assert_eq!((config.video.width, config.video.height), (1920, 1080));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 2000);
        assert_eq!(config.retry.backoff_strategy, BackoffStrategy::Constant);
        assert_eq!(config.retry.jitter_strategy, JitterStrategy::None);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json(
            r#"{"mix": {"music_gain_db": -20.0}, "narration": {"provider": "eleven_labs"}}"#,
        )
        .unwrap();

        assert!((config.mix.music_gain_db + 20.0).abs() < f64::EPSILON);
        assert!((config.mix.narration_gain_db - 5.0).abs() < f64::EPSILON);
        assert_eq!(config.narration.provider, SpeechProvider::ElevenLabs);
        assert_eq!(config.layout.narrations_dir, PathBuf::from("narrations"));
    }

    #[test]
    fn test_invalid_json_is_fatal() {
        let err = PipelineConfig::from_json("{not json").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::load(dir.path(), None).unwrap();
        assert_eq!(config.narration.max_chunk_chars, 4000);
    }

    #[test]
    fn test_load_picks_up_project_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            r#"{"narration": {"voice": "nova"}}"#,
        )
        .unwrap();

        let config = PipelineConfig::load(dir.path(), None).unwrap();
        assert_eq!(config.narration.effective_voice(), "nova");
    }

    #[test]
    fn test_load_missing_explicit_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::load(dir.path(), Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_provider_defaults_and_parsing() {
        assert_eq!("openai".parse::<SpeechProvider>().unwrap(), SpeechProvider::OpenAi);
        assert_eq!(
            "ElevenLabs".parse::<SpeechProvider>().unwrap(),
            SpeechProvider::ElevenLabs
        );
        assert!("gemini".parse::<SpeechProvider>().is_err());

        let narration = NarrationConfig::default();
        assert_eq!(narration.effective_voice(), "alloy");
        assert_eq!(narration.effective_model(), "tts-1");
    }
}
