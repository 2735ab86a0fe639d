//! Media toolkit: duration probing, concatenation, mixing, video rendering
//! and image scaling.
//!
//! Stages talk to the [`MediaToolkit`] trait only. [`Ffmpeg`] implements it by
//! shelling out to `ffmpeg` and `ffprobe`; tests substitute a fake.

mod ffmpeg;
mod runner;

pub use ffmpeg::{
    concat_args, concat_manifest, format_seconds, mix_args, parse_duration, probe_args,
    scale_args, validation_args, video_args, Ffmpeg,
};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner};

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::config::{MixConfig, VideoConfig};
use crate::errors::Result;

/// Parameters of a narration/music mix.
#[derive(Debug, Clone, PartialEq)]
pub struct MixPlan {
    /// Gain applied to the narration, in dB.
    pub narration_gain_db: f64,
    /// Gain applied to the looped music, in dB.
    pub music_gain_db: f64,
    /// Output bitrate.
    pub bitrate: String,
    /// Hard output length, normally the narration duration.
    pub duration_seconds: f64,
}

impl MixPlan {
    /// Builds a plan from configuration and a probed duration.
    #[must_use]
    pub fn new(config: &MixConfig, duration_seconds: f64) -> Self {
        Self {
            narration_gain_db: config.narration_gain_db,
            music_gain_db: config.music_gain_db,
            bitrate: config.bitrate.clone(),
            duration_seconds,
        }
    }
}

/// Parameters of a still-image video render.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoPlan {
    /// Frame width.
    pub width: u32,
    /// Frame height.
    pub height: u32,
    /// AAC bitrate.
    pub audio_bitrate: String,
    /// Hard output length, normally the mixed audio duration.
    pub duration_seconds: f64,
}

impl VideoPlan {
    /// Builds a plan from configuration and a probed duration.
    #[must_use]
    pub fn new(config: &VideoConfig, duration_seconds: f64) -> Self {
        Self {
            width: config.width,
            height: config.height,
            audio_bitrate: config.audio_bitrate.clone(),
            duration_seconds,
        }
    }
}

/// Operations the pipeline needs from a media toolkit.
///
/// Every operation writes exactly the output path it is given; callers pass
/// scratch paths and publish afterwards.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Checks that the toolkit is installed and runnable.
    async fn validate(&self) -> Result<()>;

    /// Duration of a media file in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64>;

    /// Losslessly concatenates `inputs` in order, writing the concat list to `manifest`.
    async fn concat(&self, inputs: &[PathBuf], manifest: &Path, output: &Path) -> Result<()>;

    /// Mixes narration with a looped music track.
    async fn mix(&self, narration: &Path, music: &Path, output: &Path, plan: &MixPlan) -> Result<()>;

    /// Renders a still image with an audio track to video.
    async fn compose_video(&self, image: &Path, audio: &Path, output: &Path, plan: &VideoPlan) -> Result<()>;

    /// Scales an image to exactly `width`x`height`.
    async fn scale_image(&self, input: &Path, output: &Path, width: u32, height: u32) -> Result<()>;
}
