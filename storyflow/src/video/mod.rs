//! Still-image video rendering.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::VideoConfig;
use crate::errors::Result;
use crate::media::{MediaToolkit, VideoPlan};
use crate::pipeline::ScratchSpace;

const OUTPUT_FILE: &str = "video.mp4";

/// Renders a thumbnail and a mixed track into an mp4.
pub struct VideoComposer {
    toolkit: Arc<dyn MediaToolkit>,
    config: VideoConfig,
}

impl VideoComposer {
    /// Creates a composer.
    #[must_use]
    pub fn new(toolkit: Arc<dyn MediaToolkit>, config: VideoConfig) -> Self {
        Self { toolkit, config }
    }

    /// Writes the video into `scratch` and returns its path. The video is cut
    /// to the probed audio duration.
    pub async fn compose(&self, image: &Path, audio: &Path, scratch: &ScratchSpace) -> Result<PathBuf> {
        let duration = self.toolkit.probe_duration(audio).await?;
        let plan = VideoPlan::new(&self.config, duration);
        info!(
            duration_s = duration,
            width = plan.width,
            height = plan.height,
            "Rendering video"
        );

        let output = scratch.path(OUTPUT_FILE);
        self.toolkit.compose_video(image, audio, &output, &plan).await?;
        Ok(output)
    }
}

impl std::fmt::Debug for VideoComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoComposer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeToolkit;

    #[tokio::test]
    async fn test_video_duration_follows_audio() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("fox.png");
        let audio = dir.path().join("fox.mp3");
        std::fs::write(&image, b"png").unwrap();
        std::fs::write(&audio, b"mp3").unwrap();
        let scratch = ScratchSpace::create(dir.path(), "fox").unwrap();
        let toolkit = Arc::new(FakeToolkit::new().with_duration(&audio, 42.5));

        let output = VideoComposer::new(toolkit.clone(), VideoConfig::default())
            .compose(&image, &audio, &scratch)
            .await
            .unwrap();

        assert!(output.exists());
        let plan = toolkit.video_plans().pop().unwrap();
        assert!((plan.duration_seconds - 42.5).abs() < f64::EPSILON);
        assert_eq!((plan.width, plan.height), (1920, 1080));
        let rendered = toolkit.probe_duration(&output).await.unwrap();
        assert!((rendered - 42.5).abs() < 0.1);
    }

    #[tokio::test]
    async fn test_probe_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::create(dir.path(), "fox").unwrap();
        let toolkit = Arc::new(FakeToolkit::new().fail_on("probe", "fox.mp3"));

        let err = VideoComposer::new(toolkit, VideoConfig::default())
            .compose(&dir.path().join("fox.png"), &dir.path().join("fox.mp3"), &scratch)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "ToolInvocationError");
    }
}
