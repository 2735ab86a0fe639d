//! Narration over a looped background music bed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::MixConfig;
use crate::errors::Result;
use crate::media::{MediaToolkit, MixPlan};
use crate::pipeline::ScratchSpace;

const OUTPUT_FILE: &str = "mixed.mp3";

/// Mixes a narration with the shared music track.
pub struct AudioMixer {
    toolkit: Arc<dyn MediaToolkit>,
    config: MixConfig,
}

impl AudioMixer {
    /// Creates a mixer.
    #[must_use]
    pub fn new(toolkit: Arc<dyn MediaToolkit>, config: MixConfig) -> Self {
        Self { toolkit, config }
    }

    /// Writes the mixed track into `scratch` and returns its path.
    ///
    /// Without music the narration is copied byte for byte. With music, the
    /// output is exactly as long as the narration.
    pub async fn mix(&self, narration: &Path, music: Option<&Path>, scratch: &ScratchSpace) -> Result<PathBuf> {
        let output = scratch.path(OUTPUT_FILE);

        let Some(music) = music else {
            info!(narration = %narration.display(), "No background music, copying narration");
            tokio::fs::copy(narration, &output).await?;
            return Ok(output);
        };

        let duration = self.toolkit.probe_duration(narration).await?;
        let plan = MixPlan::new(&self.config, duration);
        info!(
            duration_s = duration,
            narration_gain_db = plan.narration_gain_db,
            music_gain_db = plan.music_gain_db,
            "Mixing narration with background music"
        );
        self.toolkit.mix(narration, music, &output, &plan).await?;
        Ok(output)
    }
}

impl std::fmt::Debug for AudioMixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioMixer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
