//! Narration: turning a story script into one audio file.
//!
//! The script is cleaned of markup, split into bounded chunks, and each chunk
//! is sent to a [`SpeechSynthesizer`]. Chunk audio is then renamed or
//! losslessly concatenated into the narration.

#[cfg(feature = "providers")]
mod elevenlabs;
#[cfg(feature = "providers")]
mod openai;
mod synthesizer;
mod text;

#[cfg(feature = "providers")]
pub use elevenlabs::ElevenLabsSpeech;
#[cfg(feature = "providers")]
pub use openai::OpenAiSpeech;
pub use synthesizer::NarrationSynthesizer;
pub use text::{chunk_text, clean_story_text, DEFAULT_MAX_CHUNK_CHARS};

use async_trait::async_trait;

use crate::errors::ServiceError;

/// A remote text-to-speech collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesizes `text` with `voice` and returns encoded mp3 bytes.
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, ServiceError>;
}

/// Builds the speech client for the configured provider.
#[cfg(feature = "providers")]
pub fn speech_client(
    config: &crate::config::NarrationConfig,
    credentials: &crate::config::Credentials,
) -> crate::errors::Result<std::sync::Arc<dyn SpeechSynthesizer>> {
    use crate::config::SpeechProvider;

    let key = credentials.require_speech(config.provider)?;
    let client: std::sync::Arc<dyn SpeechSynthesizer> = match config.provider {
        SpeechProvider::OpenAi => std::sync::Arc::new(
            OpenAiSpeech::new(key, config.effective_model(), config.request_timeout())?,
        ),
        SpeechProvider::ElevenLabs => std::sync::Arc::new(
            ElevenLabsSpeech::new(key, config.effective_model(), config.request_timeout())?,
        ),
    };
    Ok(client)
}
