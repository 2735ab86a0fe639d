//! ElevenLabs text-to-speech client.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use super::SpeechSynthesizer;
use crate::errors::{Result, ServiceError};
use crate::http::{build_client, redact, status_error, transport_error};

const SERVICE: &str = "elevenlabs";

/// Base URL; the voice id is appended.
pub const ELEVENLABS_TTS_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

/// `POST /v1/text-to-speech/{voice_id}` returning `audio/mpeg`.
#[derive(Clone)]
pub struct ElevenLabsSpeech {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ElevenLabsSpeech {
    /// Creates a client for `model`.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            api_key: api_key.into(),
            model: model.into(),
            base_url: ELEVENLABS_TTS_URL.to_string(),
        })
    }

    /// Points the client at another base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn url_for(&self, voice: &str) -> String {
        format!("{}/{voice}", self.base_url.trim_end_matches('/'))
    }
}

impl fmt::Debug for ElevenLabsSpeech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElevenLabsSpeech")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSpeech {
    async fn synthesize(&self, text: &str, voice: &str) -> std::result::Result<Vec<u8>, ServiceError> {
        let request = SpeechRequest {
            text,
            model_id: &self.model,
            voice_settings: VoiceSettings {
                stability: 0.4,
                similarity_boost: 0.8,
            },
        };

        let response = self
            .client
            .post(self.url_for(voice))
            .header("xi-api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, &e))?;

        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }

        let audio = response.bytes().await.map_err(|e| transport_error(SERVICE, &e))?;
        if audio.is_empty() {
            return Err(ServiceError::invalid_response(SERVICE, "empty audio body"));
        }
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_includes_voice() {
        let client = ElevenLabsSpeech::new("key", "eleven_multilingual_v2", Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://localhost/v1/text-to-speech/");
        assert_eq!(
            client.url_for("EXAVITQu4vr4xnSDxMaL"),
            "http://localhost/v1/text-to-speech/EXAVITQu4vr4xnSDxMaL"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(SpeechRequest {
            text: "Once upon a time.",
            model_id: "eleven_multilingual_v2",
            voice_settings: VoiceSettings {
                stability: 0.4,
                similarity_boost: 0.8,
            },
        })
        .unwrap();
        assert_eq!(body["model_id"], "eleven_multilingual_v2");
        assert!(body["voice_settings"]["stability"].as_f64().unwrap() > 0.39);
        assert!(body["voice_settings"]["similarity_boost"].as_f64().unwrap() > 0.79);
    }
}
