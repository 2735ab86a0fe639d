//! OpenAI text-to-speech client.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use super::SpeechSynthesizer;
use crate::errors::{Result, ServiceError};
use crate::http::{build_client, redact, status_error, transport_error};

const SERVICE: &str = "openai-speech";

/// Speech endpoint.
pub const OPENAI_SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

/// `POST /v1/audio/speech` returning mp3.
#[derive(Clone)]
pub struct OpenAiSpeech {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiSpeech {
    /// Creates a client for `model`.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: OPENAI_SPEECH_URL.to_string(),
        })
    }

    /// Points the client at another endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl fmt::Debug for OpenAiSpeech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiSpeech")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    async fn synthesize(&self, text: &str, voice: &str) -> std::result::Result<Vec<u8>, ServiceError> {
        let request = SpeechRequest {
            model: &self.model,
            voice,
            input: text,
            response_format: "mp3",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
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
