//! OpenAI image generation client.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ImageGenerator;
use crate::config::ThumbnailConfig;
use crate::errors::{Result, ServiceError};
use crate::http::{build_client, redact, status_error, transport_error};

const SERVICE: &str = "openai-images";

/// Image generation endpoint.
pub const OPENAI_IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    quality: &'a str,
    n: u8,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}

/// `POST /v1/images/generations` with base64 payloads.
#[derive(Clone)]
pub struct OpenAiImages {
    client: reqwest::Client,
    api_key: String,
    model: String,
    size: String,
    quality: String,
    endpoint: String,
}

impl OpenAiImages {
    /// Creates a client using the thumbnail settings.
    pub fn new(api_key: impl Into<String>, config: &ThumbnailConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.request_timeout())?,
            api_key: api_key.into(),
            model: config.model.clone(),
            size: config.request_size.clone(),
            quality: config.quality.clone(),
            endpoint: OPENAI_IMAGES_URL.to_string(),
        })
    }

    /// Points the client at another endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl fmt::Debug for OpenAiImages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiImages")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("size", &self.size)
            .field("quality", &self.quality)
            .finish_non_exhaustive()
    }
}

fn decode_first_image(response: ImageResponse) -> std::result::Result<Vec<u8>, ServiceError> {
    let encoded = response
        .data
        .into_iter()
        .find_map(|d| d.b64_json)
        .ok_or_else(|| ServiceError::invalid_response(SERVICE, "response contained no image"))?;
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| ServiceError::invalid_response(SERVICE, format!("invalid base64 image: {e}")))
}

#[async_trait]
impl ImageGenerator for OpenAiImages {
    async fn generate(&self, prompt: &str) -> std::result::Result<Vec<u8>, ServiceError> {
        let request = ImageRequest {
            model: &self.model,
            prompt,
            size: &self.size,
            quality: &self.quality,
            n: 1,
            response_format: "b64_json",
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

        let body: ImageResponse = response.json().await.map_err(|e| transport_error(SERVICE, &e))?;
        decode_first_image(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let config = ThumbnailConfig::default();
        let body = serde_json::to_value(ImageRequest {
            model: &config.model,
            prompt: "A fox",
            size: &config.request_size,
            quality: &config.quality,
            n: 1,
            response_format: "b64_json",
        })
        .unwrap();
        assert_eq!(body["model"], "dall-e-3");
        assert_eq!(body["size"], "1792x1024");
        assert_eq!(body["quality"], "hd");
        assert_eq!(body["response_format"], "b64_json");
    }

    #[test]
    fn test_decode_first_image() {
        let response: ImageResponse =
            serde_json::from_str(&format!(r#"{{"data": [{{"b64_json": "{}"}}]}}"#, STANDARD.encode(b"png"))).unwrap();
        assert_eq!(decode_first_image(response).unwrap(), b"png");
    }

    #[test]
    fn test_missing_or_corrupt_payload_is_invalid_response() {
        let empty: ImageResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(matches!(decode_first_image(empty), Err(ServiceError::InvalidResponse { .. })));

        let corrupt: ImageResponse = serde_json::from_str(r#"{"data": [{"b64_json": "!!!"}]}"#).unwrap();
        assert!(matches!(decode_first_image(corrupt), Err(ServiceError::InvalidResponse { .. })));
    }
}
