//! Shared HTTP plumbing for the remote collaborators.

use std::time::Duration;

use crate::errors::{Result, ServiceError, StoryflowError};

/// Builds a client with a per-request timeout.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("storyflow/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| StoryflowError::configuration(format!("cannot build HTTP client: {e}")))
}

/// Classifies a transport-level failure. Undecodable bodies are permanent;
/// timeouts, refused connections and broken streams are worth retrying.
pub(crate) fn transport_error(service: &str, err: &reqwest::Error) -> ServiceError {
    if err.is_decode() {
        ServiceError::invalid_response(service, err.to_string())
    } else {
        ServiceError::transient(service, err.to_string())
    }
}

/// Turns a non-success response into a classified error.
pub(crate) async fn status_error(service: &str, response: reqwest::Response) -> ServiceError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ServiceError::from_status(service, status, &body)
}

/// Hides all but the last four characters of a secret.
pub(crate) fn redact(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let visible: String = secret.chars().skip(count - 4).collect();
    format!("****{visible}")
}
