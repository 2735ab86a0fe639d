//! Service credentials read from the environment.

use std::fmt;

use super::SpeechProvider;
use crate::errors::{Result, StoryflowError};

/// Environment variable holding the OpenAI key (speech and images).
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Environment variable holding the ElevenLabs key.
pub const ELEVENLABS_API_KEY_VAR: &str = "ELEVENLABS_API_KEY";

/// API keys for the remote collaborators.
///
/// Keys are never logged; `Debug` only reports presence.
#[derive(Clone, Default)]
pub struct Credentials {
    openai: Option<String>,
    elevenlabs: Option<String>,
}

impl Credentials {
    /// Reads credentials from the process environment. Empty values count as absent.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads credentials through an arbitrary lookup function.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            openai: read(OPENAI_API_KEY_VAR),
            elevenlabs: read(ELEVENLABS_API_KEY_VAR),
        }
    }

    /// Sets the OpenAI key.
    #[must_use]
    pub fn with_openai(mut self, key: impl Into<String>) -> Self {
        self.openai = Some(key.into());
        self
    }

    /// Sets the ElevenLabs key.
    #[must_use]
    pub fn with_elevenlabs(mut self, key: impl Into<String>) -> Self {
        self.elevenlabs = Some(key.into());
        self
    }

    /// Key for the speech provider, or a fatal configuration error.
    pub fn require_speech(&self, provider: SpeechProvider) -> Result<&str> {
        match provider {
            SpeechProvider::OpenAi => require(self.openai.as_deref(), OPENAI_API_KEY_VAR),
            SpeechProvider::ElevenLabs => {
                require(self.elevenlabs.as_deref(), ELEVENLABS_API_KEY_VAR)
            }
        }
    }

    /// Key for the image service, or a fatal configuration error.
    pub fn require_images(&self) -> Result<&str> {
        require(self.openai.as_deref(), OPENAI_API_KEY_VAR)
    }
}

fn require<'a>(value: Option<&'a str>, var: &str) -> Result<&'a str> {
    value.ok_or_else(|| {
        StoryflowError::configuration(format!("{var} environment variable not set"))
    })
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("openai", &self.openai.is_some())
            .field("elevenlabs", &self.elevenlabs.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_fatal() {
        let creds = Credentials::from_lookup(|_| None);
        let err = creds.require_speech(SpeechProvider::OpenAi).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains(OPENAI_API_KEY_VAR));
        assert!(creds.require_images().is_err());
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let creds = Credentials::from_lookup(|name| {
            (name == ELEVENLABS_API_KEY_VAR).then(|| "   ".to_string())
        });
        assert!(creds.require_speech(SpeechProvider::ElevenLabs).is_err());
    }

    #[test]
    fn test_provider_specific_lookup() {
        let creds = Credentials::default().with_elevenlabs("el-key");
        assert_eq!(creds.require_speech(SpeechProvider::ElevenLabs).unwrap(), "el-key");
        assert!(creds.require_speech(SpeechProvider::OpenAi).is_err());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let creds = Credentials::default().with_openai("sk-secret");
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("openai: true"));
    }
}
