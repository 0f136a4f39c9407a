use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::prompt::PromptTemplate;
use super::{NarrativeError, NarrativeGenerator, NarrativeRequest};

/// Connection settings for a local Ollama daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaSettings {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "tinyllama".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl OllamaSettings {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

/// Narrative backend calling Ollama's `/api/generate` endpoint once per review.
#[derive(Debug, Clone)]
pub struct OllamaNarrator {
    settings: OllamaSettings,
    prompt: PromptTemplate,
}

impl OllamaNarrator {
    pub fn new(settings: OllamaSettings, prompt: PromptTemplate) -> Self {
        Self { settings, prompt }
    }

    pub fn settings(&self) -> &OllamaSettings {
        &self.settings
    }
}

impl NarrativeGenerator for OllamaNarrator {
    fn generate(&self, request: &NarrativeRequest) -> Result<String, NarrativeError> {
        let prompt = self.prompt.render(request);
        let client = reqwest::blocking::Client::builder()
            .timeout(self.settings.timeout)
            .build()
            .map_err(|err| NarrativeError::Transport(err.to_string()))?;

        debug!(model = %self.settings.model, "requesting narrative from ollama");
        let response = client
            .post(self.settings.generate_url())
            .json(&GenerateRequest {
                model: &self.settings.model,
                prompt: &prompt,
                stream: false,
            })
            .send()
            .map_err(|err| {
                if err.is_timeout() {
                    NarrativeError::Timeout(self.settings.timeout)
                } else {
                    NarrativeError::Transport(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NarrativeError::Status(status.as_u16()));
        }

        let body: GenerateResponse = response
            .json()
            .map_err(|err| NarrativeError::Malformed(err.to_string()))?;

        match body.response.map(|text| text.trim().to_string()) {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(NarrativeError::Malformed("empty response".to_string())),
        }
    }
}
