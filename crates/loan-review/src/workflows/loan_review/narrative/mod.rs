//! Narrative explanation layer.
//!
//! A [`NarrativeGenerator`] turns the policy outcome into prose. Backends are
//! treated as unreliable: [`generate_within`] bounds each call with a timeout
//! and callers fall back to [`template_explanation`] on any error.

mod ollama;
mod prompt;

pub use ollama::{OllamaNarrator, OllamaSettings};
pub use prompt::{PromptTemplate, DEFAULT_PROMPT, EXCERPT_PREVIEW_CHARS};

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::evaluation::Action;
use super::retrieval::PolicyChunk;

/// Policy excerpt handed to the narrative backend as supporting context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyExcerpt {
    pub title: String,
    pub text: String,
}

impl From<&PolicyChunk> for PolicyExcerpt {
    fn from(chunk: &PolicyChunk) -> Self {
        Self {
            title: chunk.title.clone(),
            text: chunk.text.clone(),
        }
    }
}

/// Everything a backend may see about a review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrativeRequest {
    pub facts: serde_json::Value,
    pub reasons: Vec<String>,
    pub action: Action,
    pub excerpts: Vec<PolicyExcerpt>,
}

/// Capability interface for narrative backends.
pub trait NarrativeGenerator: Send + Sync {
    fn generate(&self, request: &NarrativeRequest) -> Result<String, NarrativeError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NarrativeError {
    #[error("narrative backend did not answer within {0:?}")]
    Timeout(Duration),
    #[error("narrative backend unreachable: {0}")]
    Transport(String),
    #[error("narrative backend returned HTTP {0}")]
    Status(u16),
    #[error("narrative backend returned unusable content: {0}")]
    Malformed(String),
    #[error("narrative worker stopped before replying")]
    WorkerLost,
}

/// Deterministic explanation used whenever no narrative is available.
pub fn template_explanation(request: &NarrativeRequest) -> String {
    let bullets: String = request
        .reasons
        .iter()
        .map(|reason| format!("\n  - {reason}"))
        .collect();
    let cites: String = request
        .excerpts
        .iter()
        .map(|excerpt| format!("\n  * Policy cite: {}", excerpt.title))
        .collect();

    format!(
        "Decision: {action}. Key reasons:{bullets}{cites}\nSummary: Based on policy checks and risk signals, the recommended action is {action}.",
        action = request.action
    )
}

/// Run `generator` on a worker thread and wait at most `timeout` for its answer.
///
/// A late answer is discarded; the worker is left to finish on its own.
pub fn generate_within(
    generator: Arc<dyn NarrativeGenerator>,
    request: NarrativeRequest,
    timeout: Duration,
) -> Result<String, NarrativeError> {
    let (sender, receiver) = mpsc::channel();

    std::thread::Builder::new()
        .name("narrative".to_string())
        .spawn(move || {
            let _ = sender.send(generator.generate(&request));
        })
        .map_err(|err| NarrativeError::Transport(err.to_string()))?;

    match receiver.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(NarrativeError::Timeout(timeout)),
        Err(RecvTimeoutError::Disconnected) => Err(NarrativeError::WorkerLost),
    }
}
