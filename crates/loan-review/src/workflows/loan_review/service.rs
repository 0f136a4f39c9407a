use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use super::composer::{DecisionRecord, LoanReviewer, ReviewOptions};
use super::domain::{ApplicationSubmission, InvalidInput};
use super::narrative::{OllamaNarrator, OllamaSettings, PromptTemplate};
use super::source::{ApplicationSource, SourceError};

/// Caller supplied switches for a single review request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReviewQuery {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub use_retrieval: bool,
}

#[derive(Debug, Clone)]
struct OllamaBackend {
    settings: OllamaSettings,
    prompt: PromptTemplate,
}

/// Service composing an application source with the reviewer.
pub struct LoanReviewService<S> {
    source: Arc<S>,
    reviewer: LoanReviewer,
    policy_path: Option<PathBuf>,
    ollama: Option<OllamaBackend>,
}

impl<S> LoanReviewService<S>
where
    S: ApplicationSource + 'static,
{
    pub fn new(source: Arc<S>, reviewer: LoanReviewer) -> Self {
        Self {
            source,
            reviewer,
            policy_path: None,
            ollama: None,
        }
    }

    pub fn with_policy_path(mut self, policy_path: impl Into<PathBuf>) -> Self {
        self.policy_path = Some(policy_path.into());
        self
    }

    /// Explain decisions through Ollama; requests may override the model per review.
    pub fn with_ollama(mut self, settings: OllamaSettings, prompt: PromptTemplate) -> Self {
        self.ollama = Some(OllamaBackend { settings, prompt });
        self
    }

    pub fn list(&self, limit: usize) -> Result<Vec<ApplicationSubmission>, ReviewServiceError> {
        Ok(self.source.list(limit)?)
    }

    /// Look up, validate and review an application.
    pub fn review(
        &self,
        application_id: &str,
        query: &ReviewQuery,
    ) -> Result<DecisionRecord, ReviewServiceError> {
        let submission = self
            .source
            .find(application_id)?
            .ok_or_else(|| ReviewServiceError::NotFound(application_id.to_string()))?;
        let watchlist = self.source.watchlist()?;

        let options = ReviewOptions {
            use_retrieval: query.use_retrieval,
            policy_path: self.policy_path.clone(),
        };

        let record = self
            .reviewer_for(query)
            .review_submission(submission, &watchlist, &options)?;
        Ok(record)
    }

    fn reviewer_for(&self, query: &ReviewQuery) -> LoanReviewer {
        let Some(backend) = &self.ollama else {
            return self.reviewer.clone();
        };

        let settings = match query.model.as_deref().map(str::trim) {
            Some(model) if !model.is_empty() => backend.settings.clone().with_model(model),
            _ => backend.settings.clone(),
        };
        let timeout = settings.timeout;
        let narrator = OllamaNarrator::new(settings, backend.prompt.clone());

        self.reviewer
            .clone()
            .with_narrator(Arc::new(narrator), timeout)
    }
}

/// Error raised by the review service.
#[derive(Debug, thiserror::Error)]
pub enum ReviewServiceError {
    #[error("application {0} not found")]
    NotFound(String),
    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),
    #[error(transparent)]
    Source(#[from] SourceError),
}
