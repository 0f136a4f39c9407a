use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::{Application, ApplicationId, ApplicationSubmission, InvalidInput, Watchlist};
use super::evaluation::{Action, CheckResults, PolicyEngine, PolicyThresholds, RiskScore};
use super::narrative::{
    generate_within, template_explanation, NarrativeGenerator, NarrativeRequest, PolicyExcerpt,
};
use super::retrieval::{PolicyChunk, PolicyRetriever, DEFAULT_TOP_K};

pub const DEFAULT_NARRATIVE_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-review switches supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewOptions {
    pub use_retrieval: bool,
    pub policy_path: Option<PathBuf>,
}

impl ReviewOptions {
    pub fn with_policy(policy_path: impl Into<PathBuf>) -> Self {
        Self {
            use_retrieval: true,
            policy_path: Some(policy_path.into()),
        }
    }
}

/// Where the explanation text of a decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationSource {
    Narrative,
    Template,
}

/// Final, immutable outcome of one review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub application_id: ApplicationId,
    pub recommended_action: Action,
    pub reasons: Vec<String>,
    pub risk_score: RiskScore,
    pub checks: CheckResults,
    pub explanation: String,
    pub explanation_source: ExplanationSource,
    #[serde(default)]
    pub policy_excerpts: Vec<PolicyChunk>,
    pub reviewed_at: DateTime<Utc>,
}

/// Orchestrates checks, scoring, decision, reasons, retrieval and narrative.
///
/// Holds no mutable state, so one reviewer can serve concurrent reviews.
#[derive(Clone)]
pub struct LoanReviewer {
    engine: PolicyEngine,
    narrator: Option<Arc<dyn NarrativeGenerator>>,
    narrative_timeout: Duration,
    top_k: usize,
}

impl Default for LoanReviewer {
    fn default() -> Self {
        Self::new(PolicyThresholds::default())
    }
}

impl LoanReviewer {
    /// Reviewer that always explains decisions with the deterministic template.
    pub fn new(thresholds: PolicyThresholds) -> Self {
        Self {
            engine: PolicyEngine::new(thresholds),
            narrator: None,
            narrative_timeout: DEFAULT_NARRATIVE_TIMEOUT,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_narrator(
        mut self,
        narrator: Arc<dyn NarrativeGenerator>,
        timeout: Duration,
    ) -> Self {
        self.narrator = Some(narrator);
        self.narrative_timeout = timeout;
        self
    }

    pub fn without_narrator(mut self) -> Self {
        self.narrator = None;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn engine(&self) -> &PolicyEngine {
        &self.engine
    }

    pub fn narrative_timeout(&self) -> Duration {
        self.narrative_timeout
    }

    /// Validate a raw record, then review it. Invalid records are the only failure.
    pub fn review_submission(
        &self,
        submission: ApplicationSubmission,
        watchlist: &Watchlist,
        options: &ReviewOptions,
    ) -> Result<DecisionRecord, InvalidInput> {
        let application = Application::try_from(submission)?;
        Ok(self.review(&application, watchlist, options))
    }

    /// Review an application. Retrieval and narrative problems degrade, never abort.
    pub fn review(
        &self,
        application: &Application,
        watchlist: &Watchlist,
        options: &ReviewOptions,
    ) -> DecisionRecord {
        let evaluation = self.engine.evaluate(application, watchlist);
        debug!(
            application_id = %application.application_id(),
            action = %evaluation.action,
            risk_score = %evaluation.risk_score,
            "policy evaluation complete"
        );

        let policy_excerpts = self.retrieve(&evaluation.reasons, options);

        let request = NarrativeRequest {
            facts: application.facts(),
            reasons: evaluation.reasons.clone(),
            action: evaluation.action,
            excerpts: policy_excerpts.iter().map(PolicyExcerpt::from).collect(),
        };
        let (explanation, explanation_source) = self.explain(request);

        info!(
            application_id = %application.application_id(),
            action = %evaluation.action,
            risk_score = %evaluation.risk_score,
            excerpts = policy_excerpts.len(),
            source = ?explanation_source,
            "loan review complete"
        );

        DecisionRecord {
            application_id: application.application_id().clone(),
            recommended_action: evaluation.action,
            reasons: evaluation.reasons,
            risk_score: evaluation.risk_score,
            checks: evaluation.checks,
            explanation,
            explanation_source,
            policy_excerpts,
            reviewed_at: Utc::now(),
        }
    }

    fn retrieve(&self, reasons: &[String], options: &ReviewOptions) -> Vec<PolicyChunk> {
        let Some(path) = options.policy_path.as_ref().filter(|_| options.use_retrieval) else {
            return Vec::new();
        };

        let query = reasons.join(" ");
        match PolicyRetriever::new(path.clone())
            .with_top_k(self.top_k)
            .search(&query)
        {
            Ok(chunks) => chunks,
            Err(err) => {
                warn!(error = %err, "policy retrieval failed; continuing without excerpts");
                Vec::new()
            }
        }
    }

    fn explain(&self, request: NarrativeRequest) -> (String, ExplanationSource) {
        let Some(narrator) = self.narrator.as_ref() else {
            return (template_explanation(&request), ExplanationSource::Template);
        };

        match generate_within(narrator.clone(), request.clone(), self.narrative_timeout) {
            Ok(text) if !text.trim().is_empty() => (text, ExplanationSource::Narrative),
            Ok(_) => {
                warn!("narrative backend returned blank text; using template explanation");
                (template_explanation(&request), ExplanationSource::Template)
            }
            Err(err) => {
                warn!(error = %err, "narrative unavailable; using template explanation");
                (template_explanation(&request), ExplanationSource::Template)
            }
        }
    }
}
