//! Loan application review: policy checks, risk scoring, decision, reasons,
//! policy-excerpt retrieval and narrative explanation.

pub mod composer;
pub mod domain;
pub mod evaluation;
pub mod narrative;
pub mod retrieval;
pub mod router;
pub mod service;
pub mod source;

#[cfg(test)]
mod tests;

pub use composer::{DecisionRecord, ExplanationSource, LoanReviewer, ReviewOptions};
pub use domain::{
    Application, ApplicationId, ApplicationSubmission, EmploymentStatus, InvalidInput, KycStatus,
    Nic, Watchlist,
};
pub use evaluation::{
    decide, reasons_from_checks, run_policy_checks, score_risk, Action, CheckName, CheckOutcome,
    CheckResults, PolicyEngine, PolicyEvaluation, PolicyThresholds, RiskScore,
};
pub use narrative::{
    NarrativeError, NarrativeGenerator, NarrativeRequest, OllamaNarrator, OllamaSettings,
    PolicyExcerpt, PromptTemplate,
};
pub use retrieval::{search_policy, PolicyChunk, PolicyRetriever, RetrievalError};
pub use router::review_router;
pub use service::{LoanReviewService, ReviewQuery, ReviewServiceError};
pub use source::{ApplicationSource, CsvApplicationSource, SourceError};
