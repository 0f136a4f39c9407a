use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use serde_json::Value;

use crate::workflows::loan_review::domain::{
    Application, ApplicationSubmission, EmploymentStatus, KycStatus, Watchlist,
};
use crate::workflows::loan_review::evaluation::{CheckName, CheckOutcome, CheckResults};
use crate::workflows::loan_review::narrative::{
    NarrativeError, NarrativeGenerator, NarrativeRequest,
};
use crate::workflows::loan_review::source::{ApplicationSource, SourceError};
use crate::workflows::loan_review::{LoanReviewService, LoanReviewer, PolicyThresholds};

pub(super) const WATCHLISTED_NIC: &str = "199012345678";

pub(super) const POLICY_DOCUMENT: &str = "# Retail Lending Policy

Applies to all unsecured personal loans.

## Credit Score
Applicants with a low credit score below 600 require additional review.

## Debt-to-Income
A high DTI ratio above 0.45 indicates repayment stress.

## KYC and AML
KYC status must be Verified. Any positive AML risk signal blocks the loan.
Watchlist matches are escalated to compliance.

## Affordability
Requested amount should not exceed twenty times monthly income.
";

pub(super) fn submission() -> ApplicationSubmission {
    ApplicationSubmission {
        application_id: Some("A-001".to_string()),
        full_name: Some("Nadeesha Perera".to_string()),
        nic: Some("198765432V".to_string()),
        age: Some(34),
        employment_status: Some(EmploymentStatus::Salaried),
        monthly_income: Some(150_000),
        existing_debt: Some(20_000),
        requested_amount: Some(1_000_000),
        loan_purpose: Some("Home renovation".to_string()),
        credit_score: Some(720),
        kyc_status: Some(KycStatus::Verified),
        aml_flag: Some(false),
        delinquency_12m: Some(0),
        dti: Some(0.25),
    }
}

pub(super) fn application() -> Application {
    Application::try_from(submission()).expect("fixture submission is valid")
}

pub(super) fn application_with(edit: impl FnOnce(&mut ApplicationSubmission)) -> Application {
    let mut submission = submission();
    edit(&mut submission);
    Application::try_from(submission).expect("edited submission is valid")
}

/// Credit score and DTI both warn; everything else passes.
pub(super) fn flagged_application() -> Application {
    application_with(|submission| {
        submission.application_id = Some("A-002".to_string());
        submission.credit_score = Some(550);
        submission.dti = Some(0.52);
    })
}

pub(super) fn watchlist() -> Watchlist {
    [WATCHLISTED_NIC].into_iter().collect()
}

pub(super) fn thresholds() -> PolicyThresholds {
    PolicyThresholds::default()
}

pub(super) fn all_pass() -> CheckResults {
    CheckName::ALL
        .into_iter()
        .map(|name| (name, CheckOutcome::Pass))
        .collect()
}

pub(super) fn checks_with(overrides: &[(CheckName, CheckOutcome)]) -> CheckResults {
    CheckName::ALL
        .into_iter()
        .map(|name| {
            let outcome = overrides
                .iter()
                .find(|(candidate, _)| *candidate == name)
                .map(|(_, outcome)| *outcome)
                .unwrap_or(CheckOutcome::Pass);
            (name, outcome)
        })
        .collect()
}

pub(super) fn template_reviewer() -> LoanReviewer {
    LoanReviewer::new(thresholds())
}

pub(super) fn reviewer_with(narrator: impl NarrativeGenerator + 'static) -> LoanReviewer {
    LoanReviewer::new(thresholds()).with_narrator(Arc::new(narrator), Duration::from_millis(200))
}

pub(super) struct FixedNarrator(pub(super) &'static str);

impl NarrativeGenerator for FixedNarrator {
    fn generate(&self, _request: &NarrativeRequest) -> Result<String, NarrativeError> {
        Ok(self.0.to_string())
    }
}

pub(super) struct FailingNarrator;

impl NarrativeGenerator for FailingNarrator {
    fn generate(&self, _request: &NarrativeRequest) -> Result<String, NarrativeError> {
        Err(NarrativeError::Transport("connection refused".to_string()))
    }
}

pub(super) struct SlowNarrator(pub(super) Duration);

impl NarrativeGenerator for SlowNarrator {
    fn generate(&self, _request: &NarrativeRequest) -> Result<String, NarrativeError> {
        std::thread::sleep(self.0);
        Ok("too late to matter".to_string())
    }
}

pub(super) struct PanickingNarrator;

impl NarrativeGenerator for PanickingNarrator {
    fn generate(&self, _request: &NarrativeRequest) -> Result<String, NarrativeError> {
        panic!("backend crashed");
    }
}

#[derive(Default, Clone)]
pub(super) struct RecordingNarrator {
    requests: Arc<Mutex<Vec<NarrativeRequest>>>,
}

impl RecordingNarrator {
    pub(super) fn requests(&self) -> Vec<NarrativeRequest> {
        self.requests.lock().expect("narrator mutex poisoned").clone()
    }
}

impl NarrativeGenerator for RecordingNarrator {
    fn generate(&self, request: &NarrativeRequest) -> Result<String, NarrativeError> {
        self.requests
            .lock()
            .expect("narrator mutex poisoned")
            .push(request.clone());
        Ok("Recorded narrative.".to_string())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemorySource {
    pub(super) records: Vec<ApplicationSubmission>,
    pub(super) watchlist: Watchlist,
}

impl MemorySource {
    pub(super) fn seeded() -> Self {
        let mut invalid = submission();
        invalid.application_id = Some("A-bad".to_string());
        invalid.credit_score = None;

        let mut sanctioned = submission();
        sanctioned.application_id = Some("A-003".to_string());
        sanctioned.nic = Some(WATCHLISTED_NIC.to_string());

        let mut flagged = submission();
        flagged.application_id = Some("A-002".to_string());
        flagged.credit_score = Some(550);
        flagged.dti = Some(0.52);

        Self {
            records: vec![submission(), flagged, sanctioned, invalid],
            watchlist: watchlist(),
        }
    }
}

impl ApplicationSource for MemorySource {
    fn list(&self, limit: usize) -> Result<Vec<ApplicationSubmission>, SourceError> {
        Ok(self.records.iter().take(limit).cloned().collect())
    }

    fn find(&self, application_id: &str) -> Result<Option<ApplicationSubmission>, SourceError> {
        Ok(self
            .records
            .iter()
            .find(|record| record.application_id.as_deref() == Some(application_id))
            .cloned())
    }

    fn watchlist(&self) -> Result<Watchlist, SourceError> {
        Ok(self.watchlist.clone())
    }
}

pub(super) struct OfflineSource;

impl ApplicationSource for OfflineSource {
    fn list(&self, _limit: usize) -> Result<Vec<ApplicationSubmission>, SourceError> {
        Err(offline())
    }

    fn find(&self, _application_id: &str) -> Result<Option<ApplicationSubmission>, SourceError> {
        Err(offline())
    }

    fn watchlist(&self) -> Result<Watchlist, SourceError> {
        Err(offline())
    }
}

fn offline() -> SourceError {
    SourceError::Unavailable {
        path: "data/loan_applications.csv".into(),
        source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "share offline"),
    }
}

pub(super) fn build_service() -> LoanReviewService<MemorySource> {
    LoanReviewService::new(Arc::new(MemorySource::seeded()), template_reviewer())
}

pub(super) fn write_policy(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("policy.md");
    std::fs::write(&path, POLICY_DOCUMENT).expect("write policy fixture");
    path
}

/// Template explanation shape: header, bullets, closing summary.
pub(super) fn assert_template_explanation(explanation: &str, action: &str) {
    assert!(
        explanation.starts_with(&format!("Decision: {action}. Key reasons:")),
        "unexpected explanation header: {explanation}"
    );
    assert!(explanation.ends_with(&format!(
        "\nSummary: Based on policy checks and risk signals, the recommended action is {action}."
    )));
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
