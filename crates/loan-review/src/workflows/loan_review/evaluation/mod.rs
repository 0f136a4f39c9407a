mod checks;
mod config;
mod policy;
mod reasons;
mod scoring;

pub use checks::{run_policy_checks, CheckName, CheckOutcome, CheckResults};
pub use config::PolicyThresholds;
pub use policy::{decide, Action};
pub use reasons::{reasons_from_checks, ALL_CHECKS_PASSED};
pub use scoring::{score_risk, RiskScore};

pub(crate) use scoring::round3;

use super::domain::{Application, Watchlist};
use serde::{Deserialize, Serialize};

/// Stateless evaluator applying the policy thresholds to an application.
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    thresholds: PolicyThresholds,
}

impl PolicyEngine {
    pub fn new(thresholds: PolicyThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &PolicyThresholds {
        &self.thresholds
    }

    pub fn evaluate(&self, application: &Application, watchlist: &Watchlist) -> PolicyEvaluation {
        let checks = run_policy_checks(application, watchlist, &self.thresholds);
        let risk_score = score_risk(&checks);
        let action = decide(&checks, &self.thresholds);
        let reasons = reasons_from_checks(application, &checks);

        PolicyEvaluation {
            checks,
            risk_score,
            action,
            reasons,
        }
    }
}

/// Core policy output for one application, before any narrative is attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyEvaluation {
    pub checks: CheckResults,
    pub risk_score: RiskScore,
    pub action: Action,
    pub reasons: Vec<String>,
}
