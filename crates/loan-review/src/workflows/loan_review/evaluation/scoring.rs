use std::fmt;

use serde::{Deserialize, Serialize};

use super::checks::{CheckOutcome, CheckResults};

/// Aggregate risk in `0.0..=1.0`, rounded to three decimals.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskScore(f64);

impl RiskScore {
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Weighted sum of check outcomes: full weight on FAIL, half on WARN.
pub fn score_risk(checks: &CheckResults) -> RiskScore {
    let total: f64 = checks
        .iter()
        .map(|(name, outcome)| match outcome {
            CheckOutcome::Fail => name.weight(),
            CheckOutcome::Warn => name.weight() * 0.5,
            CheckOutcome::Pass => 0.0,
        })
        .sum();

    RiskScore(round3(total.min(1.0)))
}
