use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::super::domain::{Application, KycStatus, Watchlist};
use super::config::PolicyThresholds;

/// Named policy check. Variant order is the fixed evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CheckName {
    #[serde(rename = "KYC")]
    Kyc,
    #[serde(rename = "AML")]
    Aml,
    Watchlist,
    CreditScore,
    #[serde(rename = "DTI")]
    Dti,
    Delinquency,
    Affordability,
}

impl CheckName {
    pub const ALL: [CheckName; 7] = [
        CheckName::Kyc,
        CheckName::Aml,
        CheckName::Watchlist,
        CheckName::CreditScore,
        CheckName::Dti,
        CheckName::Delinquency,
        CheckName::Affordability,
    ];

    /// Hard blockers; any failure among these rejects the application.
    pub const COMPLIANCE: [CheckName; 3] = [CheckName::Kyc, CheckName::Aml, CheckName::Watchlist];

    pub const fn label(self) -> &'static str {
        match self {
            CheckName::Kyc => "KYC",
            CheckName::Aml => "AML",
            CheckName::Watchlist => "Watchlist",
            CheckName::CreditScore => "CreditScore",
            CheckName::Dti => "DTI",
            CheckName::Delinquency => "Delinquency",
            CheckName::Affordability => "Affordability",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|name| name.label() == label)
    }

    /// Contribution of this check to the risk score when it fails outright.
    pub const fn weight(self) -> f64 {
        match self {
            CheckName::Kyc => 0.25,
            CheckName::Aml => 0.25,
            CheckName::Watchlist => 0.20,
            CheckName::CreditScore => 0.12,
            CheckName::Dti => 0.10,
            CheckName::Delinquency => 0.04,
            CheckName::Affordability => 0.04,
        }
    }

    pub const fn is_compliance(self) -> bool {
        matches!(self, CheckName::Kyc | CheckName::Aml | CheckName::Watchlist)
    }
}

impl fmt::Display for CheckName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of a single check, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckOutcome {
    Pass,
    Warn,
    Fail,
}

impl CheckOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            CheckOutcome::Pass => "PASS",
            CheckOutcome::Warn => "WARN",
            CheckOutcome::Fail => "FAIL",
        }
    }

    fn warn_if(condition: bool) -> Self {
        if condition {
            CheckOutcome::Warn
        } else {
            CheckOutcome::Pass
        }
    }

    fn fail_if(condition: bool) -> Self {
        if condition {
            CheckOutcome::Fail
        } else {
            CheckOutcome::Pass
        }
    }
}

/// Per-check outcomes for one application, iterated in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckResults(BTreeMap<CheckName, CheckOutcome>);

impl CheckResults {
    pub fn get(&self, name: CheckName) -> Option<CheckOutcome> {
        self.0.get(&name).copied()
    }

    pub fn is(&self, name: CheckName, outcome: CheckOutcome) -> bool {
        self.get(name) == Some(outcome)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CheckName, CheckOutcome)> + '_ {
        self.0.iter().map(|(name, outcome)| (*name, *outcome))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn count(&self, outcome: CheckOutcome) -> usize {
        self.0.values().filter(|value| **value == outcome).count()
    }

    /// Builds results from loosely labelled pairs; labels that name no known check are dropped.
    pub fn from_labels<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, CheckOutcome)>,
    {
        pairs
            .into_iter()
            .filter_map(|(label, outcome)| {
                CheckName::from_label(label).map(|name| (name, outcome))
            })
            .collect()
    }
}

impl FromIterator<(CheckName, CheckOutcome)> for CheckResults {
    fn from_iter<I: IntoIterator<Item = (CheckName, CheckOutcome)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Evaluate every policy check for an application.
pub fn run_policy_checks(
    application: &Application,
    watchlist: &Watchlist,
    thresholds: &PolicyThresholds,
) -> CheckResults {
    let affordability_ceiling =
        application.monthly_income() as f64 * thresholds.affordability_multiple;

    CheckName::ALL
        .into_iter()
        .map(|name| {
            let outcome = match name {
                CheckName::Kyc => {
                    CheckOutcome::fail_if(application.kyc_status() != KycStatus::Verified)
                }
                CheckName::Aml => CheckOutcome::fail_if(application.aml_flag()),
                CheckName::Watchlist => {
                    CheckOutcome::fail_if(watchlist.contains(application.nic()))
                }
                CheckName::CreditScore => CheckOutcome::warn_if(
                    application.credit_score() < thresholds.minimum_credit_score,
                ),
                CheckName::Dti => CheckOutcome::warn_if(application.dti() > thresholds.maximum_dti),
                CheckName::Delinquency => CheckOutcome::warn_if(
                    application.delinquency_12m() >= thresholds.delinquency_warning_count,
                ),
                CheckName::Affordability => CheckOutcome::warn_if(
                    application.requested_amount() as f64 > affordability_ceiling,
                ),
            };
            (name, outcome)
        })
        .collect()
}
