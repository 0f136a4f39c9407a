use std::fmt;

use serde::{Deserialize, Serialize};

use super::checks::{CheckName, CheckOutcome, CheckResults};
use super::config::PolicyThresholds;

/// Recommended action for a reviewed application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Approve,
    Reject,
    Flag,
}

impl Action {
    pub const fn label(self) -> &'static str {
        match self {
            Action::Approve => "APPROVE",
            Action::Reject => "REJECT",
            Action::Flag => "FLAG",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Derive the action: compliance failures reject, enough warnings flag, otherwise approve.
pub fn decide(checks: &CheckResults, thresholds: &PolicyThresholds) -> Action {
    if CheckName::COMPLIANCE
        .into_iter()
        .any(|name| checks.is(name, CheckOutcome::Fail))
    {
        return Action::Reject;
    }

    if checks.count(CheckOutcome::Warn) >= thresholds.flag_warning_count {
        return Action::Flag;
    }

    Action::Approve
}
