use serde::{Deserialize, Serialize};

/// Business thresholds applied by the policy checks and the decision rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyThresholds {
    /// Credit scores strictly below this value raise a warning.
    pub minimum_credit_score: u16,
    /// Debt-to-income ratios strictly above this value raise a warning.
    pub maximum_dti: f64,
    /// Delinquency counts at or above this value raise a warning.
    pub delinquency_warning_count: u32,
    /// Requested amounts above `monthly_income * affordability_multiple` raise a warning.
    pub affordability_multiple: f64,
    /// Number of warnings that routes an otherwise clean application to manual review.
    pub flag_warning_count: usize,
}

impl Default for PolicyThresholds {
    fn default() -> Self {
        Self {
            minimum_credit_score: 600,
            maximum_dti: 0.45,
            delinquency_warning_count: 2,
            affordability_multiple: 20.0,
            flag_warning_count: 2,
        }
    }
}
