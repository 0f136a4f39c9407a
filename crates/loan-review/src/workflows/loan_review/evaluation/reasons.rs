use super::super::domain::Application;
use super::checks::{CheckName, CheckOutcome, CheckResults};

pub const ALL_CHECKS_PASSED: &str = "All core checks passed within policy thresholds.";

/// One sentence per failing or warning check, in evaluation order.
pub fn reasons_from_checks(application: &Application, checks: &CheckResults) -> Vec<String> {
    let mut reasons: Vec<String> = checks
        .iter()
        .filter(|(_, outcome)| *outcome != CheckOutcome::Pass)
        .map(|(name, _)| reason_for(name, application))
        .collect();

    if reasons.is_empty() {
        reasons.push(ALL_CHECKS_PASSED.to_string());
    }

    reasons
}

fn reason_for(name: CheckName, application: &Application) -> String {
    match name {
        CheckName::Kyc => format!("KYC status is {}.", application.kyc_status()),
        CheckName::Aml => "Positive AML risk signal detected.".to_string(),
        CheckName::Watchlist => "Applicant NIC matched internal/external watchlist.".to_string(),
        CheckName::CreditScore => format!("Low credit score: {}.", application.credit_score()),
        // Debug keeps the fractional part on whole ratios ("1.0", not "1").
        CheckName::Dti => format!("High DTI ratio: {:?}.", application.dti()),
        CheckName::Delinquency => format!(
            "Delinquencies in last 12 months: {}.",
            application.delinquency_12m()
        ),
        CheckName::Affordability => format!(
            "Requested amount {} is high vs monthly income {} (affordability concern).",
            application.requested_amount(),
            application.monthly_income()
        ),
    }
}
