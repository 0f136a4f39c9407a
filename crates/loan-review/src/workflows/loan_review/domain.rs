use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Identifier wrapper for submitted loan applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// National identity card number, used as the watchlist match key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nic(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmploymentStatus {
    Salaried,
    #[serde(rename = "Self-Employed")]
    SelfEmployed,
    Unemployed,
    Contract,
}

impl EmploymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EmploymentStatus::Salaried => "Salaried",
            EmploymentStatus::SelfEmployed => "Self-Employed",
            EmploymentStatus::Unemployed => "Unemployed",
            EmploymentStatus::Contract => "Contract",
        }
    }
}

/// Know-your-customer verification state reported by onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KycStatus {
    Verified,
    Pending,
    Rejected,
}

impl KycStatus {
    pub const fn label(self) -> &'static str {
        match self {
            KycStatus::Verified => "Verified",
            KycStatus::Pending => "Pending",
            KycStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for KycStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub const MIN_APPLICANT_AGE: u8 = 18;
pub const MAX_APPLICANT_AGE: u8 = 75;
pub const MIN_CREDIT_SCORE: u16 = 300;
pub const MAX_CREDIT_SCORE: u16 = 900;

/// Raw application record as delivered by a source (CSV row, JSON body).
///
/// Every field is optional so that a missing column surfaces as
/// [`InvalidInput::MissingField`] instead of a deserializer error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub nic: Option<String>,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub employment_status: Option<EmploymentStatus>,
    #[serde(default, alias = "monthly_income_lkr")]
    pub monthly_income: Option<i64>,
    #[serde(default, alias = "existing_debt_lkr")]
    pub existing_debt: Option<i64>,
    #[serde(default, alias = "requested_amount_lkr")]
    pub requested_amount: Option<i64>,
    #[serde(default)]
    pub loan_purpose: Option<String>,
    #[serde(default)]
    pub credit_score: Option<i64>,
    #[serde(default)]
    pub kyc_status: Option<KycStatus>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub aml_flag: Option<bool>,
    #[serde(default)]
    pub delinquency_12m: Option<i64>,
    #[serde(default)]
    pub dti: Option<f64>,
}

/// Validation failure raised while building an [`Application`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidInput {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` must not be blank")]
    Blank { field: &'static str },
    #[error("field `{field}` out of range: {value} not within {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: String,
        min: String,
        max: String,
    },
}

/// Validated, immutable loan application consumed by the policy engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ApplicationSubmission", into = "ApplicationSubmission")]
pub struct Application {
    application_id: ApplicationId,
    full_name: String,
    nic: Nic,
    age: u8,
    employment_status: EmploymentStatus,
    monthly_income: u64,
    existing_debt: u64,
    requested_amount: u64,
    loan_purpose: String,
    credit_score: u16,
    kyc_status: KycStatus,
    aml_flag: bool,
    delinquency_12m: u32,
    dti: f64,
}

impl Application {
    pub fn application_id(&self) -> &ApplicationId {
        &self.application_id
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn nic(&self) -> &Nic {
        &self.nic
    }

    pub fn age(&self) -> u8 {
        self.age
    }

    pub fn employment_status(&self) -> EmploymentStatus {
        self.employment_status
    }

    pub fn monthly_income(&self) -> u64 {
        self.monthly_income
    }

    pub fn existing_debt(&self) -> u64 {
        self.existing_debt
    }

    pub fn requested_amount(&self) -> u64 {
        self.requested_amount
    }

    pub fn loan_purpose(&self) -> &str {
        &self.loan_purpose
    }

    pub fn credit_score(&self) -> u16 {
        self.credit_score
    }

    pub fn kyc_status(&self) -> KycStatus {
        self.kyc_status
    }

    pub fn aml_flag(&self) -> bool {
        self.aml_flag
    }

    pub fn delinquency_12m(&self) -> u32 {
        self.delinquency_12m
    }

    /// Debt-to-income ratio, always within `0.0..=1.0`.
    pub fn dti(&self) -> f64 {
        self.dti
    }

    /// Decision-relevant facts safe to hand to a narrative backend.
    ///
    /// The identity card number and existing debt are deliberately absent.
    pub fn facts(&self) -> serde_json::Value {
        serde_json::json!({
            "application_id": self.application_id.0,
            "full_name": self.full_name,
            "age": self.age,
            "employment_status": self.employment_status.label(),
            "monthly_income": self.monthly_income,
            "requested_amount": self.requested_amount,
            "credit_score": self.credit_score,
            "dti": self.dti,
            "delinquency_12m": self.delinquency_12m,
            "loan_purpose": self.loan_purpose,
        })
    }
}

impl TryFrom<ApplicationSubmission> for Application {
    type Error = InvalidInput;

    fn try_from(submission: ApplicationSubmission) -> Result<Self, Self::Error> {
        let application_id = non_blank("application_id", submission.application_id)?;
        let full_name = non_blank("full_name", submission.full_name)?;
        let nic = non_blank("nic", submission.nic)?;

        let age = bounded(
            "age",
            required("age", submission.age)?,
            i64::from(MIN_APPLICANT_AGE),
            i64::from(MAX_APPLICANT_AGE),
        )?;
        let credit_score = bounded(
            "credit_score",
            required("credit_score", submission.credit_score)?,
            i64::from(MIN_CREDIT_SCORE),
            i64::from(MAX_CREDIT_SCORE),
        )?;
        let monthly_income = non_negative(
            "monthly_income",
            required("monthly_income", submission.monthly_income)?,
        )?;
        let existing_debt = non_negative(
            "existing_debt",
            required("existing_debt", submission.existing_debt)?,
        )?;
        let requested_amount = non_negative(
            "requested_amount",
            required("requested_amount", submission.requested_amount)?,
        )?;
        let delinquency_12m = bounded(
            "delinquency_12m",
            required("delinquency_12m", submission.delinquency_12m)?,
            0,
            i64::from(u32::MAX),
        )?;

        let dti = required("dti", submission.dti)?;
        if !(0.0..=1.0).contains(&dti) {
            return Err(InvalidInput::OutOfRange {
                field: "dti",
                value: dti.to_string(),
                min: "0".to_string(),
                max: "1".to_string(),
            });
        }

        Ok(Self {
            application_id: ApplicationId(application_id),
            full_name,
            nic: Nic(nic),
            age: age as u8,
            employment_status: required("employment_status", submission.employment_status)?,
            monthly_income: monthly_income as u64,
            existing_debt: existing_debt as u64,
            requested_amount: requested_amount as u64,
            loan_purpose: submission.loan_purpose.unwrap_or_default().trim().to_string(),
            credit_score: credit_score as u16,
            kyc_status: required("kyc_status", submission.kyc_status)?,
            aml_flag: required("aml_flag", submission.aml_flag)?,
            delinquency_12m: delinquency_12m as u32,
            dti,
        })
    }
}

impl From<Application> for ApplicationSubmission {
    fn from(application: Application) -> Self {
        Self {
            application_id: Some(application.application_id.0),
            full_name: Some(application.full_name),
            nic: Some(application.nic.0),
            age: Some(i64::from(application.age)),
            employment_status: Some(application.employment_status),
            monthly_income: Some(application.monthly_income as i64),
            existing_debt: Some(application.existing_debt as i64),
            requested_amount: Some(application.requested_amount as i64),
            loan_purpose: Some(application.loan_purpose),
            credit_score: Some(i64::from(application.credit_score)),
            kyc_status: Some(application.kyc_status),
            aml_flag: Some(application.aml_flag),
            delinquency_12m: Some(i64::from(application.delinquency_12m)),
            dti: Some(application.dti),
        }
    }
}

fn required<T>(field: &'static str, value: Option<T>) -> Result<T, InvalidInput> {
    value.ok_or(InvalidInput::MissingField(field))
}

fn non_blank(field: &'static str, value: Option<String>) -> Result<String, InvalidInput> {
    let value = required(field, value)?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(InvalidInput::Blank { field });
    }
    Ok(trimmed.to_string())
}

fn bounded(field: &'static str, value: i64, min: i64, max: i64) -> Result<i64, InvalidInput> {
    if value < min || value > max {
        return Err(InvalidInput::OutOfRange {
            field,
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    Ok(value)
}

fn non_negative(field: &'static str, value: i64) -> Result<i64, InvalidInput> {
    bounded(field, value, 0, i64::MAX)
}

/// Accepts `true/false`, `1/0` and `yes/no` in any case; blank cells become `None`.
fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawFlag {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    let raw = Option::<RawFlag>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(RawFlag::Bool(value)) => Ok(Some(value)),
        Some(RawFlag::Int(0)) => Ok(Some(false)),
        Some(RawFlag::Int(1)) => Ok(Some(true)),
        Some(RawFlag::Int(other)) => Err(serde::de::Error::custom(format!(
            "expected 0 or 1 for a flag, found {other}"
        ))),
        Some(RawFlag::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "" => Ok(None),
            "true" | "1" | "yes" | "y" => Ok(Some(true)),
            "false" | "0" | "no" | "n" => Ok(Some(false)),
            other => Err(serde::de::Error::custom(format!(
                "unrecognised flag value '{other}'"
            ))),
        },
    }
}

/// Identity numbers under sanction or compliance scrutiny.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Watchlist(BTreeSet<Nic>);

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, nic: &Nic) -> bool {
        self.0.contains(nic)
    }

    pub fn insert(&mut self, nic: Nic) -> bool {
        self.0.insert(nic)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Watchlist {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|nic| Nic(nic.into().trim().to_string()))
                .collect(),
        )
    }
}
