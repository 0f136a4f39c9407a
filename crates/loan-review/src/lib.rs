//! Loan application review engine: deterministic policy checks, weighted risk
//! scoring, decision rules and explanations grounded in policy excerpts.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
