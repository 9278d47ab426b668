//! # sn-policy
//!
//! Risk classification and approval gating for Sentinel remediation plans.

pub mod config;
pub mod engine;

pub use config::PolicyConfig;
pub use engine::{requires_approval, risk_for, RiskPolicyEvaluator};
