//! # Vigil Compliance — framework gap analysis
//!
//! Maps named compliance frameworks to mandatory requirement sets and
//! produces gap analyses from already-computed audit output. The checker
//! never re-invokes provider-touching rule callbacks: rule evaluation may
//! have side effects on stateful handles, so one audit's violations serve
//! every framework assessed in the same run.

pub mod checker;
pub mod frameworks;
pub mod types;

pub use checker::ComplianceChecker;
pub use types::{ComplianceAssessment, ComplianceGap, ComplianceStatus, GapRemediation, Requirement};
