//! Shared types for the compliance layer.

use vigil_core::types::{Framework, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
    Partial,
}

/// One mandatory requirement within a framework. A requirement fails when
/// any of its mapped rules produced a violation in the provider's audit.
#[derive(Debug, Clone, Copy)]
pub struct Requirement {
    pub id: &'static str,
    pub description: &'static str,
    pub severity: Severity,
    pub rule_ids: &'static [&'static str],
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GapRemediation {
    pub action: String,
    /// Days allotted to close the gap, derived from requirement severity.
    pub timeline_days: i64,
}

/// A failed requirement within a framework assessment.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ComplianceGap {
    pub requirement_id: String,
    pub description: String,
    pub severity: Severity,
    /// Rule ids whose violations failed this requirement.
    pub violated_rules: Vec<String>,
    pub remediation: GapRemediation,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ComplianceAssessment {
    pub framework: Framework,
    pub provider_id: String,
    pub timestamp: i64,
    /// Percentage of requirements passed, in [0, 100].
    pub overall_score: f64,
    pub status: ComplianceStatus,
    pub requirements_total: usize,
    pub requirements_passed: usize,
    pub gaps: Vec<ComplianceGap>,
}
