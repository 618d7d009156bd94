//! Shared types for the rule engine layer.

use std::collections::HashMap;

use vigil_core::types::{Framework, RuleCategory, Severity};

/// A single rule failure against a provider. Embedded in audit results,
/// never stored standalone.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    /// Where the violation was observed (config key path or probe target).
    pub location: String,
    pub recommendation: String,
    pub compliance_tags: Vec<Framework>,
    #[serde(default)]
    pub remediation_steps: Vec<String>,
}

/// Audit risk classification, distinct from per-violation severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// One provider audit outcome. Appended to the validator's history.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AuditResult {
    pub provider_id: String,
    pub timestamp: i64,
    /// Clamped to [0, 100].
    pub overall_score: f64,
    pub risk_level: RiskLevel,
    pub violations: Vec<Violation>,
    /// Per requested framework: false iff any violation carries its tag.
    pub compliance: HashMap<Framework, bool>,
    pub recommendations: Vec<String>,
    /// Unix timestamp of the recommended next audit.
    pub next_audit: i64,
}

impl AuditResult {
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.violations.iter().filter(|v| v.severity == severity).count()
    }
}

/// Options for a single provider audit.
#[derive(Debug, Clone, Default)]
pub struct AuditOptions {
    /// Frameworks to compute compliance flags for. Empty requests none.
    pub frameworks: Vec<Framework>,
    /// Only run rules at or above this severity.
    pub severity_filter: Option<Severity>,
    /// Only run rules in this category.
    pub category_filter: Option<RuleCategory>,
}

/// Options for a multi-provider audit batch.
#[derive(Debug, Clone, Default)]
pub struct AuditRunOptions {
    /// Audit providers concurrently instead of sequentially.
    pub parallel: bool,
    /// Persist a batch report through the configured sink.
    pub generate_report: bool,
}
