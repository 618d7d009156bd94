//! Shared types for the vulnerability scanning layer.

use vigil_core::types::Severity;

/// Scan depth trades cost for coverage. Ordered so that probes can declare
/// the minimum depth at which they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanDepth {
    Surface,
    Deep,
    Comprehensive,
}

/// A detected vulnerability.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Finding {
    /// Stable identifier of the vulnerability class, e.g. `VULN_DEFAULT_CREDS`.
    pub id: String,
    pub title: String,
    pub severity: Severity,
    /// Affected component within the provider.
    pub component: String,
    pub description: String,
    /// Days allotted to remediate, by severity of the finding.
    pub remediation_timeline_days: i64,
}

/// Severity histogram plus the derived aggregate risk score.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ScanSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    /// In [0, 100].
    pub risk_score: f64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScanResult {
    pub provider_id: String,
    pub depth: ScanDepth,
    pub timestamp: i64,
    pub findings: Vec<Finding>,
    pub summary: ScanSummary,
}
