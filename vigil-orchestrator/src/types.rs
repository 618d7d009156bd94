//! Shared types for the orchestration layer.

use tokio_util::sync::CancellationToken;

use vigil_compliance::types::ComplianceAssessment;
use vigil_core::config::OrchestrationConfig;
use vigil_core::error::ReportError;
use vigil_core::types::{Framework, Severity};
use vigil_rules::types::AuditResult;
use vigil_vuln::types::{ScanDepth, ScanResult};

// ── Provider status & trends ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderHealth {
    Secure,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VulnTrend {
    Improving,
    Worsening,
    Stable,
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct ProviderTrends {
    pub security: TrendDirection,
    pub vulnerability: VulnTrend,
}

impl Default for ProviderTrends {
    fn default() -> Self {
        Self { security: TrendDirection::Stable, vulnerability: VulnTrend::Stable }
    }
}

/// Per-provider rollup, recomputed on every assessment run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProviderSecurityStatus {
    pub provider_id: String,
    pub security_score: f64,
    pub compliance_score: f64,
    pub vulnerability_risk_score: f64,
    pub status: ProviderHealth,
    pub critical_issues: usize,
    pub high_issues: usize,
    pub trends: ProviderTrends,
    /// Synthetic-critical marker: the provider's assessment itself failed
    /// and the scores above are placeholders.
    pub assessment_failed: bool,
}

// ── Alerts ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Violation,
    Compliance,
    Vulnerability,
    AssessmentFailure,
}

/// Append-only alert record. `due_date` is fixed by severity at creation
/// and never mutated; acknowledge and resolve are idempotent.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SecurityAlert {
    pub id: String,
    pub severity: Severity,
    pub alert_type: AlertType,
    pub provider_id: String,
    pub message: String,
    pub timestamp: i64,
    pub due_date: i64,
    pub assignee: Option<String>,
    pub acknowledged: bool,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<i64>,
    pub resolved: bool,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<i64>,
    pub resolution_notes: Option<String>,
}

// ── Incidents ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentCategory {
    Breach,
    Vulnerability,
    Compliance,
}

/// Ordered so transitions can be checked forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Open,
    Investigating,
    Contained,
    Resolved,
    Closed,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TimelineEntry {
    pub timestamp: i64,
    pub actor: String,
    pub entry: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SecurityIncident {
    pub id: String,
    pub severity: Severity,
    pub category: IncidentCategory,
    pub provider_id: String,
    pub title: String,
    pub status: IncidentStatus,
    pub created_at: i64,
    pub updated_at: i64,
    /// Append-only, ordered by timestamp ascending.
    pub timeline: Vec<TimelineEntry>,
}

// ── Tasks ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Audit,
    Scan,
    Remediation,
    ComplianceCheck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
    Failed,
}

/// Scheduled corrective work derived from a violation, gap or finding.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SecurityTask {
    pub id: String,
    pub task_type: TaskType,
    pub priority: Severity,
    pub provider_id: String,
    pub description: String,
    pub scheduled_at: i64,
    pub estimated_minutes: i64,
    /// Task ids this task depends on. Execution ordering across dependent
    /// tasks is undefined; the only attached semantics is that a non-empty
    /// list makes the task ineligible for auto-remediation.
    pub dependencies: Vec<String>,
    pub status: TaskStatus,
    pub remediation_steps: Vec<String>,
}

// ── Dashboard ───────────────────────────────────────────────────────────────

/// Ordered worst-first so aggregate health comparisons read naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Posture {
    Critical,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl Posture {
    pub fn label(&self) -> &'static str {
        match self {
            Posture::Critical => "critical",
            Posture::Poor => "poor",
            Posture::Fair => "fair",
            Posture::Good => "good",
            Posture::Excellent => "excellent",
        }
    }
}

/// How many providers trend which way, across the fleet.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct FleetTrendSummary {
    pub improving: usize,
    pub declining: usize,
    pub stable: usize,
}

/// Immutable fleet snapshot from one assessment run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SecurityDashboard {
    pub run_id: u64,
    pub timestamp: i64,
    pub overall_posture: Posture,
    pub overall_score: f64,
    pub providers: Vec<ProviderSecurityStatus>,
    pub trends: FleetTrendSummary,
    /// Alerts generated by this run.
    pub alerts: Vec<SecurityAlert>,
    pub recommendations: Vec<String>,
    pub upcoming_tasks: Vec<SecurityTask>,
    /// True when the run was cancelled and partial results were discarded.
    pub degraded: bool,
}

// ── Reports ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExecutiveSummary {
    pub posture: Posture,
    pub overall_score: f64,
    pub provider_count: usize,
    pub critical_alerts: usize,
    pub high_alerts: usize,
    pub open_incidents: usize,
    pub top_recommendations: Vec<String>,
}

/// Raw per-provider payloads bundled into a comprehensive report.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProviderPayload {
    pub provider_id: String,
    pub audit: AuditResult,
    pub compliance: Vec<ComplianceAssessment>,
    pub scan: ScanResult,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ComprehensiveReport {
    pub report_id: String,
    pub generated_at: i64,
    pub executive_summary: ExecutiveSummary,
    pub dashboard: SecurityDashboard,
    pub provider_payloads: Vec<ProviderPayload>,
    pub recent_incidents: Vec<SecurityIncident>,
    pub remediation_plan: Vec<SecurityTask>,
    pub recent_history: Vec<SecurityDashboard>,
    pub config: OrchestrationConfig,
}

// ── Assessment options / outcome ────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct AssessmentOptions {
    /// Frameworks to assess. `None` uses the configured defaults.
    pub frameworks: Option<Vec<Framework>>,
    /// Scan depth. `None` means deep.
    pub depth: Option<ScanDepth>,
    pub generate_reports: bool,
    pub auto_remediate: bool,
    /// Caller-supplied cancellation, propagated into each per-provider
    /// task. A cancelled run returns a degraded dashboard.
    pub cancel: Option<CancellationToken>,
}

/// What one `assess_provider_security` call produced.
#[derive(Debug)]
pub struct AssessmentOutcome {
    pub dashboard: SecurityDashboard,
    /// Set when report persistence failed; the dashboard above is still
    /// valid and recorded.
    pub report_error: Option<ReportError>,
}
