//! # Orchestrator — coordinated fleet assessment
//!
//! Fans assessment out across providers (audit, per-framework compliance,
//! vulnerability scan), isolates per-provider failures, aggregates the
//! fleet dashboard, generates alerts and remediation tasks, escalates
//! critical findings into incidents, evaluates emergency shutdown, and
//! optionally persists a comprehensive report and auto-remediates.
//!
//! Concurrency model: per-provider assessment is data-parallel on a
//! `JoinSet` with a join barrier before aggregation; every write to the
//! shared history/alert/task/incident lists goes through one state lock,
//! so manual calls, scheduler-driven runs and auto-remediation never
//! interleave unsafely.

use futures::FutureExt;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use vigil_compliance::checker::ComplianceChecker;
use vigil_compliance::types::{ComplianceAssessment, ComplianceStatus};
use vigil_core::config::{ConfigUpdate, OrchestrationConfig};
use vigil_core::events::{EngineEvent, EventBus, FindingSource};
use vigil_core::provider::Provider;
use vigil_core::report::{MemorySink, ReportSink};
use vigil_core::types::{Framework, Severity};
use vigil_core::{VigilError, VigilResult};
use vigil_rules::registry::{RuleRegistry, SecurityRule};
use vigil_rules::types::{AuditOptions, RiskLevel};
use vigil_rules::validator::SecurityValidator;
use vigil_vuln::scanner::VulnerabilityScanner;
use vigil_vuln::types::ScanDepth;

use crate::remediation::{NoopExecutor, RemediationExecutor};
use crate::types::{
    AlertType, AssessmentOptions, AssessmentOutcome, ComprehensiveReport, ExecutiveSummary,
    FleetTrendSummary, IncidentCategory, IncidentStatus, Posture, ProviderHealth,
    ProviderPayload, ProviderSecurityStatus, ProviderTrends, SecurityAlert, SecurityDashboard,
    SecurityIncident, SecurityTask, TaskStatus, TaskType, TimelineEntry, TrendDirection,
    VulnTrend,
};

// Alert due dates are fixed by source severity at creation.
const DUE_VIOLATION_SECS: i64 = 24 * 3600;
const DUE_COMPLIANCE_SECS: i64 = 7 * 86_400;
const DUE_VULNERABILITY_SECS: i64 = 4 * 3600;

const MINUTES_PER_STEP: i64 = 30;
const MINUTES_PER_DAY: i64 = 1440;

const MAX_DASHBOARD_HISTORY: usize = 500;
const MAX_ALERTS: usize = 10_000;
const MAX_TASKS: usize = 20_000;
const MAX_INCIDENTS: usize = 5_000;

const UPCOMING_WINDOW_SECS: i64 = 7 * 86_400;
const REPORT_INCIDENT_WINDOW_SECS: i64 = 30 * 86_400;
const MAX_RECOMMENDATIONS: usize = 10;
const MAX_UPCOMING_TASKS: usize = 10;
const REPORT_HISTORY_DEPTH: usize = 5;

// ── Internal assessment outcome ─────────────────────────────────────────────

struct ProviderAssessment {
    provider_id: String,
    audit: vigil_rules::types::AuditResult,
    compliance: Vec<ComplianceAssessment>,
    scan: vigil_vuln::types::ScanResult,
}

enum ProviderOutcome {
    Assessed(Box<ProviderAssessment>),
    Failed { provider_id: String, message: String },
}

// ── Shared mutable state ────────────────────────────────────────────────────

#[derive(Default)]
struct EngineState {
    history: Vec<SecurityDashboard>,
    alerts: Vec<SecurityAlert>,
    tasks: Vec<SecurityTask>,
    incidents: Vec<SecurityIncident>,
}

fn push_capped<T>(list: &mut Vec<T>, item: T, cap: usize) {
    if list.len() >= cap {
        let drain = cap / 10;
        list.drain(..drain);
    }
    list.push(item);
}

fn extend_capped<T>(list: &mut Vec<T>, items: Vec<T>, cap: usize) {
    for item in items {
        push_capped(list, item, cap);
    }
}

// ── Orchestrator ────────────────────────────────────────────────────────────

pub struct Orchestrator {
    registry: Arc<RuleRegistry>,
    validator: Arc<SecurityValidator>,
    compliance: Arc<ComplianceChecker>,
    scanner: Arc<VulnerabilityScanner>,
    bus: Arc<EventBus>,
    sink: Arc<dyn ReportSink>,
    executor: Arc<dyn RemediationExecutor>,
    config: RwLock<OrchestrationConfig>,
    state: RwLock<EngineState>,
    next_run_id: AtomicU64,
    next_alert_id: AtomicU64,
    next_task_id: AtomicU64,
    next_incident_id: AtomicU64,
    next_report_id: AtomicU64,
}

impl Orchestrator {
    pub fn new(bus: Arc<EventBus>, config: OrchestrationConfig) -> Self {
        let registry = Arc::new(RuleRegistry::with_builtin_rules());
        let validator = Arc::new(SecurityValidator::new(registry.clone(), bus.clone()));
        let compliance = Arc::new(ComplianceChecker::new());
        let scanner = Arc::new(VulnerabilityScanner::with_builtin_probes(bus.clone()));
        Self {
            registry,
            validator,
            compliance,
            scanner,
            bus,
            sink: Arc::new(MemorySink::new()),
            executor: Arc::new(NoopExecutor),
            config: RwLock::new(config),
            state: RwLock::new(EngineState::default()),
            next_run_id: AtomicU64::new(1),
            next_alert_id: AtomicU64::new(1),
            next_task_id: AtomicU64::new(1),
            next_incident_id: AtomicU64::new(1),
            next_report_id: AtomicU64::new(1),
        }
    }

    pub fn with_report_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_remediation_executor(mut self, executor: Arc<dyn RemediationExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn scanner(&self) -> &Arc<VulnerabilityScanner> {
        &self.scanner
    }

    pub fn validator(&self) -> &Arc<SecurityValidator> {
        &self.validator
    }

    // ── Main assessment flow ────────────────────────────────────────────────

    pub async fn assess_provider_security(
        &self,
        providers: &[Provider],
        options: &AssessmentOptions,
    ) -> VigilResult<AssessmentOutcome> {
        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        let config = self.config.read().clone();
        let frameworks = options
            .frameworks
            .clone()
            .unwrap_or_else(|| config.default_frameworks.clone());
        let depth = options.depth.unwrap_or(ScanDepth::Deep);
        let cancel = options.cancel.clone().unwrap_or_default();

        info!(run = run_id, providers = providers.len(), depth = ?depth, "Assessment started");
        self.bus.publish(EngineEvent::AssessmentStarted {
            run_id,
            providers: providers.len(),
        });

        // Fan out: per-provider assessment is independent and data-parallel.
        let mut set: JoinSet<ProviderOutcome> = JoinSet::new();
        for provider in providers.iter().cloned() {
            let validator = self.validator.clone();
            let compliance = self.compliance.clone();
            let scanner = self.scanner.clone();
            let frameworks = frameworks.clone();
            let token = cancel.clone();
            set.spawn(async move {
                assess_one(validator, compliance, scanner, provider, frameworks, depth, token)
                    .await
            });
        }

        // Join barrier; outcomes arrive in completion order.
        let mut outcomes = Vec::with_capacity(providers.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!(run = run_id, error = %e, "Assessment task aborted"),
            }
        }

        if cancel.is_cancelled() {
            // Partial results are discarded; the degraded dashboard is
            // returned but never appended to history.
            warn!(run = run_id, "Assessment cancelled, returning degraded dashboard");
            self.bus.publish(EngineEvent::AssessmentError {
                run_id,
                provider_id: None,
                message: "assessment cancelled".into(),
            });
            let now = chrono::Utc::now().timestamp();
            let dashboard = SecurityDashboard {
                run_id,
                timestamp: now,
                overall_posture: Posture::Poor,
                overall_score: 0.0,
                providers: Vec::new(),
                trends: FleetTrendSummary::default(),
                alerts: Vec::new(),
                recommendations: Vec::new(),
                upcoming_tasks: Vec::new(),
                degraded: true,
            };
            return Ok(AssessmentOutcome { dashboard, report_error: None });
        }

        let now = chrono::Utc::now().timestamp();
        let mut statuses: Vec<ProviderSecurityStatus> = Vec::new();
        let mut run_alerts: Vec<SecurityAlert> = Vec::new();
        let mut run_tasks: Vec<SecurityTask> = Vec::new();
        let mut new_incidents: Vec<SecurityIncident> = Vec::new();
        let mut events: Vec<EngineEvent> = Vec::new();
        let mut payloads: Vec<ProviderPayload> = Vec::new();
        let mut recommendations: Vec<String> = Vec::new();
        let mut seen_recommendations: HashSet<String> = HashSet::new();

        let dashboard = {
            // Single-writer section: all list mutation is serialized here.
            let mut state = self.state.write();

            for outcome in outcomes {
                match outcome {
                    ProviderOutcome::Failed { provider_id, message } => {
                        // Partial-failure isolation: synthetic critical
                        // status plus a critical alert, batch continues.
                        error!(run = run_id, provider = %provider_id, error = %message, "Provider assessment failed");
                        statuses.push(ProviderSecurityStatus {
                            provider_id: provider_id.clone(),
                            security_score: 0.0,
                            compliance_score: 0.0,
                            vulnerability_risk_score: 100.0,
                            status: ProviderHealth::Critical,
                            critical_issues: 1,
                            high_issues: 0,
                            trends: ProviderTrends::default(),
                            assessment_failed: true,
                        });
                        run_alerts.push(self.make_alert(
                            now,
                            Severity::Critical,
                            AlertType::AssessmentFailure,
                            &provider_id,
                            format!("Provider assessment failed: {}", message),
                            DUE_VIOLATION_SECS,
                        ));
                        events.push(EngineEvent::AssessmentError {
                            run_id,
                            provider_id: Some(provider_id),
                            message,
                        });
                    }
                    ProviderOutcome::Assessed(pa) => {
                        let status = self.provider_status(&config, &state.history, &pa);
                        statuses.push(status);

                        run_alerts.extend(self.alerts_for(now, &pa));
                        run_tasks.extend(self.tasks_for(now, &pa));

                        for rec in &pa.audit.recommendations {
                            if seen_recommendations.insert(rec.clone()) {
                                recommendations.push(rec.clone());
                            }
                        }

                        self.escalate(&config, now, &pa, &mut new_incidents, &mut events);
                        payloads.push(ProviderPayload {
                            provider_id: pa.provider_id.clone(),
                            audit: pa.audit,
                            compliance: pa.compliance,
                            scan: pa.scan,
                        });
                    }
                }
            }

            if config.automation.auto_notification {
                for alert in run_alerts.iter().filter(|a| a.severity == Severity::Critical) {
                    events.push(EngineEvent::CriticalAlertSent {
                        alert_id: alert.id.clone(),
                        provider_id: alert.provider_id.clone(),
                        severity: alert.severity,
                        message: alert.message.clone(),
                    });
                }
            }

            let overall_score = if statuses.is_empty() {
                0.0
            } else {
                statuses
                    .iter()
                    .map(|s| {
                        0.4 * s.security_score
                            + 0.3 * s.compliance_score
                            + 0.3 * (100.0 - s.vulnerability_risk_score)
                    })
                    .sum::<f64>()
                    / statuses.len() as f64
            };
            let overall_posture = compute_posture(overall_score, &run_alerts);

            let mut trend_summary = FleetTrendSummary::default();
            for status in &statuses {
                match status.trends.security {
                    TrendDirection::Improving => trend_summary.improving += 1,
                    TrendDirection::Declining => trend_summary.declining += 1,
                    TrendDirection::Stable => trend_summary.stable += 1,
                }
            }

            recommendations.truncate(MAX_RECOMMENDATIONS);

            extend_capped(&mut state.alerts, run_alerts.clone(), MAX_ALERTS);
            extend_capped(&mut state.tasks, run_tasks.clone(), MAX_TASKS);
            extend_capped(&mut state.incidents, new_incidents, MAX_INCIDENTS);

            let mut upcoming_tasks: Vec<SecurityTask> = state
                .tasks
                .iter()
                .filter(|t| {
                    t.status == TaskStatus::Pending && t.scheduled_at <= now + UPCOMING_WINDOW_SECS
                })
                .cloned()
                .collect();
            upcoming_tasks.sort_by_key(|t| t.scheduled_at);
            upcoming_tasks.truncate(MAX_UPCOMING_TASKS);

            let dashboard = SecurityDashboard {
                run_id,
                timestamp: now,
                overall_posture,
                overall_score,
                providers: statuses,
                trends: trend_summary,
                alerts: run_alerts,
                recommendations,
                upcoming_tasks,
                degraded: false,
            };
            push_capped(&mut state.history, dashboard.clone(), MAX_DASHBOARD_HISTORY);
            dashboard
        };

        // Events publish outside the state lock; subscribers may call back
        // into the mutation API.
        for event in events {
            self.bus.publish(event);
        }

        let mut report_error = None;
        if options.generate_reports {
            match self.persist_report(now, &dashboard, payloads).await {
                Ok(report_id) => {
                    self.bus
                        .publish(EngineEvent::ComprehensiveReportGenerated { report_id });
                }
                Err(e) => {
                    warn!(run = run_id, error = %e, "Report persistence failed");
                    report_error = Some(e);
                }
            }
        }

        if options.auto_remediate && config.automation.auto_remediation {
            let executed = self.run_auto_remediation().await;
            info!(run = run_id, executed = executed, "Auto-remediation pass finished");
        }

        info!(
            run = run_id,
            score = dashboard.overall_score,
            posture = dashboard.overall_posture.label(),
            "Assessment completed"
        );
        self.bus.publish(EngineEvent::AssessmentCompleted {
            run_id,
            overall_score: dashboard.overall_score,
            posture: dashboard.overall_posture.label().to_string(),
            providers: dashboard.providers.len(),
        });

        Ok(AssessmentOutcome { dashboard, report_error })
    }

    // ── Per-provider aggregation helpers ────────────────────────────────────

    fn provider_status(
        &self,
        config: &OrchestrationConfig,
        history: &[SecurityDashboard],
        pa: &ProviderAssessment,
    ) -> ProviderSecurityStatus {
        let security_score = pa.audit.overall_score;
        let compliance_score = if pa.compliance.is_empty() {
            100.0
        } else {
            pa.compliance.iter().map(|a| a.overall_score).sum::<f64>() / pa.compliance.len() as f64
        };
        let vulnerability_risk_score = pa.scan.summary.risk_score;

        let critical_issues =
            pa.audit.count_by_severity(Severity::Critical) + pa.scan.summary.critical;
        let high_issues = pa.audit.count_by_severity(Severity::High) + pa.scan.summary.high;

        let status = if critical_issues > 0
            || security_score < config.thresholds.critical_security_score
        {
            ProviderHealth::Critical
        } else if high_issues > 2
            || vulnerability_risk_score > config.thresholds.vulnerability_risk_warning
        {
            ProviderHealth::Warning
        } else {
            ProviderHealth::Secure
        };

        ProviderSecurityStatus {
            provider_id: pa.provider_id.clone(),
            security_score,
            compliance_score,
            vulnerability_risk_score,
            status,
            critical_issues,
            high_issues,
            trends: trends_for(history, &pa.provider_id),
            assessment_failed: false,
        }
    }

    /// The severity → due-date table is fixed: critical/high violation
    /// +24h, non-compliant framework +7d, critical vulnerability +4h.
    fn alerts_for(&self, now: i64, pa: &ProviderAssessment) -> Vec<SecurityAlert> {
        let mut alerts = Vec::new();
        for violation in &pa.audit.violations {
            if violation.severity >= Severity::High {
                alerts.push(self.make_alert(
                    now,
                    violation.severity,
                    AlertType::Violation,
                    &pa.provider_id,
                    format!("{}: {}", violation.rule_id, violation.message),
                    DUE_VIOLATION_SECS,
                ));
            }
        }
        for assessment in &pa.compliance {
            if assessment.status == ComplianceStatus::NonCompliant {
                alerts.push(self.make_alert(
                    now,
                    Severity::High,
                    AlertType::Compliance,
                    &pa.provider_id,
                    format!(
                        "{} non-compliant ({} gaps)",
                        assessment.framework,
                        assessment.gaps.len()
                    ),
                    DUE_COMPLIANCE_SECS,
                ));
            }
        }
        for finding in &pa.scan.findings {
            if finding.severity == Severity::Critical {
                alerts.push(self.make_alert(
                    now,
                    Severity::Critical,
                    AlertType::Vulnerability,
                    &pa.provider_id,
                    format!("{}: {}", finding.id, finding.title),
                    DUE_VULNERABILITY_SECS,
                ));
            }
        }
        alerts
    }

    fn tasks_for(&self, now: i64, pa: &ProviderAssessment) -> Vec<SecurityTask> {
        let mut tasks = Vec::new();
        for violation in &pa.audit.violations {
            if violation.remediation_steps.is_empty() {
                continue;
            }
            tasks.push(SecurityTask {
                id: self.new_task_id(),
                task_type: TaskType::Remediation,
                priority: violation.severity,
                provider_id: pa.provider_id.clone(),
                description: format!("Remediate {}: {}", violation.rule_id, violation.message),
                scheduled_at: now,
                estimated_minutes: violation.remediation_steps.len() as i64 * MINUTES_PER_STEP,
                dependencies: Vec::new(),
                status: TaskStatus::Pending,
                remediation_steps: violation.remediation_steps.clone(),
            });
        }
        for assessment in &pa.compliance {
            for gap in &assessment.gaps {
                tasks.push(SecurityTask {
                    id: self.new_task_id(),
                    task_type: TaskType::ComplianceCheck,
                    priority: gap.severity,
                    provider_id: pa.provider_id.clone(),
                    description: format!(
                        "{} {}: {}",
                        assessment.framework, gap.requirement_id, gap.remediation.action
                    ),
                    scheduled_at: now + gap.remediation.timeline_days * 86_400,
                    estimated_minutes: gap.remediation.timeline_days * MINUTES_PER_DAY,
                    dependencies: Vec::new(),
                    status: TaskStatus::Pending,
                    remediation_steps: Vec::new(),
                });
            }
        }
        for finding in &pa.scan.findings {
            if finding.severity >= Severity::High {
                tasks.push(SecurityTask {
                    id: self.new_task_id(),
                    task_type: TaskType::Remediation,
                    priority: finding.severity,
                    provider_id: pa.provider_id.clone(),
                    description: format!("Remediate {}: {}", finding.id, finding.title),
                    scheduled_at: now,
                    estimated_minutes: finding.remediation_timeline_days * MINUTES_PER_DAY,
                    dependencies: Vec::new(),
                    status: TaskStatus::Pending,
                    remediation_steps: Vec::new(),
                });
            }
        }
        tasks
    }

    /// Critical-finding escalation: one incident per critical finding, plus
    /// emergency-shutdown evaluation and notification payloads.
    fn escalate(
        &self,
        config: &OrchestrationConfig,
        now: i64,
        pa: &ProviderAssessment,
        incidents: &mut Vec<SecurityIncident>,
        events: &mut Vec<EngineEvent>,
    ) {
        let mut shutdown_reasons: Vec<String> = Vec::new();

        if pa.audit.risk_level == RiskLevel::Critical {
            events.push(EngineEvent::CriticalFinding {
                provider_id: pa.provider_id.clone(),
                source: FindingSource::Security,
                detail: "audit risk level critical".into(),
            });
            incidents.push(self.make_incident(
                now,
                &pa.provider_id,
                IncidentCategory::Breach,
                Severity::Critical,
                "Critical security risk detected by audit",
                events,
            ));
            shutdown_reasons.push("critical audit risk".into());
        }

        for assessment in &pa.compliance {
            if assessment.status == ComplianceStatus::NonCompliant {
                events.push(EngineEvent::CriticalFinding {
                    provider_id: pa.provider_id.clone(),
                    source: FindingSource::Compliance,
                    detail: format!("{} non-compliant", assessment.framework),
                });
                incidents.push(self.make_incident(
                    now,
                    &pa.provider_id,
                    IncidentCategory::Compliance,
                    Severity::High,
                    &format!("{} compliance failure", assessment.framework),
                    events,
                ));
                shutdown_reasons.push(format!("{} non-compliant", assessment.framework));
            }
        }

        for finding in &pa.scan.findings {
            if finding.severity == Severity::Critical {
                events.push(EngineEvent::CriticalFinding {
                    provider_id: pa.provider_id.clone(),
                    source: FindingSource::Vulnerability,
                    detail: finding.id.clone(),
                });
                incidents.push(self.make_incident(
                    now,
                    &pa.provider_id,
                    IncidentCategory::Vulnerability,
                    Severity::Critical,
                    &format!("Critical vulnerability: {}", finding.title),
                    events,
                ));
            }
        }

        if pa.scan.summary.critical > config.thresholds.emergency_critical_findings {
            shutdown_reasons.push(format!(
                "{} critical vulnerabilities exceed threshold",
                pa.scan.summary.critical
            ));
        }

        if !shutdown_reasons.is_empty() && config.automation.emergency_shutdown {
            // Actual provider disablement is delegated externally.
            events.push(EngineEvent::EmergencyShutdownTriggered {
                provider_id: pa.provider_id.clone(),
                reason: shutdown_reasons.join("; "),
            });
        }
    }

    // ── Entity construction ─────────────────────────────────────────────────

    fn make_alert(
        &self,
        now: i64,
        severity: Severity,
        alert_type: AlertType,
        provider_id: &str,
        message: String,
        due_delta_secs: i64,
    ) -> SecurityAlert {
        SecurityAlert {
            id: format!("ALERT-{:06}", self.next_alert_id.fetch_add(1, Ordering::Relaxed)),
            severity,
            alert_type,
            provider_id: provider_id.to_string(),
            message,
            timestamp: now,
            due_date: now + due_delta_secs,
            assignee: None,
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
            resolved: false,
            resolved_by: None,
            resolved_at: None,
            resolution_notes: None,
        }
    }

    fn make_incident(
        &self,
        now: i64,
        provider_id: &str,
        category: IncidentCategory,
        severity: Severity,
        title: &str,
        events: &mut Vec<EngineEvent>,
    ) -> SecurityIncident {
        let id = format!("INC-{:05}", self.next_incident_id.fetch_add(1, Ordering::Relaxed));
        events.push(EngineEvent::IncidentCreated {
            incident_id: id.clone(),
            provider_id: provider_id.to_string(),
            category: format!("{:?}", category).to_lowercase(),
            severity,
        });
        SecurityIncident {
            id,
            severity,
            category,
            provider_id: provider_id.to_string(),
            title: title.to_string(),
            status: IncidentStatus::Open,
            created_at: now,
            updated_at: now,
            timeline: vec![TimelineEntry {
                timestamp: now,
                actor: "orchestrator".into(),
                entry: format!("Incident created: {}", title),
            }],
        }
    }

    fn new_task_id(&self) -> String {
        format!("TASK-{:06}", self.next_task_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Queue a task directly, outside an assessment run.
    pub fn enqueue_task(&self, task: SecurityTask) {
        let mut state = self.state.write();
        push_capped(&mut state.tasks, task, MAX_TASKS);
    }

    // ── Reporting ───────────────────────────────────────────────────────────

    async fn persist_report(
        &self,
        now: i64,
        dashboard: &SecurityDashboard,
        payloads: Vec<ProviderPayload>,
    ) -> Result<String, vigil_core::error::ReportError> {
        let report_id =
            format!("report-{:05}", self.next_report_id.fetch_add(1, Ordering::Relaxed));
        let report = self.build_report(&report_id, now, dashboard, payloads);
        let payload = serde_json::to_value(&report)
            .map_err(|e| vigil_core::error::ReportError::Serialize(e.to_string()))?;
        self.sink.store(&report_id, &payload).await?;
        Ok(report_id)
    }

    fn build_report(
        &self,
        report_id: &str,
        now: i64,
        dashboard: &SecurityDashboard,
        payloads: Vec<ProviderPayload>,
    ) -> ComprehensiveReport {
        let state = self.state.read();
        let recent_incidents: Vec<SecurityIncident> = state
            .incidents
            .iter()
            .filter(|i| i.created_at >= now - REPORT_INCIDENT_WINDOW_SECS)
            .cloned()
            .collect();
        let open_incidents = state
            .incidents
            .iter()
            .filter(|i| i.status < IncidentStatus::Resolved)
            .count();
        let remediation_plan: Vec<SecurityTask> = state
            .tasks
            .iter()
            .filter(|t| t.task_type == TaskType::Remediation && t.status == TaskStatus::Pending)
            .cloned()
            .collect();
        let recent_history: Vec<SecurityDashboard> =
            state.history.iter().rev().take(REPORT_HISTORY_DEPTH).cloned().collect();

        ComprehensiveReport {
            report_id: report_id.to_string(),
            generated_at: now,
            executive_summary: ExecutiveSummary {
                posture: dashboard.overall_posture,
                overall_score: dashboard.overall_score,
                provider_count: dashboard.providers.len(),
                critical_alerts: dashboard
                    .alerts
                    .iter()
                    .filter(|a| a.severity == Severity::Critical)
                    .count(),
                high_alerts: dashboard
                    .alerts
                    .iter()
                    .filter(|a| a.severity == Severity::High)
                    .count(),
                open_incidents,
                top_recommendations: dashboard
                    .recommendations
                    .iter()
                    .take(5)
                    .cloned()
                    .collect(),
            },
            dashboard: dashboard.clone(),
            provider_payloads: payloads,
            recent_incidents,
            remediation_plan,
            recent_history,
            config: self.config.read().clone(),
        }
    }

    // ── Auto-remediation ────────────────────────────────────────────────────

    /// Execute every eligible pending task: remediation type, non-critical
    /// priority, no dependencies. Returns the number completed.
    pub async fn run_auto_remediation(&self) -> usize {
        let eligible: Vec<SecurityTask> = {
            let state = self.state.read();
            state
                .tasks
                .iter()
                .filter(|t| {
                    t.status == TaskStatus::Pending
                        && t.task_type == TaskType::Remediation
                        && t.priority != Severity::Critical
                        && t.dependencies.is_empty()
                })
                .cloned()
                .collect()
        };

        let mut executed = 0;
        for task in eligible {
            let result = self.executor.execute(&task).await;
            let mut events: Vec<EngineEvent> = Vec::new();
            {
                let mut state = self.state.write();
                let state = &mut *state;
                if let Some(stored) = state.tasks.iter_mut().find(|t| t.id == task.id) {
                    let now = chrono::Utc::now().timestamp();
                    match &result {
                        Ok(()) => {
                            stored.status = TaskStatus::Completed;
                            executed += 1;
                            events.push(EngineEvent::AutoRemediationCompleted {
                                task_id: task.id.clone(),
                                provider_id: task.provider_id.clone(),
                            });
                            for incident in state.incidents.iter_mut().filter(|i| {
                                i.provider_id == task.provider_id
                                    && i.status < IncidentStatus::Resolved
                            }) {
                                incident.timeline.push(TimelineEntry {
                                    timestamp: now,
                                    actor: "auto-remediation".into(),
                                    entry: format!("Remediation task {} completed", task.id),
                                });
                                incident.updated_at = now;
                            }
                        }
                        Err(e) => {
                            stored.status = TaskStatus::Failed;
                            events.push(EngineEvent::AutoRemediationFailed {
                                task_id: task.id.clone(),
                                provider_id: task.provider_id.clone(),
                                message: e.clone(),
                            });
                        }
                    }
                }
            }
            for event in events {
                self.bus.publish(event);
            }
        }
        executed
    }

    // ── Mutation API ────────────────────────────────────────────────────────

    /// Idempotent. Returns false for an unknown alert id.
    pub fn acknowledge_alert(&self, alert_id: &str, who: &str) -> bool {
        let newly_acknowledged = {
            let mut state = self.state.write();
            match state.alerts.iter_mut().find(|a| a.id == alert_id) {
                None => return false,
                Some(alert) if alert.acknowledged => false,
                Some(alert) => {
                    alert.acknowledged = true;
                    alert.acknowledged_by = Some(who.to_string());
                    alert.acknowledged_at = Some(chrono::Utc::now().timestamp());
                    true
                }
            }
        };
        if newly_acknowledged {
            self.bus.publish(EngineEvent::AlertAcknowledged {
                alert_id: alert_id.to_string(),
                by: who.to_string(),
            });
        }
        true
    }

    /// Idempotent. Returns false for an unknown alert id.
    pub fn resolve_alert(&self, alert_id: &str, who: &str, notes: Option<&str>) -> bool {
        let newly_resolved = {
            let mut state = self.state.write();
            match state.alerts.iter_mut().find(|a| a.id == alert_id) {
                None => return false,
                Some(alert) if alert.resolved => false,
                Some(alert) => {
                    alert.resolved = true;
                    alert.resolved_by = Some(who.to_string());
                    alert.resolved_at = Some(chrono::Utc::now().timestamp());
                    alert.resolution_notes = notes.map(str::to_string);
                    true
                }
            }
        };
        if newly_resolved {
            self.bus.publish(EngineEvent::AlertResolved {
                alert_id: alert_id.to_string(),
                by: who.to_string(),
            });
        }
        true
    }

    /// Incident transitions are forward-only:
    /// open → investigating → contained → resolved → closed.
    pub fn update_incident_status(
        &self,
        incident_id: &str,
        status: IncidentStatus,
        actor: &str,
    ) -> VigilResult<()> {
        let mut state = self.state.write();
        let incident = state
            .incidents
            .iter_mut()
            .find(|i| i.id == incident_id)
            .ok_or_else(|| VigilError::UnknownIncident(incident_id.to_string()))?;
        if status <= incident.status {
            return Err(VigilError::IncidentTransition {
                from: format!("{:?}", incident.status).to_lowercase(),
                to: format!("{:?}", status).to_lowercase(),
            });
        }
        let now = chrono::Utc::now().timestamp();
        incident.timeline.push(TimelineEntry {
            timestamp: now,
            actor: actor.to_string(),
            entry: format!("Status changed to {:?}", status).to_lowercase(),
        });
        incident.status = status;
        incident.updated_at = now;
        Ok(())
    }

    pub fn update_configuration(&self, update: ConfigUpdate) {
        {
            let mut config = self.config.write();
            update.apply(&mut config);
        }
        self.bus.publish(EngineEvent::ConfigurationUpdated);
    }

    pub fn add_custom_rule(&self, rule: Arc<dyn SecurityRule>) {
        let rule_id = rule.id().to_string();
        let replaced = self.registry.add(rule);
        self.bus.publish(if replaced {
            EngineEvent::RuleUpdated { rule_id }
        } else {
            EngineEvent::RuleAdded { rule_id }
        });
    }

    pub fn update_rule(&self, rule: Arc<dyn SecurityRule>) -> bool {
        let rule_id = rule.id().to_string();
        if self.registry.update(rule) {
            self.bus.publish(EngineEvent::RuleUpdated { rule_id });
            true
        } else {
            false
        }
    }

    pub fn remove_rule(&self, rule_id: &str) -> bool {
        if self.registry.remove(rule_id) {
            self.bus.publish(EngineEvent::RuleRemoved { rule_id: rule_id.to_string() });
            true
        } else {
            false
        }
    }

    // ── Read API ────────────────────────────────────────────────────────────

    pub fn current_dashboard(&self) -> Option<SecurityDashboard> {
        self.state.read().history.last().cloned()
    }

    /// Dashboards within the last `days` (all, if `None`), newest first,
    /// capped at `limit`.
    pub fn security_history(&self, days: Option<i64>, limit: usize) -> Vec<SecurityDashboard> {
        let cutoff = days.map(|d| chrono::Utc::now().timestamp() - d * 86_400);
        let state = self.state.read();
        state
            .history
            .iter()
            .rev()
            .filter(|d| cutoff.map_or(true, |c| d.timestamp >= c))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Incidents not yet resolved or closed.
    pub fn active_incidents(&self) -> Vec<SecurityIncident> {
        let state = self.state.read();
        state
            .incidents
            .iter()
            .filter(|i| i.status < IncidentStatus::Resolved)
            .cloned()
            .collect()
    }

    pub fn pending_alerts(&self) -> Vec<SecurityAlert> {
        let state = self.state.read();
        state.alerts.iter().filter(|a| !a.resolved).cloned().collect()
    }

    pub fn configuration(&self) -> OrchestrationConfig {
        self.config.read().clone()
    }

    pub fn incident(&self, incident_id: &str) -> Option<SecurityIncident> {
        let state = self.state.read();
        state.incidents.iter().find(|i| i.id == incident_id).cloned()
    }

    pub fn task(&self, task_id: &str) -> Option<SecurityTask> {
        let state = self.state.read();
        state.tasks.iter().find(|t| t.id == task_id).cloned()
    }
}

// ── Per-provider assessment task ────────────────────────────────────────────

async fn assess_one(
    validator: Arc<SecurityValidator>,
    compliance: Arc<ComplianceChecker>,
    scanner: Arc<VulnerabilityScanner>,
    provider: Provider,
    frameworks: Vec<Framework>,
    depth: ScanDepth,
    token: CancellationToken,
) -> ProviderOutcome {
    let provider_id = provider.id.clone();
    let work = async {
        let audit = validator
            .audit_provider(
                &provider,
                &AuditOptions { frameworks: frameworks.clone(), ..Default::default() },
            )
            .await;
        let assessments: Vec<ComplianceAssessment> =
            frameworks.iter().map(|fw| compliance.assess(*fw, &audit)).collect();
        let scan = scanner.scan(&provider, depth).await;
        ProviderOutcome::Assessed(Box::new(ProviderAssessment {
            provider_id: provider.id.clone(),
            audit,
            compliance: assessments,
            scan,
        }))
    };
    // Contain panics from misbehaving rule/probe plug-ins so one provider
    // cannot abort the batch.
    let guarded = AssertUnwindSafe(work).catch_unwind();
    tokio::select! {
        _ = token.cancelled() => ProviderOutcome::Failed {
            provider_id,
            message: "cancelled".into(),
        },
        result = guarded => match result {
            Ok(outcome) => outcome,
            Err(panic) => ProviderOutcome::Failed {
                provider_id,
                message: panic_message(panic),
            },
        },
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "assessment panicked".to_string()
    }
}

// ── Pure aggregation functions ──────────────────────────────────────────────

/// Literal posture precedence: critical alert, then score/poor, score/fair,
/// score/good, else excellent.
pub fn compute_posture(score: f64, alerts: &[SecurityAlert]) -> Posture {
    let critical = alerts.iter().filter(|a| a.severity == Severity::Critical).count();
    let high = alerts.iter().filter(|a| a.severity == Severity::High).count();
    if critical > 0 {
        Posture::Critical
    } else if score < 50.0 || high > 5 {
        Posture::Poor
    } else if score < 70.0 || high > 2 {
        Posture::Fair
    } else if score < 85.0 {
        Posture::Good
    } else {
        Posture::Excellent
    }
}

/// Trend labels from the provider's two most recent historical snapshots:
/// ±5 hysteresis on security score, ±10 on vulnerability risk. Fewer than
/// two prior points always reads stable.
pub fn trends_for(history: &[SecurityDashboard], provider_id: &str) -> ProviderTrends {
    let mut prior = history
        .iter()
        .rev()
        .filter_map(|d| d.providers.iter().find(|p| p.provider_id == provider_id));
    let (latest, older) = match (prior.next(), prior.next()) {
        (Some(a), Some(b)) => (a, b),
        _ => return ProviderTrends::default(),
    };

    let security_delta = latest.security_score - older.security_score;
    let security = if security_delta > 5.0 {
        TrendDirection::Improving
    } else if security_delta < -5.0 {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    };

    let vuln_delta = latest.vulnerability_risk_score - older.vulnerability_risk_score;
    let vulnerability = if vuln_delta < -10.0 {
        VulnTrend::Improving
    } else if vuln_delta > 10.0 {
        VulnTrend::Worsening
    } else {
        VulnTrend::Stable
    };

    ProviderTrends { security, vulnerability }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use vigil_core::error::RuleError;
    use vigil_core::events::EventTopic;
    use vigil_core::provider::ProviderKind;
    use vigil_core::types::RuleCategory;
    use vigil_rules::types::Violation;

    fn clean_provider(id: &str) -> Provider {
        Provider::detached(
            id,
            ProviderKind::Database,
            json!({
                "mfa_enabled": true,
                "password_policy": {"min_length": 14},
                "session_timeout_minutes": 30,
                "encryption_at_rest": true,
                "tls_version": "1.3",
                "admin_count": 2,
                "audit_logging": true,
            }),
        )
    }

    fn weak_provider(id: &str) -> Provider {
        // Fails AUTH_001 and AUTH_002 only.
        Provider::detached(
            id,
            ProviderKind::AuthService,
            json!({
                "mfa_enabled": false,
                "session_timeout_minutes": 30,
                "encryption_at_rest": true,
                "tls_version": "1.2",
                "admin_count": 2,
                "audit_logging": true,
            }),
        )
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(Arc::new(EventBus::new()), OrchestrationConfig::default())
    }

    fn alert_stub(severity: Severity) -> SecurityAlert {
        SecurityAlert {
            id: "ALERT-000000".into(),
            severity,
            alert_type: AlertType::Violation,
            provider_id: "p".into(),
            message: "m".into(),
            timestamp: 0,
            due_date: 0,
            assignee: None,
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
            resolved: false,
            resolved_by: None,
            resolved_at: None,
            resolution_notes: None,
        }
    }

    fn task_stub(id: &str, priority: Severity, dependencies: Vec<String>) -> SecurityTask {
        SecurityTask {
            id: id.into(),
            task_type: TaskType::Remediation,
            priority,
            provider_id: "db-1".into(),
            description: "remediate".into(),
            scheduled_at: 0,
            estimated_minutes: 30,
            dependencies,
            status: TaskStatus::Pending,
            remediation_steps: vec!["step".into()],
        }
    }

    // ── Posture precedence ──────────────────────────────────────────────────

    #[test]
    fn test_posture_precedence_is_literal() {
        assert_eq!(compute_posture(95.0, &[]), Posture::Excellent);
        assert_eq!(compute_posture(80.0, &[]), Posture::Good);
        assert_eq!(compute_posture(65.0, &[]), Posture::Fair);
        assert_eq!(compute_posture(40.0, &[]), Posture::Poor);

        // Any critical alert overrides a perfect score.
        let critical = vec![alert_stub(Severity::Critical)];
        assert_eq!(compute_posture(100.0, &critical), Posture::Critical);

        // High-alert counts demote independently of score.
        let six_high: Vec<_> = (0..6).map(|_| alert_stub(Severity::High)).collect();
        assert_eq!(compute_posture(100.0, &six_high), Posture::Poor);
        let three_high: Vec<_> = (0..3).map(|_| alert_stub(Severity::High)).collect();
        assert_eq!(compute_posture(100.0, &three_high), Posture::Fair);
    }

    #[test]
    fn test_posture_monotonic_in_score() {
        let alerts: Vec<SecurityAlert> = Vec::new();
        let mut last = compute_posture(0.0, &alerts);
        for score in [45.0, 55.0, 72.0, 90.0] {
            let posture = compute_posture(score, &alerts);
            // Posture enum orders Critical < ... < Excellent.
            assert!(posture >= last || posture == last);
            last = posture;
        }
    }

    // ── Trend hysteresis ────────────────────────────────────────────────────

    fn history_with_scores(points: &[(f64, f64)]) -> Vec<SecurityDashboard> {
        points
            .iter()
            .enumerate()
            .map(|(i, (sec, vuln))| SecurityDashboard {
                run_id: i as u64,
                timestamp: i as i64,
                overall_posture: Posture::Good,
                overall_score: *sec,
                providers: vec![ProviderSecurityStatus {
                    provider_id: "db-1".into(),
                    security_score: *sec,
                    compliance_score: 100.0,
                    vulnerability_risk_score: *vuln,
                    status: ProviderHealth::Secure,
                    critical_issues: 0,
                    high_issues: 0,
                    trends: ProviderTrends::default(),
                    assessment_failed: false,
                }],
                trends: FleetTrendSummary::default(),
                alerts: vec![],
                recommendations: vec![],
                upcoming_tasks: vec![],
                degraded: false,
            })
            .collect()
    }

    #[test]
    fn test_trends_stable_with_fewer_than_two_points() {
        assert_eq!(trends_for(&[], "db-1").security, TrendDirection::Stable);
        let one = history_with_scores(&[(80.0, 10.0)]);
        assert_eq!(trends_for(&one, "db-1").security, TrendDirection::Stable);
    }

    #[test]
    fn test_security_trend_hysteresis_band() {
        // Delta +4 stays inside the ±5 band.
        let flat = history_with_scores(&[(80.0, 10.0), (84.0, 10.0)]);
        assert_eq!(trends_for(&flat, "db-1").security, TrendDirection::Stable);

        let up = history_with_scores(&[(80.0, 10.0), (90.0, 10.0)]);
        assert_eq!(trends_for(&up, "db-1").security, TrendDirection::Improving);

        let down = history_with_scores(&[(80.0, 10.0), (70.0, 10.0)]);
        assert_eq!(trends_for(&down, "db-1").security, TrendDirection::Declining);
    }

    #[test]
    fn test_vulnerability_trend_hysteresis_band() {
        let flat = history_with_scores(&[(80.0, 30.0), (80.0, 38.0)]);
        assert_eq!(trends_for(&flat, "db-1").vulnerability, VulnTrend::Stable);

        let worse = history_with_scores(&[(80.0, 30.0), (80.0, 45.0)]);
        assert_eq!(trends_for(&worse, "db-1").vulnerability, VulnTrend::Worsening);

        let better = history_with_scores(&[(80.0, 45.0), (80.0, 30.0)]);
        assert_eq!(trends_for(&better, "db-1").vulnerability, VulnTrend::Improving);
    }

    // ── Alert due-date law ──────────────────────────────────────────────────

    #[tokio::test]
    async fn test_alert_due_dates_follow_severity_table() {
        let orchestrator = orchestrator();
        // Weak provider: AUTH_001 (high) and AUTH_002 (critical) violations,
        // no critical vulnerabilities, SOC2 non-compliant.
        let outcome = orchestrator
            .assess_provider_security(
                &[weak_provider("auth-1")],
                &AssessmentOptions {
                    frameworks: Some(vec![Framework::Soc2]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let alerts = &outcome.dashboard.alerts;
        let violation_alerts: Vec<_> =
            alerts.iter().filter(|a| a.alert_type == AlertType::Violation).collect();
        assert_eq!(violation_alerts.len(), 2);
        for alert in &violation_alerts {
            assert_eq!(alert.due_date - alert.timestamp, 24 * 3600);
        }

        let compliance_alerts: Vec<_> =
            alerts.iter().filter(|a| a.alert_type == AlertType::Compliance).collect();
        for alert in &compliance_alerts {
            assert_eq!(alert.due_date - alert.timestamp, 7 * 86_400);
        }
    }

    #[tokio::test]
    async fn test_critical_vulnerability_alert_due_in_four_hours() {
        let orchestrator = orchestrator();
        let provider = Provider::detached(
            "db-vuln",
            ProviderKind::Database,
            json!({
                "mfa_enabled": true,
                "password_policy": {"min_length": 14},
                "session_timeout_minutes": 30,
                "encryption_at_rest": true,
                "tls_version": "1.3",
                "admin_count": 2,
                "audit_logging": true,
                "default_credentials": true,
            }),
        );
        let outcome = orchestrator
            .assess_provider_security(
                &[provider],
                &AssessmentOptions { frameworks: Some(vec![]), ..Default::default() },
            )
            .await
            .unwrap();

        let vuln_alerts: Vec<_> = outcome
            .dashboard
            .alerts
            .iter()
            .filter(|a| a.alert_type == AlertType::Vulnerability)
            .collect();
        assert_eq!(vuln_alerts.len(), 1);
        assert_eq!(vuln_alerts[0].due_date - vuln_alerts[0].timestamp, 4 * 3600);
    }

    // ── Task generation ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_remediation_task_duration_follows_step_count() {
        let orchestrator = orchestrator();
        let outcome = orchestrator
            .assess_provider_security(
                &[weak_provider("auth-1")],
                &AssessmentOptions { frameworks: Some(vec![]), ..Default::default() },
            )
            .await
            .unwrap();

        let remediation: Vec<_> = outcome
            .dashboard
            .upcoming_tasks
            .iter()
            .filter(|t| t.task_type == TaskType::Remediation)
            .collect();
        assert_eq!(remediation.len(), 2);
        for task in remediation {
            assert_eq!(
                task.estimated_minutes,
                task.remediation_steps.len() as i64 * 30
            );
        }
    }

    // ── Escalation / incidents ──────────────────────────────────────────────

    #[tokio::test]
    async fn test_critical_risk_creates_exactly_one_open_incident() {
        let orchestrator = orchestrator();
        let outcome = orchestrator
            .assess_provider_security(
                &[weak_provider("auth-1")],
                &AssessmentOptions { frameworks: Some(vec![]), ..Default::default() },
            )
            .await
            .unwrap();
        assert!(!outcome.dashboard.degraded);

        let incidents = orchestrator.active_incidents();
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].status, IncidentStatus::Open);
        assert_eq!(incidents[0].category, IncidentCategory::Breach);
        assert_eq!(incidents[0].timeline.len(), 1);
    }

    #[tokio::test]
    async fn test_incident_transitions_are_forward_only() {
        let orchestrator = orchestrator();
        orchestrator
            .assess_provider_security(
                &[weak_provider("auth-1")],
                &AssessmentOptions { frameworks: Some(vec![]), ..Default::default() },
            )
            .await
            .unwrap();
        let incident_id = orchestrator.active_incidents()[0].id.clone();

        orchestrator
            .update_incident_status(&incident_id, IncidentStatus::Investigating, "analyst")
            .unwrap();
        orchestrator
            .update_incident_status(&incident_id, IncidentStatus::Contained, "analyst")
            .unwrap();

        // Backwards and repeated transitions are rejected untouched.
        let err = orchestrator
            .update_incident_status(&incident_id, IncidentStatus::Open, "analyst")
            .unwrap_err();
        assert!(matches!(err, VigilError::IncidentTransition { .. }));
        let err = orchestrator
            .update_incident_status(&incident_id, IncidentStatus::Contained, "analyst")
            .unwrap_err();
        assert!(matches!(err, VigilError::IncidentTransition { .. }));

        let incident = orchestrator.incident(&incident_id).unwrap();
        assert_eq!(incident.status, IncidentStatus::Contained);
        // Timeline stayed ascending.
        assert!(incident.timeline.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    // ── Partial-failure isolation ───────────────────────────────────────────

    struct PanicOnProvider {
        target: &'static str,
    }

    #[async_trait]
    impl SecurityRule for PanicOnProvider {
        fn id(&self) -> &str {
            "PANIC_001"
        }
        fn severity(&self) -> Severity {
            Severity::Low
        }
        fn category(&self) -> RuleCategory {
            RuleCategory::Configuration
        }
        fn compliance_tags(&self) -> &[Framework] {
            &[]
        }
        fn description(&self) -> &str {
            "panics for one provider"
        }
        async fn evaluate(&self, provider: &Provider) -> Result<Vec<Violation>, RuleError> {
            if provider.id == self.target {
                panic!("rule blew up");
            }
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_one_bad_provider_never_aborts_the_run() {
        let orchestrator = orchestrator();
        orchestrator.add_custom_rule(Arc::new(PanicOnProvider { target: "bad-1" }));

        let outcome = orchestrator
            .assess_provider_security(
                &[clean_provider("good-1"), clean_provider("bad-1")],
                &AssessmentOptions { frameworks: Some(vec![]), ..Default::default() },
            )
            .await
            .unwrap();

        assert_eq!(outcome.dashboard.providers.len(), 2);
        let bad = outcome
            .dashboard
            .providers
            .iter()
            .find(|p| p.provider_id == "bad-1")
            .unwrap();
        assert!(bad.assessment_failed);
        assert_eq!(bad.status, ProviderHealth::Critical);

        let good = outcome
            .dashboard
            .providers
            .iter()
            .find(|p| p.provider_id == "good-1")
            .unwrap();
        assert!(!good.assessment_failed);
        assert_eq!(good.security_score, 100.0);

        // Synthetic critical alert for the failed provider.
        assert!(outcome
            .dashboard
            .alerts
            .iter()
            .any(|a| a.provider_id == "bad-1" && a.alert_type == AlertType::AssessmentFailure));
        assert_eq!(
            orchestrator
                .bus()
                .recent_events(10, Some(EventTopic::AssessmentError))
                .len(),
            1
        );
    }

    // ── Cancellation ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_cancelled_run_returns_degraded_dashboard() {
        let orchestrator = orchestrator();
        let token = CancellationToken::new();
        token.cancel();

        let outcome = orchestrator
            .assess_provider_security(
                &[clean_provider("db-1")],
                &AssessmentOptions { cancel: Some(token), ..Default::default() },
            )
            .await
            .unwrap();

        assert!(outcome.dashboard.degraded);
        assert!(outcome.dashboard.providers.is_empty());
        // Degraded dashboards are never appended to history.
        assert!(orchestrator.current_dashboard().is_none());
    }

    // ── Auto-remediation eligibility (Scenario C) ───────────────────────────

    #[tokio::test]
    async fn test_auto_remediation_executes_only_eligible_tasks() {
        let orchestrator = orchestrator();
        orchestrator.enqueue_task(task_stub("TASK-A", Severity::Critical, vec![]));
        orchestrator.enqueue_task(task_stub("TASK-B", Severity::High, vec!["TASK-A".into()]));
        orchestrator.enqueue_task(task_stub("TASK-C", Severity::High, vec![]));

        let executed = orchestrator.run_auto_remediation().await;
        assert_eq!(executed, 1);
        assert_eq!(orchestrator.task("TASK-A").unwrap().status, TaskStatus::Pending);
        assert_eq!(orchestrator.task("TASK-B").unwrap().status, TaskStatus::Pending);
        assert_eq!(orchestrator.task("TASK-C").unwrap().status, TaskStatus::Completed);
        assert_eq!(
            orchestrator
                .bus()
                .recent_events(10, Some(EventTopic::AutoRemediationCompleted))
                .len(),
            1
        );
    }

    struct FailingExecutor;

    #[async_trait]
    impl RemediationExecutor for FailingExecutor {
        async fn execute(&self, _task: &SecurityTask) -> Result<(), String> {
            Err("change window closed".into())
        }
    }

    #[tokio::test]
    async fn test_failed_remediation_marks_task_failed() {
        let orchestrator = Orchestrator::new(Arc::new(EventBus::new()), OrchestrationConfig::default())
            .with_remediation_executor(Arc::new(FailingExecutor));
        orchestrator.enqueue_task(task_stub("TASK-X", Severity::High, vec![]));

        let executed = orchestrator.run_auto_remediation().await;
        assert_eq!(executed, 0);
        assert_eq!(orchestrator.task("TASK-X").unwrap().status, TaskStatus::Failed);
        assert_eq!(
            orchestrator
                .bus()
                .recent_events(10, Some(EventTopic::AutoRemediationFailed))
                .len(),
            1
        );
    }

    // ── Alert lifecycle ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_acknowledge_and_resolve_are_idempotent() {
        let orchestrator = orchestrator();
        orchestrator
            .assess_provider_security(
                &[weak_provider("auth-1")],
                &AssessmentOptions { frameworks: Some(vec![]), ..Default::default() },
            )
            .await
            .unwrap();
        let alert_id = orchestrator.pending_alerts()[0].id.clone();

        assert!(orchestrator.acknowledge_alert(&alert_id, "oncall"));
        assert!(orchestrator.acknowledge_alert(&alert_id, "second"));
        // The first acknowledger sticks.
        let alert = orchestrator
            .pending_alerts()
            .into_iter()
            .find(|a| a.id == alert_id)
            .unwrap();
        assert_eq!(alert.acknowledged_by.as_deref(), Some("oncall"));

        assert!(orchestrator.resolve_alert(&alert_id, "oncall", Some("patched")));
        assert!(orchestrator.resolve_alert(&alert_id, "late", None));
        assert!(!orchestrator.pending_alerts().iter().any(|a| a.id == alert_id));

        // Unknown ids report false.
        assert!(!orchestrator.acknowledge_alert("ALERT-999999", "nobody"));
        assert!(!orchestrator.resolve_alert("ALERT-999999", "nobody", None));

        // Exactly one event per transition despite the repeats.
        assert_eq!(
            orchestrator
                .bus()
                .recent_events(10, Some(EventTopic::AlertAcknowledged))
                .len(),
            1
        );
        assert_eq!(
            orchestrator
                .bus()
                .recent_events(10, Some(EventTopic::AlertResolved))
                .len(),
            1
        );
    }

    // ── Configuration & rules ───────────────────────────────────────────────

    #[tokio::test]
    async fn test_update_configuration_emits_event() {
        let orchestrator = orchestrator();
        let mut automation = orchestrator.configuration().automation;
        automation.auto_remediation = true;
        orchestrator.update_configuration(ConfigUpdate {
            automation: Some(automation),
            ..Default::default()
        });
        assert!(orchestrator.configuration().automation.auto_remediation);
        assert_eq!(
            orchestrator
                .bus()
                .recent_events(10, Some(EventTopic::ConfigurationUpdated))
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_rule_mutation_events() {
        let orchestrator = orchestrator();
        assert!(orchestrator.remove_rule("LOG_001"));
        assert!(!orchestrator.remove_rule("LOG_001"));
        assert!(!orchestrator.update_rule(Arc::new(PanicOnProvider { target: "none" })));
        orchestrator.add_custom_rule(Arc::new(PanicOnProvider { target: "none" }));

        let bus = orchestrator.bus();
        assert_eq!(bus.recent_events(10, Some(EventTopic::RuleRemoved)).len(), 1);
        assert_eq!(bus.recent_events(10, Some(EventTopic::RuleAdded)).len(), 1);
    }
}
