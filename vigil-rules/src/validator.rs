//! # Security Validator — rule-driven provider audits
//!
//! Runs a snapshot of the registered rules against one provider and derives
//! the audit score, risk level, per-framework compliance flags and
//! recommendations. Rule failures are contained: a failing rule contributes
//! zero violations and an `audit-error` event, and the audit continues.

use futures::future::join_all;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use vigil_core::events::{EngineEvent, EventBus};
use vigil_core::provider::Provider;
use vigil_core::report::ReportSink;
use vigil_core::types::Severity;

use crate::registry::RuleRegistry;
use crate::types::{AuditOptions, AuditResult, AuditRunOptions, RiskLevel, Violation};

const WEIGHT_CRITICAL: f64 = 40.0;
const WEIGHT_HIGH: f64 = 20.0;
const WEIGHT_MEDIUM: f64 = 10.0;
const WEIGHT_LOW: f64 = 5.0;

const MAX_AUDIT_HISTORY: usize = 10_000;

const NOTE_CRITICAL: &str =
    "URGENT: critical security violations require immediate remediation";
const NOTE_IAM: &str = "Review identity and access management configuration";
const NOTE_ENCRYPTION: &str = "Strengthen encryption for data at rest and in transit";

pub struct SecurityValidator {
    registry: Arc<RuleRegistry>,
    bus: Arc<EventBus>,
    report_sink: Option<Arc<dyn ReportSink>>,
    history: RwLock<Vec<AuditResult>>,
    total_audits: AtomicU64,
    total_rule_failures: AtomicU64,
    next_report_id: AtomicU64,
}

impl SecurityValidator {
    pub fn new(registry: Arc<RuleRegistry>, bus: Arc<EventBus>) -> Self {
        Self {
            registry,
            bus,
            report_sink: None,
            history: RwLock::new(Vec::new()),
            total_audits: AtomicU64::new(0),
            total_rule_failures: AtomicU64::new(0),
            next_report_id: AtomicU64::new(1),
        }
    }

    /// Sink used for batch audit reports.
    pub fn with_report_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.report_sink = Some(sink);
        self
    }

    pub fn registry(&self) -> &Arc<RuleRegistry> {
        &self.registry
    }

    // ── Single provider audit ───────────────────────────────────────────────

    pub async fn audit_provider(&self, provider: &Provider, options: &AuditOptions) -> AuditResult {
        let rules = self.registry.snapshot();
        let mut violations: Vec<Violation> = Vec::new();

        for rule in &rules {
            if let Some(min) = options.severity_filter {
                if rule.severity() < min {
                    continue;
                }
            }
            if let Some(category) = options.category_filter {
                if rule.category() != category {
                    continue;
                }
            }
            match rule.evaluate(provider).await {
                Ok(found) => violations.extend(found),
                Err(e) => {
                    // One bad rule never aborts the audit.
                    self.total_rule_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(provider = %provider.id, rule = %e.rule_id, error = %e.message, "Rule evaluation failed");
                    self.bus.publish(EngineEvent::AuditError {
                        provider_id: provider.id.clone(),
                        rule_id: e.rule_id,
                        message: e.message,
                    });
                }
            }
        }

        let now = chrono::Utc::now().timestamp();
        let overall_score = score_violations(&violations);
        let risk_level = risk_level(&violations);

        let compliance = options
            .frameworks
            .iter()
            .map(|fw| {
                let clean = !violations.iter().any(|v| v.compliance_tags.contains(fw));
                (*fw, clean)
            })
            .collect();

        let result = AuditResult {
            provider_id: provider.id.clone(),
            timestamp: now,
            overall_score,
            risk_level,
            violations: violations.clone(),
            compliance,
            recommendations: recommendations(&violations),
            next_audit: now + next_audit_delta_secs(risk_level),
        };

        self.total_audits.fetch_add(1, Ordering::Relaxed);
        {
            let mut history = self.history.write();
            if history.len() >= MAX_AUDIT_HISTORY {
                let drain = MAX_AUDIT_HISTORY / 10;
                history.drain(..drain);
            }
            history.push(result.clone());
        }

        debug!(provider = %provider.id, score = overall_score, risk = ?risk_level, "Audit completed");
        self.bus.publish(EngineEvent::AuditCompleted {
            provider_id: provider.id.clone(),
            score: overall_score,
            risk_level: risk_level.label().to_string(),
            violations: violations.len(),
        });

        result
    }

    // ── Batch audit ─────────────────────────────────────────────────────────

    pub async fn audit_all_providers(
        &self,
        providers: &[Provider],
        options: &AuditOptions,
        run: &AuditRunOptions,
    ) -> Vec<AuditResult> {
        let results = if run.parallel {
            join_all(providers.iter().map(|p| self.audit_provider(p, options))).await
        } else {
            let mut out = Vec::with_capacity(providers.len());
            for provider in providers {
                out.push(self.audit_provider(provider, options).await);
            }
            out
        };

        if run.generate_report {
            if let Some(sink) = &self.report_sink {
                let report_id = format!(
                    "audit-batch-{:04}",
                    self.next_report_id.fetch_add(1, Ordering::Relaxed)
                );
                match serde_json::to_value(&results) {
                    Ok(payload) => {
                        if let Err(e) = sink.store(&report_id, &payload).await {
                            warn!(report = %report_id, error = %e, "Batch audit report not persisted");
                        }
                    }
                    Err(e) => warn!(error = %e, "Batch audit report serialization failed"),
                }
            }
        }

        results
    }

    // ── Queries / stats ─────────────────────────────────────────────────────

    pub fn latest_for(&self, provider_id: &str) -> Option<AuditResult> {
        let history = self.history.read();
        history.iter().rev().find(|r| r.provider_id == provider_id).cloned()
    }

    pub fn history(&self, limit: usize) -> Vec<AuditResult> {
        let history = self.history.read();
        history.iter().rev().take(limit).cloned().collect()
    }

    pub fn total_audits(&self) -> u64 {
        self.total_audits.load(Ordering::Relaxed)
    }

    pub fn total_rule_failures(&self) -> u64 {
        self.total_rule_failures.load(Ordering::Relaxed)
    }
}

// ── Scoring ─────────────────────────────────────────────────────────────────

/// Severity-weighted deduction from 100, clamped at zero. The deduction is
/// deliberately unbounded: enough low-severity violations weigh as much as
/// one critical.
pub fn score_violations(violations: &[Violation]) -> f64 {
    let deduction: f64 = violations
        .iter()
        .map(|v| match v.severity {
            Severity::Critical => WEIGHT_CRITICAL,
            Severity::High => WEIGHT_HIGH,
            Severity::Medium => WEIGHT_MEDIUM,
            Severity::Low => WEIGHT_LOW,
        })
        .sum();
    (100.0 - deduction).clamp(0.0, 100.0)
}

pub fn risk_level(violations: &[Violation]) -> RiskLevel {
    let critical = violations.iter().filter(|v| v.severity == Severity::Critical).count();
    let high = violations.iter().filter(|v| v.severity == Severity::High).count();
    if critical > 0 {
        RiskLevel::Critical
    } else if high > 2 {
        RiskLevel::High
    } else if high > 0 || violations.len() > 5 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn next_audit_delta_secs(risk: RiskLevel) -> i64 {
    match risk {
        RiskLevel::Critical => 86_400,
        RiskLevel::High => 7 * 86_400,
        RiskLevel::Medium => 30 * 86_400,
        RiskLevel::Low => 90 * 86_400,
    }
}

/// Deduplicated violation recommendations plus pattern notes.
fn recommendations(violations: &[Violation]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for v in violations {
        if seen.insert(v.recommendation.clone()) {
            out.push(v.recommendation.clone());
        }
    }
    if violations.iter().any(|v| v.severity == Severity::Critical) {
        out.push(NOTE_CRITICAL.to_string());
    }
    if violations.iter().any(|v| v.rule_id.starts_with("AUTH_")) {
        out.push(NOTE_IAM.to_string());
    }
    if violations.iter().any(|v| v.rule_id.starts_with("ENC_")) {
        out.push(NOTE_ENCRYPTION.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use vigil_core::error::RuleError;
    use vigil_core::events::EventTopic;
    use vigil_core::provider::ProviderKind;
    use vigil_core::types::{Framework, RuleCategory};

    use crate::registry::SecurityRule;

    fn make_violation(rule_id: &str, severity: Severity) -> Violation {
        Violation {
            rule_id: rule_id.into(),
            severity,
            message: "m".into(),
            location: "l".into(),
            recommendation: format!("fix {}", rule_id),
            compliance_tags: vec![],
            remediation_steps: vec![],
        }
    }

    fn clean_provider() -> Provider {
        Provider::detached(
            "db-1",
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

    fn weak_provider() -> Provider {
        // Fails AUTH_001 (no password policy) and AUTH_002 (no MFA), passes
        // every other builtin rule.
        Provider::detached(
            "db-2",
            ProviderKind::Database,
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

    struct FailingRule;

    #[async_trait]
    impl SecurityRule for FailingRule {
        fn id(&self) -> &str {
            "FAIL_001"
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
            "always fails"
        }
        async fn evaluate(&self, _provider: &Provider) -> Result<Vec<Violation>, RuleError> {
            Err(RuleError::new("FAIL_001", "probe unavailable"))
        }
    }

    #[test]
    fn test_score_clamps_at_zero() {
        let violations: Vec<_> =
            (0..5).map(|i| make_violation(&format!("R_{}", i), Severity::Critical)).collect();
        assert_eq!(score_violations(&violations), 0.0);
        assert_eq!(score_violations(&[]), 100.0);
    }

    #[test]
    fn test_score_monotonically_non_increasing() {
        let mut violations = Vec::new();
        let mut last = score_violations(&violations);
        for severity in [Severity::Low, Severity::Medium, Severity::High, Severity::Critical] {
            violations.push(make_violation("R", severity));
            let score = score_violations(&violations);
            assert!(score <= last);
            last = score;
        }
    }

    #[test]
    fn test_many_low_equal_one_critical() {
        let lows: Vec<_> = (0..8).map(|i| make_violation(&format!("L_{}", i), Severity::Low)).collect();
        let critical = [make_violation("C", Severity::Critical)];
        assert_eq!(score_violations(&lows), score_violations(&critical));
    }

    #[test]
    fn test_single_critical_forces_critical_risk() {
        let mut violations: Vec<_> =
            (0..10).map(|i| make_violation(&format!("L_{}", i), Severity::Low)).collect();
        violations.push(make_violation("C", Severity::Critical));
        assert_eq!(risk_level(&violations), RiskLevel::Critical);
    }

    #[test]
    fn test_risk_ladder() {
        assert_eq!(risk_level(&[]), RiskLevel::Low);
        let highs: Vec<_> = (0..3).map(|i| make_violation(&format!("H_{}", i), Severity::High)).collect();
        assert_eq!(risk_level(&highs), RiskLevel::High);
        assert_eq!(risk_level(&highs[..1]), RiskLevel::Medium);
        let lows: Vec<_> = (0..6).map(|i| make_violation(&format!("L_{}", i), Severity::Low)).collect();
        assert_eq!(risk_level(&lows), RiskLevel::Medium);
    }

    #[tokio::test]
    async fn test_clean_provider_scores_100() {
        let bus = Arc::new(EventBus::new());
        let validator =
            SecurityValidator::new(Arc::new(RuleRegistry::with_builtin_rules()), bus);
        let result = validator.audit_provider(&clean_provider(), &AuditOptions::default()).await;
        assert_eq!(result.overall_score, 100.0);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert!(result.violations.is_empty());
    }

    #[tokio::test]
    async fn test_missing_password_policy_and_mfa_scores_40() {
        let bus = Arc::new(EventBus::new());
        let validator =
            SecurityValidator::new(Arc::new(RuleRegistry::with_builtin_rules()), bus);
        let result = validator.audit_provider(&weak_provider(), &AuditOptions::default()).await;
        assert_eq!(result.overall_score, 40.0);
        assert_eq!(result.risk_level, RiskLevel::Critical);
        assert_eq!(result.violations.len(), 2);
    }

    #[tokio::test]
    async fn test_determinism_on_repeated_runs() {
        let bus = Arc::new(EventBus::new());
        let validator =
            SecurityValidator::new(Arc::new(RuleRegistry::with_builtin_rules()), bus);
        let first = validator.audit_provider(&weak_provider(), &AuditOptions::default()).await;
        let second = validator.audit_provider(&weak_provider(), &AuditOptions::default()).await;
        assert_eq!(first.overall_score, second.overall_score);
        assert_eq!(first.risk_level, second.risk_level);
        let first_rules: Vec<_> = first.violations.iter().map(|v| &v.rule_id).collect();
        let second_rules: Vec<_> = second.violations.iter().map(|v| &v.rule_id).collect();
        assert_eq!(first_rules, second_rules);
    }

    #[tokio::test]
    async fn test_rule_failure_is_isolated() {
        let registry = Arc::new(RuleRegistry::with_builtin_rules());
        registry.add(Arc::new(FailingRule));
        let bus = Arc::new(EventBus::new());
        let validator = SecurityValidator::new(registry, bus.clone());

        let result = validator.audit_provider(&clean_provider(), &AuditOptions::default()).await;
        assert_eq!(result.overall_score, 100.0);
        assert_eq!(validator.total_rule_failures(), 1);
        assert_eq!(bus.recent_events(10, Some(EventTopic::AuditError)).len(), 1);
    }

    #[tokio::test]
    async fn test_compliance_flags_follow_tags() {
        let bus = Arc::new(EventBus::new());
        let validator =
            SecurityValidator::new(Arc::new(RuleRegistry::with_builtin_rules()), bus);
        let options = AuditOptions {
            frameworks: vec![Framework::Soc2, Framework::Gdpr],
            ..Default::default()
        };
        // AUTH_002 carries SOC2 but not GDPR; everything else passes.
        let provider = Provider::detached(
            "auth-1",
            ProviderKind::AuthService,
            json!({
                "mfa_enabled": false,
                "password_policy": {"min_length": 14},
                "session_timeout_minutes": 30,
                "encryption_at_rest": true,
                "tls_version": "1.3",
                "admin_count": 2,
                "audit_logging": true,
            }),
        );
        let result = validator.audit_provider(&provider, &options).await;
        assert_eq!(result.compliance.get(&Framework::Soc2), Some(&false));
        assert_eq!(result.compliance.get(&Framework::Gdpr), Some(&true));
    }

    #[tokio::test]
    async fn test_pattern_recommendations() {
        let bus = Arc::new(EventBus::new());
        let validator =
            SecurityValidator::new(Arc::new(RuleRegistry::with_builtin_rules()), bus);
        let result = validator.audit_provider(&weak_provider(), &AuditOptions::default()).await;
        assert!(result.recommendations.iter().any(|r| r == NOTE_CRITICAL));
        assert!(result.recommendations.iter().any(|r| r == NOTE_IAM));
        assert!(!result.recommendations.iter().any(|r| r == NOTE_ENCRYPTION));
    }

    #[tokio::test]
    async fn test_category_filter_limits_rules() {
        let bus = Arc::new(EventBus::new());
        let validator =
            SecurityValidator::new(Arc::new(RuleRegistry::with_builtin_rules()), bus);
        let options = AuditOptions {
            category_filter: Some(RuleCategory::Encryption),
            ..Default::default()
        };
        // Fails everything, but only encryption rules run.
        let provider = Provider::detached("db-3", ProviderKind::Database, json!({}));
        let result = validator.audit_provider(&provider, &options).await;
        assert!(result.violations.iter().all(|v| v.rule_id.starts_with("ENC_")));
        assert_eq!(result.violations.len(), 2);
    }

    #[tokio::test]
    async fn test_batch_audit_parallel_matches_sequential() {
        let bus = Arc::new(EventBus::new());
        let validator =
            SecurityValidator::new(Arc::new(RuleRegistry::with_builtin_rules()), bus);
        let providers = vec![clean_provider(), weak_provider()];

        let sequential = validator
            .audit_all_providers(&providers, &AuditOptions::default(), &AuditRunOptions::default())
            .await;
        let parallel = validator
            .audit_all_providers(
                &providers,
                &AuditOptions::default(),
                &AuditRunOptions { parallel: true, generate_report: false },
            )
            .await;

        assert_eq!(sequential.len(), 2);
        assert_eq!(parallel.len(), 2);
        for (s, p) in sequential.iter().zip(parallel.iter()) {
            assert_eq!(s.provider_id, p.provider_id);
            assert_eq!(s.overall_score, p.overall_score);
        }
    }
}
