//! # Compliance Checker — gap analysis over audit output

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use vigil_core::types::{Framework, Severity};
use vigil_rules::types::AuditResult;

use crate::frameworks;
use crate::types::{
    ComplianceAssessment, ComplianceGap, ComplianceStatus, GapRemediation,
};

/// Score at or above which a non-compliant assessment is classed Partial.
const PARTIAL_THRESHOLD: f64 = 70.0;

const MAX_ASSESSMENT_HISTORY: usize = 10_000;

fn timeline_days(severity: Severity) -> i64 {
    match severity {
        Severity::Critical => 7,
        Severity::High => 30,
        Severity::Medium => 60,
        Severity::Low => 90,
    }
}

pub struct ComplianceChecker {
    history: RwLock<Vec<ComplianceAssessment>>,
    total_assessments: AtomicU64,
}

impl ComplianceChecker {
    pub fn new() -> Self {
        Self { history: RwLock::new(Vec::new()), total_assessments: AtomicU64::new(0) }
    }

    /// Assess one framework against a provider's already-computed audit.
    ///
    /// Works entirely from the audit's violations; provider-touching rule
    /// callbacks are never re-invoked here.
    pub fn assess(&self, framework: Framework, audit: &AuditResult) -> ComplianceAssessment {
        let requirements = frameworks::requirements(framework);
        let mut gaps = Vec::new();
        let mut passed = 0usize;

        for requirement in requirements {
            let violated: Vec<String> = audit
                .violations
                .iter()
                .filter(|v| requirement.rule_ids.contains(&v.rule_id.as_str()))
                .map(|v| v.rule_id.clone())
                .collect();

            if violated.is_empty() {
                passed += 1;
                continue;
            }

            // First violated rule's recommendation doubles as the gap action.
            let action = audit
                .violations
                .iter()
                .find(|v| v.rule_id == violated[0])
                .map(|v| v.recommendation.clone())
                .unwrap_or_else(|| format!("Close requirement {}", requirement.id));

            gaps.push(ComplianceGap {
                requirement_id: requirement.id.to_string(),
                description: requirement.description.to_string(),
                severity: requirement.severity,
                violated_rules: violated,
                remediation: GapRemediation {
                    action,
                    timeline_days: timeline_days(requirement.severity),
                },
            });
        }

        let total = requirements.len();
        let overall_score = if total == 0 {
            100.0
        } else {
            passed as f64 / total as f64 * 100.0
        };
        let status = if gaps.is_empty() {
            ComplianceStatus::Compliant
        } else if overall_score >= PARTIAL_THRESHOLD {
            ComplianceStatus::Partial
        } else {
            ComplianceStatus::NonCompliant
        };

        let assessment = ComplianceAssessment {
            framework,
            provider_id: audit.provider_id.clone(),
            timestamp: chrono::Utc::now().timestamp(),
            overall_score,
            status,
            requirements_total: total,
            requirements_passed: passed,
            gaps,
        };

        self.total_assessments.fetch_add(1, Ordering::Relaxed);
        {
            let mut history = self.history.write();
            if history.len() >= MAX_ASSESSMENT_HISTORY {
                let drain = MAX_ASSESSMENT_HISTORY / 10;
                history.drain(..drain);
            }
            history.push(assessment.clone());
        }

        debug!(
            framework = %framework,
            provider = %audit.provider_id,
            score = overall_score,
            status = ?status,
            "Compliance assessed"
        );

        assessment
    }

    pub fn latest_for(
        &self,
        provider_id: &str,
        framework: Framework,
    ) -> Option<ComplianceAssessment> {
        let history = self.history.read();
        history
            .iter()
            .rev()
            .find(|a| a.provider_id == provider_id && a.framework == framework)
            .cloned()
    }

    pub fn total_assessments(&self) -> u64 {
        self.total_assessments.load(Ordering::Relaxed)
    }
}

impl Default for ComplianceChecker {
    fn default() -> Self {
        Self::new()
    }
}
