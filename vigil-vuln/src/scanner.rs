//! # Vulnerability Scanner — depth-scaled provider scans

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use vigil_core::events::{EngineEvent, EventBus};
use vigil_core::provider::Provider;
use vigil_core::types::Severity;

use crate::probes::VulnProbe;
use crate::types::{Finding, ScanDepth, ScanResult, ScanSummary};

const RISK_WEIGHT_CRITICAL: f64 = 25.0;
const RISK_WEIGHT_HIGH: f64 = 10.0;
const RISK_WEIGHT_MEDIUM: f64 = 5.0;
const RISK_WEIGHT_LOW: f64 = 2.0;

const MAX_SCAN_HISTORY: usize = 10_000;

pub struct VulnerabilityScanner {
    probes: RwLock<Vec<Arc<dyn VulnProbe>>>,
    bus: Arc<EventBus>,
    history: RwLock<Vec<ScanResult>>,
    total_scans: AtomicU64,
    total_probe_failures: AtomicU64,
}

impl VulnerabilityScanner {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            probes: RwLock::new(Vec::new()),
            bus,
            history: RwLock::new(Vec::new()),
            total_scans: AtomicU64::new(0),
            total_probe_failures: AtomicU64::new(0),
        }
    }

    /// Scanner preloaded with the builtin probe set.
    pub fn with_builtin_probes(bus: Arc<EventBus>) -> Self {
        let scanner = Self::new(bus);
        for probe in crate::probes::all() {
            scanner.register_probe(probe);
        }
        scanner
    }

    pub fn register_probe(&self, probe: Arc<dyn VulnProbe>) {
        self.probes.write().push(probe);
    }

    /// Scan one provider at the requested depth. Every probe whose minimum
    /// depth is at or below the requested depth runs, so deeper scans
    /// produce supersets of shallower ones for unchanged provider state.
    pub async fn scan(&self, provider: &Provider, depth: ScanDepth) -> ScanResult {
        let probes: Vec<_> = {
            let mut snapshot: Vec<_> = self.probes.read().clone();
            snapshot.sort_by(|a, b| a.id().cmp(b.id()));
            snapshot.into_iter().filter(|p| p.min_depth() <= depth).collect()
        };

        let mut findings: Vec<Finding> = Vec::new();
        for probe in &probes {
            match probe.probe(provider).await {
                Ok(found) => findings.extend(found),
                Err(e) => {
                    self.total_probe_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(provider = %provider.id, probe = %e.probe_id, error = %e.message, "Probe failed");
                    self.bus.publish(EngineEvent::ScanError {
                        provider_id: provider.id.clone(),
                        probe_id: e.probe_id,
                        message: e.message,
                    });
                }
            }
        }

        let summary = summarize(&findings);
        let result = ScanResult {
            provider_id: provider.id.clone(),
            depth,
            timestamp: chrono::Utc::now().timestamp(),
            findings,
            summary,
        };

        self.total_scans.fetch_add(1, Ordering::Relaxed);
        {
            let mut history = self.history.write();
            if history.len() >= MAX_SCAN_HISTORY {
                let drain = MAX_SCAN_HISTORY / 10;
                history.drain(..drain);
            }
            history.push(result.clone());
        }

        debug!(
            provider = %provider.id,
            depth = ?depth,
            findings = result.findings.len(),
            risk = result.summary.risk_score,
            "Scan completed"
        );

        result
    }

    pub fn latest_for(&self, provider_id: &str) -> Option<ScanResult> {
        let history = self.history.read();
        history.iter().rev().find(|r| r.provider_id == provider_id).cloned()
    }

    pub fn total_scans(&self) -> u64 {
        self.total_scans.load(Ordering::Relaxed)
    }

    pub fn total_probe_failures(&self) -> u64 {
        self.total_probe_failures.load(Ordering::Relaxed)
    }
}

/// Severity histogram and the derived aggregate risk score.
fn summarize(findings: &[Finding]) -> ScanSummary {
    let mut summary = ScanSummary::default();
    for finding in findings {
        match finding.severity {
            Severity::Critical => summary.critical += 1,
            Severity::High => summary.high += 1,
            Severity::Medium => summary.medium += 1,
            Severity::Low => summary.low += 1,
        }
    }
    summary.risk_score = (summary.critical as f64 * RISK_WEIGHT_CRITICAL
        + summary.high as f64 * RISK_WEIGHT_HIGH
        + summary.medium as f64 * RISK_WEIGHT_MEDIUM
        + summary.low as f64 * RISK_WEIGHT_LOW)
        .clamp(0.0, 100.0);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashSet;
    use vigil_core::error::ProbeError;
    use vigil_core::events::EventTopic;
    use vigil_core::provider::ProviderKind;

    fn vulnerable_provider() -> Provider {
        Provider::detached(
            "db-1",
            ProviderKind::Database,
            json!({
                "default_credentials": true,
                "version_age_days": 900,
                "days_since_last_patch": 200,
            }),
        )
    }

    #[tokio::test]
    async fn test_clean_provider_scores_zero() {
        let scanner = VulnerabilityScanner::with_builtin_probes(Arc::new(EventBus::new()));
        let provider = Provider::detached(
            "db-0",
            ProviderKind::Database,
            json!({"tls_version": "1.3"}),
        );
        let result = scanner.scan(&provider, ScanDepth::Comprehensive).await;
        assert!(result.findings.is_empty());
        assert_eq!(result.summary.risk_score, 0.0);
    }

    #[tokio::test]
    async fn test_depth_monotonicity() {
        let scanner = VulnerabilityScanner::with_builtin_probes(Arc::new(EventBus::new()));
        let provider = vulnerable_provider();

        let surface = scanner.scan(&provider, ScanDepth::Surface).await;
        let deep = scanner.scan(&provider, ScanDepth::Deep).await;
        let comprehensive = scanner.scan(&provider, ScanDepth::Comprehensive).await;

        let ids = |r: &ScanResult| -> HashSet<String> {
            r.findings.iter().map(|f| f.id.clone()).collect()
        };
        assert!(ids(&surface).is_subset(&ids(&deep)));
        assert!(ids(&deep).is_subset(&ids(&comprehensive)));
        // The deeper scans actually add findings for this provider.
        assert!(ids(&comprehensive).len() > ids(&surface).len());
    }

    #[tokio::test]
    async fn test_risk_score_follows_histogram() {
        let scanner = VulnerabilityScanner::with_builtin_probes(Arc::new(EventBus::new()));
        let result = scanner.scan(&vulnerable_provider(), ScanDepth::Comprehensive).await;
        // Two critical (default creds, patch window) + two high (no TLS,
        // outdated engine): 2*25 + 2*10 = 70.
        assert_eq!(result.summary.critical, 2);
        assert_eq!(result.summary.high, 2);
        assert_eq!(result.summary.risk_score, 70.0);
    }

    #[tokio::test]
    async fn test_risk_score_clamps_at_100() {
        let findings: Vec<Finding> = (0..10)
            .map(|i| Finding {
                id: format!("V_{}", i),
                title: "t".into(),
                severity: Severity::Critical,
                component: "c".into(),
                description: "d".into(),
                remediation_timeline_days: 1,
            })
            .collect();
        assert_eq!(summarize(&findings).risk_score, 100.0);
    }

    struct BrokenProbe;

    #[async_trait]
    impl VulnProbe for BrokenProbe {
        fn id(&self) -> &str {
            "PROBE_BROKEN"
        }
        fn min_depth(&self) -> ScanDepth {
            ScanDepth::Surface
        }
        async fn probe(&self, _provider: &Provider) -> Result<Vec<Finding>, ProbeError> {
            Err(ProbeError::new("PROBE_BROKEN", "endpoint unreachable"))
        }
    }

    #[tokio::test]
    async fn test_probe_failure_is_isolated() {
        let bus = Arc::new(EventBus::new());
        let scanner = VulnerabilityScanner::with_builtin_probes(bus.clone());
        scanner.register_probe(Arc::new(BrokenProbe));

        let result = scanner.scan(&vulnerable_provider(), ScanDepth::Surface).await;
        // The broken probe contributed nothing but the scan completed.
        assert!(!result.findings.is_empty());
        assert_eq!(scanner.total_probe_failures(), 1);
        assert_eq!(bus.recent_events(10, Some(EventTopic::ScanError)).len(), 1);
    }
}
