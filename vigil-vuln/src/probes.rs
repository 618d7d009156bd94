//! Builtin vulnerability probes.
//!
//! The engine ships a heuristic knowledge base that evaluates provider
//! config; real deployments register additional probes backed by live
//! checks or vulnerability feeds through the same contract.

use async_trait::async_trait;
use std::sync::Arc;

use vigil_core::error::ProbeError;
use vigil_core::provider::Provider;
use vigil_core::types::Severity;

use crate::types::{Finding, ScanDepth};

/// The vulnerability probe contract. Probes may use the live provider
/// handle; failures are contained by the scanner.
#[async_trait]
pub trait VulnProbe: Send + Sync {
    fn id(&self) -> &str;
    /// Shallowest depth at which this probe runs.
    fn min_depth(&self) -> ScanDepth;
    async fn probe(&self, provider: &Provider) -> Result<Vec<Finding>, ProbeError>;
}

/// All builtin probes, ready for registration.
pub fn all() -> Vec<Arc<dyn VulnProbe>> {
    vec![
        Arc::new(DefaultCredentialsProbe),
        Arc::new(TlsConfigProbe),
        Arc::new(EngineVersionProbe),
        Arc::new(AdminPortProbe),
        Arc::new(CipherSuiteProbe),
        Arc::new(PatchWindowProbe),
        Arc::new(PrivilegeEscalationProbe),
    ]
}

fn remediation_days(severity: Severity) -> i64 {
    match severity {
        Severity::Critical => 1,
        Severity::High => 7,
        Severity::Medium => 30,
        Severity::Low => 90,
    }
}

fn finding(
    id: &str,
    title: &str,
    severity: Severity,
    component: &str,
    description: impl Into<String>,
) -> Finding {
    Finding {
        id: id.to_string(),
        title: title.to_string(),
        severity,
        component: component.to_string(),
        description: description.into(),
        remediation_timeline_days: remediation_days(severity),
    }
}

// ── Surface probes ──────────────────────────────────────────────────────────

pub struct DefaultCredentialsProbe;

#[async_trait]
impl VulnProbe for DefaultCredentialsProbe {
    fn id(&self) -> &str {
        "PROBE_DEFAULT_CREDS"
    }
    fn min_depth(&self) -> ScanDepth {
        ScanDepth::Surface
    }
    async fn probe(&self, provider: &Provider) -> Result<Vec<Finding>, ProbeError> {
        if provider.config.get_bool("default_credentials") == Some(true) {
            return Ok(vec![finding(
                "VULN_DEFAULT_CREDS",
                "Default credentials active",
                Severity::Critical,
                "authentication",
                "Vendor-default credentials are accepted for login",
            )]);
        }
        Ok(vec![])
    }
}

pub struct TlsConfigProbe;

#[async_trait]
impl VulnProbe for TlsConfigProbe {
    fn id(&self) -> &str {
        "PROBE_TLS_CONFIG"
    }
    fn min_depth(&self) -> ScanDepth {
        ScanDepth::Surface
    }
    async fn probe(&self, provider: &Provider) -> Result<Vec<Finding>, ProbeError> {
        match provider.config.get_str("tls_version") {
            None => Ok(vec![finding(
                "VULN_NO_TLS",
                "Unencrypted transport",
                Severity::High,
                "transport",
                "Client connections are not TLS protected",
            )]),
            Some("1.0") | Some("1.1") => Ok(vec![finding(
                "VULN_LEGACY_TLS",
                "Legacy TLS protocol",
                Severity::High,
                "transport",
                "Deprecated TLS version accepted for client connections",
            )]),
            Some(_) => Ok(vec![]),
        }
    }
}

// ── Deep probes ─────────────────────────────────────────────────────────────

pub struct EngineVersionProbe;

#[async_trait]
impl VulnProbe for EngineVersionProbe {
    fn id(&self) -> &str {
        "PROBE_ENGINE_VERSION"
    }
    fn min_depth(&self) -> ScanDepth {
        ScanDepth::Deep
    }
    async fn probe(&self, provider: &Provider) -> Result<Vec<Finding>, ProbeError> {
        match provider.config.get_u64("version_age_days") {
            Some(age) if age > 365 => Ok(vec![finding(
                "VULN_OUTDATED_ENGINE",
                "Outdated engine version",
                Severity::High,
                "engine",
                format!("Running a release {} days old", age),
            )]),
            _ => Ok(vec![]),
        }
    }
}

pub struct AdminPortProbe;

#[async_trait]
impl VulnProbe for AdminPortProbe {
    fn id(&self) -> &str {
        "PROBE_ADMIN_PORT"
    }
    fn min_depth(&self) -> ScanDepth {
        ScanDepth::Deep
    }
    async fn probe(&self, provider: &Provider) -> Result<Vec<Finding>, ProbeError> {
        if provider.config.get_bool("admin_port_open") == Some(true) {
            return Ok(vec![finding(
                "VULN_ADMIN_PORT",
                "Administrative port exposed",
                Severity::Medium,
                "network",
                "Management interface reachable from application networks",
            )]);
        }
        Ok(vec![])
    }
}

pub struct CipherSuiteProbe;

#[async_trait]
impl VulnProbe for CipherSuiteProbe {
    fn id(&self) -> &str {
        "PROBE_CIPHER_SUITES"
    }
    fn min_depth(&self) -> ScanDepth {
        ScanDepth::Deep
    }
    async fn probe(&self, provider: &Provider) -> Result<Vec<Finding>, ProbeError> {
        if provider.config.get_bool("weak_ciphers") == Some(true) {
            return Ok(vec![finding(
                "VULN_WEAK_CIPHERS",
                "Weak cipher suites enabled",
                Severity::Medium,
                "transport",
                "Negotiable cipher suites include known-weak algorithms",
            )]);
        }
        Ok(vec![])
    }
}

// ── Comprehensive probes ────────────────────────────────────────────────────

pub struct PatchWindowProbe;

#[async_trait]
impl VulnProbe for PatchWindowProbe {
    fn id(&self) -> &str {
        "PROBE_PATCH_WINDOW"
    }
    fn min_depth(&self) -> ScanDepth {
        ScanDepth::Comprehensive
    }
    async fn probe(&self, provider: &Provider) -> Result<Vec<Finding>, ProbeError> {
        match provider.config.get_u64("days_since_last_patch") {
            Some(days) if days > 90 => Ok(vec![finding(
                "VULN_PATCH_WINDOW",
                "Patch window exceeded",
                Severity::Critical,
                "engine",
                format!("No security patches applied for {} days", days),
            )]),
            _ => Ok(vec![]),
        }
    }
}

pub struct PrivilegeEscalationProbe;

#[async_trait]
impl VulnProbe for PrivilegeEscalationProbe {
    fn id(&self) -> &str {
        "PROBE_PRIV_ESCALATION"
    }
    fn min_depth(&self) -> ScanDepth {
        ScanDepth::Comprehensive
    }
    async fn probe(&self, provider: &Provider) -> Result<Vec<Finding>, ProbeError> {
        if provider.config.get_bool("service_runs_as_root") == Some(true) {
            return Ok(vec![finding(
                "VULN_ROOT_SERVICE",
                "Service runs with root privileges",
                Severity::High,
                "runtime",
                "A compromise of the service yields full host privileges",
            )]);
        }
        Ok(vec![])
    }
}
