//! Builtin rule catalog.
//!
//! Every builtin rule evaluates the provider's structured config, so audits
//! of an unchanged provider are deterministic. Custom rules registered by
//! callers may probe the live instance handle instead.

use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;

use vigil_core::error::RuleError;
use vigil_core::provider::Provider;
use vigil_core::types::{Framework, RuleCategory, Severity};

use crate::registry::SecurityRule;
use crate::types::Violation;

/// All builtin rules, ready for registration.
pub fn all() -> Vec<Arc<dyn SecurityRule>> {
    vec![
        Arc::new(PasswordPolicyRule),
        Arc::new(MfaRule),
        Arc::new(SessionTimeoutRule),
        Arc::new(EncryptionAtRestRule),
        Arc::new(TlsInTransitRule),
        Arc::new(LeastPrivilegeRule),
        Arc::new(PublicExposureRule),
        Arc::new(PlaintextSecretRule),
        Arc::new(AuditLoggingRule),
    ]
}

fn violation(
    rule: &dyn SecurityRule,
    provider: &Provider,
    key: &str,
    message: impl Into<String>,
    recommendation: impl Into<String>,
    remediation_steps: Vec<String>,
) -> Violation {
    Violation {
        rule_id: rule.id().to_string(),
        severity: rule.severity(),
        message: message.into(),
        location: format!("{}:config.{}", provider.id, key),
        recommendation: recommendation.into(),
        compliance_tags: rule.compliance_tags().to_vec(),
        remediation_steps,
    }
}

// ── AUTH_001: password policy ───────────────────────────────────────────────

pub struct PasswordPolicyRule;

#[async_trait]
impl SecurityRule for PasswordPolicyRule {
    fn id(&self) -> &str {
        "AUTH_001"
    }
    fn severity(&self) -> Severity {
        Severity::High
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::Authentication
    }
    fn compliance_tags(&self) -> &[Framework] {
        &[Framework::Soc2, Framework::Iso27001, Framework::PciDss]
    }
    fn description(&self) -> &str {
        "Providers must enforce a password policy with a minimum length of 12"
    }

    async fn evaluate(&self, provider: &Provider) -> Result<Vec<Violation>, RuleError> {
        let steps = vec![
            "Define a password policy requiring at least 12 characters".to_string(),
            "Enable policy enforcement on all login paths".to_string(),
            "Expire credentials that predate the policy".to_string(),
        ];
        let min_length = provider
            .config
            .get("password_policy")
            .and_then(|p| p.get("min_length"))
            .and_then(serde_json::Value::as_u64);
        let out = match min_length {
            None => vec![violation(
                self,
                provider,
                "password_policy",
                "No password policy configured",
                "Configure and enforce a password policy",
                steps,
            )],
            Some(n) if n < 12 => vec![violation(
                self,
                provider,
                "password_policy.min_length",
                format!("Password minimum length {} is below 12", n),
                "Raise the password minimum length to 12 or more",
                steps,
            )],
            Some(_) => vec![],
        };
        Ok(out)
    }
}

// ── AUTH_002: multi-factor authentication ───────────────────────────────────

pub struct MfaRule;

#[async_trait]
impl SecurityRule for MfaRule {
    fn id(&self) -> &str {
        "AUTH_002"
    }
    fn severity(&self) -> Severity {
        Severity::Critical
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::Authentication
    }
    fn compliance_tags(&self) -> &[Framework] {
        &[Framework::Soc2, Framework::Hipaa, Framework::PciDss]
    }
    fn description(&self) -> &str {
        "Administrative access must require multi-factor authentication"
    }

    async fn evaluate(&self, provider: &Provider) -> Result<Vec<Violation>, RuleError> {
        if provider.config.get_bool("mfa_enabled") == Some(true) {
            return Ok(vec![]);
        }
        Ok(vec![violation(
            self,
            provider,
            "mfa_enabled",
            "Multi-factor authentication is not enabled",
            "Enable MFA for all administrative accounts",
            vec![
                "Enable MFA enforcement in the provider's auth settings".to_string(),
                "Enroll all administrative accounts".to_string(),
            ],
        )])
    }
}

// ── AUTH_003: session timeout ───────────────────────────────────────────────

pub struct SessionTimeoutRule;

#[async_trait]
impl SecurityRule for SessionTimeoutRule {
    fn id(&self) -> &str {
        "AUTH_003"
    }
    fn severity(&self) -> Severity {
        Severity::Medium
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::Authentication
    }
    fn compliance_tags(&self) -> &[Framework] {
        &[Framework::Soc2, Framework::Hipaa]
    }
    fn description(&self) -> &str {
        "Idle sessions must expire within 60 minutes"
    }

    async fn evaluate(&self, provider: &Provider) -> Result<Vec<Violation>, RuleError> {
        let timeout = provider.config.get_u64("session_timeout_minutes");
        let out = match timeout {
            Some(t) if t <= 60 => vec![],
            Some(t) => vec![violation(
                self,
                provider,
                "session_timeout_minutes",
                format!("Session timeout of {} minutes exceeds 60", t),
                "Reduce the idle session timeout to 60 minutes or less",
                vec!["Set the idle session timeout to 60 minutes".to_string()],
            )],
            None => vec![violation(
                self,
                provider,
                "session_timeout_minutes",
                "No session timeout configured",
                "Configure an idle session timeout",
                vec!["Set the idle session timeout to 60 minutes".to_string()],
            )],
        };
        Ok(out)
    }
}

// ── ENC_001: encryption at rest ─────────────────────────────────────────────

pub struct EncryptionAtRestRule;

#[async_trait]
impl SecurityRule for EncryptionAtRestRule {
    fn id(&self) -> &str {
        "ENC_001"
    }
    fn severity(&self) -> Severity {
        Severity::Critical
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::Encryption
    }
    fn compliance_tags(&self) -> &[Framework] {
        &[Framework::Gdpr, Framework::Hipaa, Framework::PciDss, Framework::Iso27001]
    }
    fn description(&self) -> &str {
        "Stored data must be encrypted at rest"
    }

    async fn evaluate(&self, provider: &Provider) -> Result<Vec<Violation>, RuleError> {
        if provider.config.get_bool("encryption_at_rest") == Some(true) {
            return Ok(vec![]);
        }
        Ok(vec![violation(
            self,
            provider,
            "encryption_at_rest",
            "Data at rest is not encrypted",
            "Enable at-rest encryption with managed keys",
            vec![
                "Enable storage-level encryption".to_string(),
                "Rotate to managed encryption keys".to_string(),
                "Verify existing data is re-encrypted".to_string(),
            ],
        )])
    }
}

// ── ENC_002: TLS in transit ─────────────────────────────────────────────────

pub struct TlsInTransitRule;

#[async_trait]
impl SecurityRule for TlsInTransitRule {
    fn id(&self) -> &str {
        "ENC_002"
    }
    fn severity(&self) -> Severity {
        Severity::High
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::Encryption
    }
    fn compliance_tags(&self) -> &[Framework] {
        &[Framework::Gdpr, Framework::Soc2, Framework::PciDss]
    }
    fn description(&self) -> &str {
        "Connections must use TLS 1.2 or newer"
    }

    async fn evaluate(&self, provider: &Provider) -> Result<Vec<Violation>, RuleError> {
        let steps = vec![
            "Enable TLS termination for all client connections".to_string(),
            "Disable protocol versions below TLS 1.2".to_string(),
        ];
        let out = match provider.config.get_str("tls_version") {
            None => vec![violation(
                self,
                provider,
                "tls_version",
                "TLS is not configured for client connections",
                "Enable TLS 1.2 or newer for all connections",
                steps,
            )],
            Some("1.0") | Some("1.1") => vec![violation(
                self,
                provider,
                "tls_version",
                "Deprecated TLS version in use",
                "Upgrade to TLS 1.2 or newer",
                steps,
            )],
            Some(_) => vec![],
        };
        Ok(out)
    }
}

// ── ACC_001: least privilege ────────────────────────────────────────────────

pub struct LeastPrivilegeRule;

#[async_trait]
impl SecurityRule for LeastPrivilegeRule {
    fn id(&self) -> &str {
        "ACC_001"
    }
    fn severity(&self) -> Severity {
        Severity::High
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::AccessControl
    }
    fn compliance_tags(&self) -> &[Framework] {
        &[Framework::Soc2, Framework::Iso27001, Framework::Gdpr]
    }
    fn description(&self) -> &str {
        "Administrative access must be limited to a small set of accounts"
    }

    async fn evaluate(&self, provider: &Provider) -> Result<Vec<Violation>, RuleError> {
        match provider.config.get_u64("admin_count") {
            Some(n) if n > 5 => Ok(vec![violation(
                self,
                provider,
                "admin_count",
                format!("{} accounts hold administrative privileges", n),
                "Reduce administrative accounts to 5 or fewer",
                vec![
                    "Review the administrative account list".to_string(),
                    "Demote accounts without an operational need".to_string(),
                ],
            )]),
            _ => Ok(vec![]),
        }
    }
}

// ── NET_001: public exposure ────────────────────────────────────────────────

pub struct PublicExposureRule;

#[async_trait]
impl SecurityRule for PublicExposureRule {
    fn id(&self) -> &str {
        "NET_001"
    }
    fn severity(&self) -> Severity {
        Severity::High
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::Network
    }
    fn compliance_tags(&self) -> &[Framework] {
        &[Framework::Iso27001, Framework::PciDss]
    }
    fn description(&self) -> &str {
        "Publicly reachable providers must sit behind a firewall"
    }

    async fn evaluate(&self, provider: &Provider) -> Result<Vec<Violation>, RuleError> {
        let public = provider.config.get_bool("publicly_accessible") == Some(true);
        let firewalled = provider.config.get_bool("firewall_enabled") == Some(true);
        if public && !firewalled {
            return Ok(vec![violation(
                self,
                provider,
                "publicly_accessible",
                "Provider is publicly reachable without a firewall",
                "Restrict network exposure or enable a firewall",
                vec![
                    "Enable the provider firewall".to_string(),
                    "Restrict ingress to known networks".to_string(),
                ],
            )]);
        }
        Ok(vec![])
    }
}

// ── CFG_001: plaintext secrets ──────────────────────────────────────────────

/// Regex heuristic over the serialized provider config. Values referencing a
/// secret store (`env:`, `vault:`, `${...}`) are ignored. This sniffing can
/// both miss secrets stored under unconventional keys and flag harmless
/// strings; providers that can tag sensitive fields explicitly should
/// prefer that over this rule.
pub struct PlaintextSecretRule;

const SECRET_PATTERN: &str =
    r#"(?i)"(password|passwd|secret|api_key|apikey|token|private_key)"\s*:\s*"([^"]{4,})""#;

#[async_trait]
impl SecurityRule for PlaintextSecretRule {
    fn id(&self) -> &str {
        "CFG_001"
    }
    fn severity(&self) -> Severity {
        Severity::High
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::Configuration
    }
    fn compliance_tags(&self) -> &[Framework] {
        &[Framework::Gdpr, Framework::Soc2, Framework::PciDss]
    }
    fn description(&self) -> &str {
        "Provider configuration must not embed plaintext secrets"
    }

    async fn evaluate(&self, provider: &Provider) -> Result<Vec<Violation>, RuleError> {
        let pattern = Regex::new(SECRET_PATTERN).map_err(|e| RuleError::new(self.id(), e))?;
        let serialized = provider.config.to_json_string();
        let mut violations = Vec::new();
        for capture in pattern.captures_iter(&serialized) {
            let key = &capture[1];
            let value = &capture[2];
            if value.starts_with("env:") || value.starts_with("vault:") || value.starts_with("${") {
                continue;
            }
            violations.push(violation(
                self,
                provider,
                key,
                format!("Configuration key '{}' holds a plaintext secret", key),
                "Move secrets into a secret store and reference them indirectly",
                vec![
                    format!("Remove the literal value of '{}' from provider config", key),
                    "Store the secret in a managed secret store".to_string(),
                    "Rotate the exposed credential".to_string(),
                ],
            ));
        }
        Ok(violations)
    }
}

// ── LOG_001: audit logging ──────────────────────────────────────────────────

pub struct AuditLoggingRule;

#[async_trait]
impl SecurityRule for AuditLoggingRule {
    fn id(&self) -> &str {
        "LOG_001"
    }
    fn severity(&self) -> Severity {
        Severity::Medium
    }
    fn category(&self) -> RuleCategory {
        RuleCategory::Logging
    }
    fn compliance_tags(&self) -> &[Framework] {
        &[Framework::Soc2, Framework::Hipaa, Framework::Iso27001]
    }
    fn description(&self) -> &str {
        "Access and change events must be recorded in an audit log"
    }

    async fn evaluate(&self, provider: &Provider) -> Result<Vec<Violation>, RuleError> {
        if provider.config.get_bool("audit_logging") == Some(true) {
            return Ok(vec![]);
        }
        Ok(vec![violation(
            self,
            provider,
            "audit_logging",
            "Audit logging is disabled",
            "Enable audit logging and ship logs to central retention",
            vec![
                "Enable the provider audit log".to_string(),
                "Forward audit events to central log retention".to_string(),
            ],
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vigil_core::provider::ProviderKind;

    fn provider_with(config: serde_json::Value) -> Provider {
        Provider::detached("test-db", ProviderKind::Database, config)
    }

    #[tokio::test]
    async fn test_mfa_rule_fires_when_disabled() {
        let rule = MfaRule;
        let violations =
            rule.evaluate(&provider_with(json!({"mfa_enabled": false}))).await.unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule_id, "AUTH_002");
        assert_eq!(violations[0].severity, Severity::Critical);

        let clean = rule.evaluate(&provider_with(json!({"mfa_enabled": true}))).await.unwrap();
        assert!(clean.is_empty());
    }

    #[tokio::test]
    async fn test_password_policy_weak_and_missing() {
        let rule = PasswordPolicyRule;
        let missing = rule.evaluate(&provider_with(json!({}))).await.unwrap();
        assert_eq!(missing.len(), 1);

        let weak = rule
            .evaluate(&provider_with(json!({"password_policy": {"min_length": 8}})))
            .await
            .unwrap();
        assert_eq!(weak.len(), 1);
        assert!(weak[0].message.contains("below 12"));

        let ok = rule
            .evaluate(&provider_with(json!({"password_policy": {"min_length": 14}})))
            .await
            .unwrap();
        assert!(ok.is_empty());
    }

    #[tokio::test]
    async fn test_tls_rule_rejects_deprecated_versions() {
        let rule = TlsInTransitRule;
        let old = rule.evaluate(&provider_with(json!({"tls_version": "1.0"}))).await.unwrap();
        assert_eq!(old.len(), 1);
        let current =
            rule.evaluate(&provider_with(json!({"tls_version": "1.3"}))).await.unwrap();
        assert!(current.is_empty());
    }

    #[tokio::test]
    async fn test_secret_sniffing_flags_literals_not_references() {
        let rule = PlaintextSecretRule;
        let violations = rule
            .evaluate(&provider_with(json!({
                "password": "hunter2hunter2",
                "api_key": "env:API_KEY",
                "token": "vault:prod/token",
            })))
            .await
            .unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("password"));
    }

    #[tokio::test]
    async fn test_public_exposure_requires_firewall() {
        let rule = PublicExposureRule;
        let exposed = rule
            .evaluate(&provider_with(json!({"publicly_accessible": true})))
            .await
            .unwrap();
        assert_eq!(exposed.len(), 1);

        let guarded = rule
            .evaluate(&provider_with(
                json!({"publicly_accessible": true, "firewall_enabled": true}),
            ))
            .await
            .unwrap();
        assert!(guarded.is_empty());
    }
}
