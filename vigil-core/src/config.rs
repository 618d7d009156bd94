//! # Orchestration config — loads and validates TOML configuration
//!
//! Deserializes `vigil.toml` (or a custom path) into typed config structs:
//! scheduler cadences, alerting thresholds, automation flags, notification
//! settings, and the default framework set.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{VigilError, VigilResult};
use crate::types::Framework;

/// How often a scheduled assessment kind fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annually,
}

impl Cadence {
    pub fn interval(&self) -> Duration {
        match self {
            Cadence::Daily => Duration::from_secs(86_400),
            Cadence::Weekly => Duration::from_secs(7 * 86_400),
            Cadence::Monthly => Duration::from_secs(30 * 86_400),
            Cadence::Quarterly => Duration::from_secs(91 * 86_400),
            Cadence::Annually => Duration::from_secs(365 * 86_400),
        }
    }
}

/// Top-level orchestration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub automation: AutomationConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    /// Frameworks assessed when a caller does not request a specific set.
    #[serde(default = "default_frameworks")]
    pub default_frameworks: Vec<Framework>,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            schedule: ScheduleConfig::default(),
            thresholds: ThresholdConfig::default(),
            automation: AutomationConfig::default(),
            notifications: NotificationConfig::default(),
            default_frameworks: default_frameworks(),
        }
    }
}

fn default_frameworks() -> Vec<Framework> {
    vec![Framework::Gdpr, Framework::Soc2]
}

/// Independent cadences for the three scheduled assessment kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub security: Cadence,
    pub compliance: Cadence,
    pub vulnerability: Cadence,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            security: Cadence::Daily,
            compliance: Cadence::Weekly,
            vulnerability: Cadence::Daily,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Security score below this marks a provider critical.
    pub critical_security_score: f64,
    /// Vulnerability risk score above this marks a provider warning.
    pub vulnerability_risk_warning: f64,
    /// Critical findings above this count trigger emergency-shutdown
    /// evaluation.
    pub emergency_critical_findings: usize,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            critical_security_score: 60.0,
            vulnerability_risk_warning: 50.0,
            emergency_critical_findings: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// Allow eligible remediation tasks to execute automatically.
    pub auto_remediation: bool,
    /// Allow emergency-shutdown triggering on critical findings.
    pub emergency_shutdown: bool,
    /// Emit critical-alert notification payloads for external delivery.
    pub auto_notification: bool,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            auto_remediation: false,
            emergency_shutdown: false,
            auto_notification: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub enabled: bool,
    /// Optional JSONL alert log path.
    pub alert_log: Option<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { enabled: true, alert_log: None }
    }
}

impl OrchestrationConfig {
    pub fn load(path: impl AsRef<Path>) -> VigilResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| VigilError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| VigilError::Config(format!("cannot parse {}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Orchestration config loaded");
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> VigilResult<()> {
        let path = path.as_ref();
        let raw = toml::to_string_pretty(self)
            .map_err(|e| VigilError::Config(format!("cannot serialize config: {}", e)))?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}

/// Partial configuration update. Only the populated sections are replaced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub schedule: Option<ScheduleConfig>,
    pub thresholds: Option<ThresholdConfig>,
    pub automation: Option<AutomationConfig>,
    pub notifications: Option<NotificationConfig>,
    pub default_frameworks: Option<Vec<Framework>>,
}

impl ConfigUpdate {
    pub fn apply(self, config: &mut OrchestrationConfig) {
        if let Some(schedule) = self.schedule {
            config.schedule = schedule;
        }
        if let Some(thresholds) = self.thresholds {
            config.thresholds = thresholds;
        }
        if let Some(automation) = self.automation {
            config.automation = automation;
        }
        if let Some(notifications) = self.notifications {
            config.notifications = notifications;
        }
        if let Some(frameworks) = self.default_frameworks {
            config.default_frameworks = frameworks;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestrationConfig::default();
        assert_eq!(config.schedule.security, Cadence::Daily);
        assert_eq!(config.schedule.compliance, Cadence::Weekly);
        assert_eq!(config.thresholds.critical_security_score, 60.0);
        assert!(!config.automation.auto_remediation);
        assert_eq!(config.default_frameworks, vec![Framework::Gdpr, Framework::Soc2]);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = OrchestrationConfig::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vigil.toml");
        config.save(&path).unwrap();
        let loaded = OrchestrationConfig::load(&path).unwrap();
        assert_eq!(loaded.schedule.vulnerability, config.schedule.vulnerability);
        assert_eq!(loaded.default_frameworks, config.default_frameworks);
    }

    #[test]
    fn test_partial_section_parse() {
        let config: OrchestrationConfig = toml::from_str(
            r#"
            [automation]
            auto_remediation = true
            emergency_shutdown = true
            auto_notification = false
            "#,
        )
        .unwrap();
        assert!(config.automation.auto_remediation);
        // Unspecified sections fall back to defaults.
        assert_eq!(config.schedule.security, Cadence::Daily);
    }

    #[test]
    fn test_config_update_merges_only_populated_sections() {
        let mut config = OrchestrationConfig::default();
        let update = ConfigUpdate {
            automation: Some(AutomationConfig {
                auto_remediation: true,
                emergency_shutdown: false,
                auto_notification: true,
            }),
            ..Default::default()
        };
        update.apply(&mut config);
        assert!(config.automation.auto_remediation);
        assert_eq!(config.thresholds.vulnerability_risk_warning, 50.0);
    }

    #[test]
    fn test_cadence_intervals_are_increasing() {
        assert!(Cadence::Daily.interval() < Cadence::Weekly.interval());
        assert!(Cadence::Weekly.interval() < Cadence::Monthly.interval());
        assert!(Cadence::Quarterly.interval() < Cadence::Annually.interval());
    }
}
