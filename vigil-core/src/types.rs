//! Shared domain primitives used across the assessment crates.

use std::fmt;
use std::str::FromStr;

use crate::error::VigilError;

/// Severity levels shared by rules, violations, findings, alerts and tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Compliance frameworks the engine knows how to assess against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Framework {
    Gdpr,
    Soc2,
    Hipaa,
    PciDss,
    Iso27001,
}

impl Framework {
    /// Canonical external identifier (the form used in config files and
    /// caller-supplied framework lists).
    pub fn id(&self) -> &'static str {
        match self {
            Framework::Gdpr => "GDPR",
            Framework::Soc2 => "SOC2",
            Framework::Hipaa => "HIPAA",
            Framework::PciDss => "PCI-DSS",
            Framework::Iso27001 => "ISO27001",
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Framework {
    type Err = VigilError;

    /// Unknown framework ids fail fast as configuration errors.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GDPR" => Ok(Framework::Gdpr),
            "SOC2" | "SOC-2" => Ok(Framework::Soc2),
            "HIPAA" => Ok(Framework::Hipaa),
            "PCI-DSS" | "PCI_DSS" | "PCIDSS" => Ok(Framework::PciDss),
            "ISO27001" | "ISO-27001" => Ok(Framework::Iso27001),
            other => Err(VigilError::Config(format!("unknown compliance framework '{}'", other))),
        }
    }
}

/// The concern a security rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Authentication,
    Encryption,
    AccessControl,
    Network,
    Configuration,
    Logging,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_framework_parse_roundtrip() {
        for fw in [
            Framework::Gdpr,
            Framework::Soc2,
            Framework::Hipaa,
            Framework::PciDss,
            Framework::Iso27001,
        ] {
            assert_eq!(fw.id().parse::<Framework>().ok(), Some(fw));
        }
    }

    #[test]
    fn test_unknown_framework_is_config_error() {
        let err = "FEDRAMP".parse::<Framework>().unwrap_err();
        assert!(matches!(err, VigilError::Config(_)));
    }
}
