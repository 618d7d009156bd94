//! Framework requirement catalogs.
//!
//! Each framework maps to the mandatory requirements the engine can assess
//! from audit output, with the rule ids that implement each requirement.

use vigil_core::types::{Framework, Severity};

use crate::types::Requirement;

const GDPR: &[Requirement] = &[
    Requirement {
        id: "GDPR-32.1a",
        description: "Personal data encrypted at rest",
        severity: Severity::Critical,
        rule_ids: &["ENC_001"],
    },
    Requirement {
        id: "GDPR-32.1b",
        description: "Personal data encrypted in transit",
        severity: Severity::High,
        rule_ids: &["ENC_002"],
    },
    Requirement {
        id: "GDPR-32.2",
        description: "Access to personal data restricted to authorized staff",
        severity: Severity::High,
        rule_ids: &["ACC_001", "AUTH_001"],
    },
    Requirement {
        id: "GDPR-30",
        description: "Processing activity records maintained",
        severity: Severity::Medium,
        rule_ids: &["LOG_001"],
    },
    Requirement {
        id: "GDPR-25",
        description: "Data protection by design in configuration",
        severity: Severity::High,
        rule_ids: &["CFG_001"],
    },
];

const SOC2: &[Requirement] = &[
    Requirement {
        id: "CC6.1",
        description: "Logical access controls restrict access to systems",
        severity: Severity::High,
        rule_ids: &["AUTH_001", "ACC_001"],
    },
    Requirement {
        id: "CC6.6",
        description: "Multi-factor authentication for privileged access",
        severity: Severity::Critical,
        rule_ids: &["AUTH_002"],
    },
    Requirement {
        id: "CC6.7",
        description: "Data transmission protected by encryption",
        severity: Severity::High,
        rule_ids: &["ENC_002"],
    },
    Requirement {
        id: "CC6.8",
        description: "Sessions terminated after inactivity",
        severity: Severity::Medium,
        rule_ids: &["AUTH_003"],
    },
    Requirement {
        id: "CC7.2",
        description: "System activity monitored and logged",
        severity: Severity::High,
        rule_ids: &["LOG_001"],
    },
];

const HIPAA: &[Requirement] = &[
    Requirement {
        id: "164.312(a)(1)",
        description: "Access controls on systems holding ePHI",
        severity: Severity::Critical,
        rule_ids: &["AUTH_001", "AUTH_002", "ACC_001"],
    },
    Requirement {
        id: "164.312(a)(2)(iii)",
        description: "Automatic logoff after inactivity",
        severity: Severity::Medium,
        rule_ids: &["AUTH_003"],
    },
    Requirement {
        id: "164.312(a)(2)(iv)",
        description: "ePHI encrypted at rest",
        severity: Severity::Critical,
        rule_ids: &["ENC_001"],
    },
    Requirement {
        id: "164.312(b)",
        description: "Audit controls record system activity",
        severity: Severity::High,
        rule_ids: &["LOG_001"],
    },
    Requirement {
        id: "164.312(e)(1)",
        description: "ePHI protected during transmission",
        severity: Severity::Critical,
        rule_ids: &["ENC_002"],
    },
];

const PCI_DSS: &[Requirement] = &[
    Requirement {
        id: "PCI-1.2",
        description: "Network security controls limit inbound traffic",
        severity: Severity::High,
        rule_ids: &["NET_001"],
    },
    Requirement {
        id: "PCI-3.4",
        description: "Stored account data rendered unreadable",
        severity: Severity::Critical,
        rule_ids: &["ENC_001"],
    },
    Requirement {
        id: "PCI-4.1",
        description: "Strong cryptography during transmission",
        severity: Severity::Critical,
        rule_ids: &["ENC_002"],
    },
    Requirement {
        id: "PCI-8.2",
        description: "Strong authentication credentials enforced",
        severity: Severity::High,
        rule_ids: &["AUTH_001", "CFG_001"],
    },
    Requirement {
        id: "PCI-8.3",
        description: "Multi-factor authentication implemented",
        severity: Severity::Critical,
        rule_ids: &["AUTH_002"],
    },
    Requirement {
        id: "PCI-10.1",
        description: "Audit trails link access to individual users",
        severity: Severity::High,
        rule_ids: &["LOG_001"],
    },
];

const ISO_27001: &[Requirement] = &[
    Requirement {
        id: "A.9.2",
        description: "User access management with secure authentication",
        severity: Severity::High,
        rule_ids: &["AUTH_001"],
    },
    Requirement {
        id: "A.9.4",
        description: "Privileged access rights restricted and reviewed",
        severity: Severity::High,
        rule_ids: &["ACC_001", "AUTH_003"],
    },
    Requirement {
        id: "A.10.1",
        description: "Cryptographic controls for data protection",
        severity: Severity::Critical,
        rule_ids: &["ENC_001", "ENC_002"],
    },
    Requirement {
        id: "A.12.4",
        description: "Event logging and log protection",
        severity: Severity::Medium,
        rule_ids: &["LOG_001"],
    },
    Requirement {
        id: "A.13.1",
        description: "Network security management",
        severity: Severity::High,
        rule_ids: &["NET_001"],
    },
];

/// The mandatory requirement set for a framework.
pub fn requirements(framework: Framework) -> &'static [Requirement] {
    match framework {
        Framework::Gdpr => GDPR,
        Framework::Soc2 => SOC2,
        Framework::Hipaa => HIPAA,
        Framework::PciDss => PCI_DSS,
        Framework::Iso27001 => ISO_27001,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_framework_has_requirements() {
        for fw in [
            Framework::Gdpr,
            Framework::Soc2,
            Framework::Hipaa,
            Framework::PciDss,
            Framework::Iso27001,
        ] {
            let reqs = requirements(fw);
            assert!(!reqs.is_empty());
            for req in reqs {
                assert!(!req.rule_ids.is_empty(), "{} has no rule mapping", req.id);
            }
        }
    }

    #[test]
    fn test_requirement_ids_unique_within_framework() {
        for fw in [Framework::Gdpr, Framework::Soc2, Framework::Hipaa] {
            let reqs = requirements(fw);
            let mut ids: Vec<_> = reqs.iter().map(|r| r.id).collect();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), reqs.len());
        }
    }
}
