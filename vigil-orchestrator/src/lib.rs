//! # Vigil Orchestrator — fleet-wide assessment coordination
//!
//! The central coordinator: fans assessment out across providers, computes
//! aggregated dashboards, manages alert/incident/task lifecycles, evaluates
//! emergency-shutdown criteria, drives auto-remediation, runs the
//! scheduler, and emits the engine's event stream.

pub mod orchestrator;
pub mod remediation;
pub mod scheduler;
pub mod types;

pub use orchestrator::Orchestrator;
pub use remediation::{NoopExecutor, RemediationExecutor};
pub use scheduler::AssessmentScheduler;
pub use types::{
    AssessmentOptions, AssessmentOutcome, ComprehensiveReport, ExecutiveSummary,
    IncidentCategory, IncidentStatus, Posture, ProviderHealth, ProviderSecurityStatus,
    ProviderTrends, SecurityAlert, SecurityDashboard, SecurityIncident, SecurityTask,
    TaskStatus, TaskType, TrendDirection, VulnTrend,
};
