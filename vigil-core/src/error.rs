use thiserror::Error;

pub type VigilResult<T> = Result<T, VigilError>;

/// Orchestration-level errors. These propagate to the caller; plug-in and
/// provider-level defects are contained (see `RuleError` / `ProbeError`)
/// so one bad rule or provider cannot take down a fleet-wide run.
#[derive(Error, Debug)]
pub enum VigilError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("Unknown alert '{0}'")]
    UnknownAlert(String),

    #[error("Unknown incident '{0}'")]
    UnknownIncident(String),

    #[error("Invalid incident transition: {from} -> {to}")]
    IncidentTransition { from: String, to: String },

    #[error("Assessment cancelled")]
    Cancelled,

    #[error("Report persistence error: {0}")]
    Report(#[from] ReportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A single rule evaluation failure. Contained by the validator: the rule
/// contributes zero violations and an `audit-error` event is emitted.
#[derive(Error, Debug, Clone)]
#[error("rule '{rule_id}' failed: {message}")]
pub struct RuleError {
    pub rule_id: String,
    pub message: String,
}

impl RuleError {
    pub fn new(rule_id: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self { rule_id: rule_id.into(), message: message.to_string() }
    }
}

/// A single vulnerability probe failure. Contained by the scanner.
#[derive(Error, Debug, Clone)]
#[error("probe '{probe_id}' failed: {message}")]
pub struct ProbeError {
    pub probe_id: String,
    pub message: String,
}

impl ProbeError {
    pub fn new(probe_id: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self { probe_id: probe_id.into(), message: message.to_string() }
    }
}

/// Report persistence failures are surfaced to the caller without
/// discarding the already-computed dashboard.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to serialize report: {0}")]
    Serialize(String),

    #[error("failed to write report: {0}")]
    Write(String),
}
