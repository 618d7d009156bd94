//! # Event Bus — typed engine event stream
//!
//! Carries every event the engine emits as a typed payload with explicit
//! topic-filtered subscription, instead of stringly-keyed emitter state.
//! Subscribers register a callback against an optional topic set; published
//! events are delivered synchronously in registration order and retained in
//! a capped log for querying.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::types::Severity;

/// Maximum events retained in the bus log before the oldest are pruned.
const MAX_EVENT_LOG: usize = 100_000;
/// Maximum registered subscribers.
const MAX_SUBSCRIBERS: usize = 256;

// ── Event payloads ───────────────────────────────────────────────────────────

/// Where a critical finding originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingSource {
    Security,
    Compliance,
    Vulnerability,
}

/// Every event the engine emits, with its payload.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum EngineEvent {
    AssessmentStarted { run_id: u64, providers: usize },
    AssessmentError { run_id: u64, provider_id: Option<String>, message: String },
    AssessmentCompleted { run_id: u64, overall_score: f64, posture: String, providers: usize },
    AuditCompleted { provider_id: String, score: f64, risk_level: String, violations: usize },
    AuditError { provider_id: String, rule_id: String, message: String },
    ScanError { provider_id: String, probe_id: String, message: String },
    CriticalFinding { provider_id: String, source: FindingSource, detail: String },
    IncidentCreated { incident_id: String, provider_id: String, category: String, severity: Severity },
    AlertAcknowledged { alert_id: String, by: String },
    AlertResolved { alert_id: String, by: String },
    EmergencyShutdownTriggered { provider_id: String, reason: String },
    CriticalAlertSent { alert_id: String, provider_id: String, severity: Severity, message: String },
    AutoRemediationCompleted { task_id: String, provider_id: String },
    AutoRemediationFailed { task_id: String, provider_id: String, message: String },
    ComprehensiveReportGenerated { report_id: String },
    ConfigurationUpdated,
    RuleAdded { rule_id: String },
    RuleUpdated { rule_id: String },
    RuleRemoved { rule_id: String },
    ScheduledSecurityAssessment,
    ScheduledComplianceAssessment,
    ScheduledVulnerabilityScan,
}

/// Topic identifiers for subscription filtering, one per event variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventTopic {
    AssessmentStarted,
    AssessmentError,
    AssessmentCompleted,
    AuditCompleted,
    AuditError,
    ScanError,
    CriticalFinding,
    IncidentCreated,
    AlertAcknowledged,
    AlertResolved,
    EmergencyShutdownTriggered,
    CriticalAlertSent,
    AutoRemediationCompleted,
    AutoRemediationFailed,
    ComprehensiveReportGenerated,
    ConfigurationUpdated,
    RuleAdded,
    RuleUpdated,
    RuleRemoved,
    ScheduledSecurityAssessment,
    ScheduledComplianceAssessment,
    ScheduledVulnerabilityScan,
}

impl EngineEvent {
    pub fn topic(&self) -> EventTopic {
        match self {
            EngineEvent::AssessmentStarted { .. } => EventTopic::AssessmentStarted,
            EngineEvent::AssessmentError { .. } => EventTopic::AssessmentError,
            EngineEvent::AssessmentCompleted { .. } => EventTopic::AssessmentCompleted,
            EngineEvent::AuditCompleted { .. } => EventTopic::AuditCompleted,
            EngineEvent::AuditError { .. } => EventTopic::AuditError,
            EngineEvent::ScanError { .. } => EventTopic::ScanError,
            EngineEvent::CriticalFinding { .. } => EventTopic::CriticalFinding,
            EngineEvent::IncidentCreated { .. } => EventTopic::IncidentCreated,
            EngineEvent::AlertAcknowledged { .. } => EventTopic::AlertAcknowledged,
            EngineEvent::AlertResolved { .. } => EventTopic::AlertResolved,
            EngineEvent::EmergencyShutdownTriggered { .. } => EventTopic::EmergencyShutdownTriggered,
            EngineEvent::CriticalAlertSent { .. } => EventTopic::CriticalAlertSent,
            EngineEvent::AutoRemediationCompleted { .. } => EventTopic::AutoRemediationCompleted,
            EngineEvent::AutoRemediationFailed { .. } => EventTopic::AutoRemediationFailed,
            EngineEvent::ComprehensiveReportGenerated { .. } => EventTopic::ComprehensiveReportGenerated,
            EngineEvent::ConfigurationUpdated => EventTopic::ConfigurationUpdated,
            EngineEvent::RuleAdded { .. } => EventTopic::RuleAdded,
            EngineEvent::RuleUpdated { .. } => EventTopic::RuleUpdated,
            EngineEvent::RuleRemoved { .. } => EventTopic::RuleRemoved,
            EngineEvent::ScheduledSecurityAssessment => EventTopic::ScheduledSecurityAssessment,
            EngineEvent::ScheduledComplianceAssessment => EventTopic::ScheduledComplianceAssessment,
            EngineEvent::ScheduledVulnerabilityScan => EventTopic::ScheduledVulnerabilityScan,
        }
    }
}

/// An event as retained in the bus log.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PublishedEvent {
    pub id: u64,
    pub timestamp_ms: i64,
    pub event: EngineEvent,
}

// ── Subscriptions ────────────────────────────────────────────────────────────

pub type SubscriberFn = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

struct Subscription {
    id: u64,
    name: String,
    /// `None` subscribes to every topic.
    topics: Option<Vec<EventTopic>>,
    callback: SubscriberFn,
}

// ── Event Bus ────────────────────────────────────────────────────────────────

pub struct EventBus {
    subscriptions: RwLock<Vec<Subscription>>,
    event_log: RwLock<Vec<PublishedEvent>>,
    next_event_id: AtomicU64,
    next_sub_id: AtomicU64,
    total_published: AtomicU64,
    total_delivered: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            event_log: RwLock::new(Vec::with_capacity(1024)),
            next_event_id: AtomicU64::new(1),
            next_sub_id: AtomicU64::new(1),
            total_published: AtomicU64::new(0),
            total_delivered: AtomicU64::new(0),
        }
    }

    /// Publish an event. Delivers to matching subscribers, appends to the
    /// capped log, and returns the assigned event id.
    pub fn publish(&self, event: EngineEvent) -> u64 {
        let id = self.next_event_id.fetch_add(1, Ordering::Relaxed);
        self.total_published.fetch_add(1, Ordering::Relaxed);

        debug!(id = id, topic = ?event.topic(), "Event published");

        {
            let subs = self.subscriptions.read();
            for sub in subs.iter() {
                let matches = match &sub.topics {
                    None => true,
                    Some(topics) => topics.contains(&event.topic()),
                };
                if matches {
                    (sub.callback)(&event);
                    self.total_delivered.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        let mut log = self.event_log.write();
        if log.len() >= MAX_EVENT_LOG {
            let drain = MAX_EVENT_LOG / 10;
            log.drain(..drain);
        }
        log.push(PublishedEvent {
            id,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            event,
        });

        id
    }

    /// Subscribe to a set of topics (or all, with `None`). Returns a
    /// subscription id usable with [`EventBus::unsubscribe`].
    pub fn subscribe(
        &self,
        name: &str,
        topics: Option<Vec<EventTopic>>,
        callback: SubscriberFn,
    ) -> u64 {
        let id = self.next_sub_id.fetch_add(1, Ordering::Relaxed);
        let mut subs = self.subscriptions.write();
        if subs.len() >= MAX_SUBSCRIBERS {
            warn!(name = %name, "Max subscribers reached, dropping oldest");
            subs.remove(0);
        }
        subs.push(Subscription { id, name: name.into(), topics, callback });
        id
    }

    pub fn unsubscribe(&self, sub_id: u64) -> bool {
        let mut subs = self.subscriptions.write();
        let before = subs.len();
        subs.retain(|s| s.id != sub_id);
        subs.len() < before
    }

    /// Most recent events (newest first), optionally filtered by topic.
    pub fn recent_events(&self, limit: usize, topic: Option<EventTopic>) -> Vec<PublishedEvent> {
        let log = self.event_log.read();
        log.iter()
            .rev()
            .filter(|e| topic.map_or(true, |t| e.event.topic() == t))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn total_published(&self) -> u64 {
        self.total_published.load(Ordering::Relaxed)
    }

    pub fn total_delivered(&self) -> u64 {
        self.total_delivered.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
