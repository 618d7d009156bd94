//! # Assessment Scheduler — independent cadences with an explicit lifecycle
//!
//! Three independent interval loops (security, compliance, vulnerability)
//! publish `scheduled-*` events at their configured cadence. The scheduler
//! does not own provider discovery: callers subscribe to the tick events
//! and translate them into `assess_provider_security` calls with a provider
//! list. Unlike ad hoc interval timers, the scheduler has an explicit
//! `start`/`shutdown` lifecycle and aborts its loops on drop.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

use vigil_core::config::OrchestrationConfig;
use vigil_core::events::{EngineEvent, EventBus};

pub struct AssessmentScheduler {
    bus: Arc<EventBus>,
    security_interval: Duration,
    compliance_interval: Duration,
    vulnerability_interval: Duration,
    handles: Mutex<Vec<JoinHandle<()>>>,
    running: AtomicBool,
    security_ticks: Arc<AtomicU64>,
    compliance_ticks: Arc<AtomicU64>,
    vulnerability_ticks: Arc<AtomicU64>,
}

impl AssessmentScheduler {
    /// Scheduler with cadences taken from the orchestration config.
    pub fn from_config(bus: Arc<EventBus>, config: &OrchestrationConfig) -> Self {
        Self::with_intervals(
            bus,
            config.schedule.security.interval(),
            config.schedule.compliance.interval(),
            config.schedule.vulnerability.interval(),
        )
    }

    /// Scheduler with explicit intervals. Primarily for tests.
    pub fn with_intervals(
        bus: Arc<EventBus>,
        security: Duration,
        compliance: Duration,
        vulnerability: Duration,
    ) -> Self {
        Self {
            bus,
            security_interval: security,
            compliance_interval: compliance,
            vulnerability_interval: vulnerability,
            handles: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
            security_ticks: Arc::new(AtomicU64::new(0)),
            compliance_ticks: Arc::new(AtomicU64::new(0)),
            vulnerability_ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start the three loops. Idempotent; must run inside a tokio runtime.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut handles = self.handles.lock();
        handles.push(spawn_loop(
            self.bus.clone(),
            self.security_interval,
            self.security_ticks.clone(),
            || EngineEvent::ScheduledSecurityAssessment,
        ));
        handles.push(spawn_loop(
            self.bus.clone(),
            self.compliance_interval,
            self.compliance_ticks.clone(),
            || EngineEvent::ScheduledComplianceAssessment,
        ));
        handles.push(spawn_loop(
            self.bus.clone(),
            self.vulnerability_interval,
            self.vulnerability_ticks.clone(),
            || EngineEvent::ScheduledVulnerabilityScan,
        ));
        info!(
            security = ?self.security_interval,
            compliance = ?self.compliance_interval,
            vulnerability = ?self.vulnerability_interval,
            "Assessment scheduler started"
        );
    }

    /// Stop all loops. Idempotent.
    pub fn shutdown(&self) {
        let mut handles = self.handles.lock();
        for handle in handles.drain(..) {
            handle.abort();
        }
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Assessment scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn security_ticks(&self) -> u64 {
        self.security_ticks.load(Ordering::Relaxed)
    }

    pub fn compliance_ticks(&self) -> u64 {
        self.compliance_ticks.load(Ordering::Relaxed)
    }

    pub fn vulnerability_ticks(&self) -> u64 {
        self.vulnerability_ticks.load(Ordering::Relaxed)
    }
}

impl Drop for AssessmentScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_loop(
    bus: Arc<EventBus>,
    period: Duration,
    ticks: Arc<AtomicU64>,
    event: impl Fn() -> EngineEvent + Send + 'static,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first interval tick completes immediately; the schedule
        // starts one full period out.
        interval.tick().await;
        loop {
            interval.tick().await;
            ticks.fetch_add(1, Ordering::Relaxed);
            bus.publish(event());
        }
    })
}
