//! Remediation execution seam.
//!
//! Actually applying a fix is provider-specific and delegated through
//! [`RemediationExecutor`]. The engine decides eligibility, drives the
//! executor, and records the outcome.

use async_trait::async_trait;
use tracing::info;

use crate::types::SecurityTask;

#[async_trait]
pub trait RemediationExecutor: Send + Sync {
    /// Execute one remediation task. Errors mark the task failed.
    async fn execute(&self, task: &SecurityTask) -> Result<(), String>;
}

/// Records the execution and reports success. Deployments wire a real
/// executor per provider type.
pub struct NoopExecutor;

#[async_trait]
impl RemediationExecutor for NoopExecutor {
    async fn execute(&self, task: &SecurityTask) -> Result<(), String> {
        info!(task = %task.id, provider = %task.provider_id, "Remediation executed (noop)");
        Ok(())
    }
}
