//! # Report persistence seam
//!
//! Reports are handed to an external persistence collaborator through the
//! [`ReportSink`] trait. The engine serializes the artifact to JSON and the
//! sink decides where it lands. A file-backed sink and an in-memory sink
//! (tests, dry runs) are provided.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

use crate::error::ReportError;

#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Persist one report document under the given id.
    async fn store(&self, report_id: &str, payload: &Value) -> Result<(), ReportError>;
}

/// Writes each report as pretty-printed JSON under a base directory.
pub struct JsonFileSink {
    base_dir: PathBuf,
    total_stored: AtomicU64,
}

impl JsonFileSink {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into(), total_stored: AtomicU64::new(0) }
    }

    pub fn total_stored(&self) -> u64 {
        self.total_stored.load(Ordering::Relaxed)
    }

    fn report_path(&self, report_id: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", report_id))
    }
}

#[async_trait]
impl ReportSink for JsonFileSink {
    async fn store(&self, report_id: &str, payload: &Value) -> Result<(), ReportError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| ReportError::Write(format!("create {}: {}", self.base_dir.display(), e)))?;
        let raw = serde_json::to_vec_pretty(payload)
            .map_err(|e| ReportError::Serialize(e.to_string()))?;
        let path = self.report_path(report_id);
        std::fs::write(&path, raw)
            .map_err(|e| ReportError::Write(format!("write {}: {}", path.display(), e)))?;
        self.total_stored.fetch_add(1, Ordering::Relaxed);
        info!(report = %report_id, path = %path.display(), "Report persisted");
        Ok(())
    }
}

/// Retains reports in memory. Used by tests and dry runs.
#[derive(Default)]
pub struct MemorySink {
    reports: RwLock<Vec<(String, Value)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<(String, Value)> {
        self.reports.read().clone()
    }

    pub fn len(&self) -> usize {
        self.reports.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.read().is_empty()
    }
}

#[async_trait]
impl ReportSink for MemorySink {
    async fn store(&self, report_id: &str, payload: &Value) -> Result<(), ReportError> {
        self.reports.write().push((report_id.to_string(), payload.clone()));
        Ok(())
    }
}

/// A sink that always fails. Lets tests exercise the persistence-error
/// path without touching the filesystem.
pub struct FailingSink;

#[async_trait]
impl ReportSink for FailingSink {
    async fn store(&self, _report_id: &str, _payload: &Value) -> Result<(), ReportError> {
        Err(ReportError::Write("sink unavailable".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_json_file_sink_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonFileSink::new(dir.path());
        sink.store("report-0001", &json!({"posture": "good"})).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("report-0001.json")).unwrap();
        let parsed: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["posture"], "good");
        assert_eq!(sink.total_stored(), 1);
    }

    #[tokio::test]
    async fn test_memory_sink_retains_reports() {
        let sink = MemorySink::new();
        sink.store("report-0001", &json!({"n": 1})).await.unwrap();
        sink.store("report-0002", &json!({"n": 2})).await.unwrap();
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.reports()[1].0, "report-0002");
    }

    #[tokio::test]
    async fn test_failing_sink_surfaces_error() {
        let sink = FailingSink;
        let err = sink.store("report-0001", &json!({})).await.unwrap_err();
        assert!(matches!(err, ReportError::Write(_)));
    }
}
