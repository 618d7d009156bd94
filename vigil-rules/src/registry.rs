//! Rule registry with id-keyed upsert and per-run snapshots.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use vigil_core::error::RuleError;
use vigil_core::provider::Provider;
use vigil_core::types::{Framework, RuleCategory, Severity};

use crate::types::Violation;

/// The rule plug-in contract. Implementations may probe the live provider
/// handle and are expected to be side-effect-free with respect to engine
/// state; evaluation failures are contained by the validator.
#[async_trait]
pub trait SecurityRule: Send + Sync {
    /// Stable unique id, e.g. `AUTH_002`.
    fn id(&self) -> &str;
    fn severity(&self) -> Severity;
    fn category(&self) -> RuleCategory;
    /// Frameworks whose compliance flag this rule affects.
    fn compliance_tags(&self) -> &[Framework];
    fn description(&self) -> &str;
    async fn evaluate(&self, provider: &Provider) -> Result<Vec<Violation>, RuleError>;
}

/// Registry of security rules keyed by id. Rules can be hot-swapped at any
/// time; audits operate on a [`RuleRegistry::snapshot`] taken at run start,
/// so a swap mid-run never changes a running audit.
pub struct RuleRegistry {
    rules: RwLock<HashMap<String, Arc<dyn SecurityRule>>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self { rules: RwLock::new(HashMap::new()) }
    }

    /// Registry preloaded with the builtin rule catalog.
    pub fn with_builtin_rules() -> Self {
        let registry = Self::new();
        for rule in crate::builtin::all() {
            registry.add(rule);
        }
        registry
    }

    /// Insert or replace by id. Returns true if an existing rule was
    /// replaced.
    pub fn add(&self, rule: Arc<dyn SecurityRule>) -> bool {
        let id = rule.id().to_string();
        debug!(rule = %id, "Rule registered");
        self.rules.write().insert(id, rule).is_some()
    }

    /// Replace an existing rule. Returns false if no rule with that id is
    /// registered.
    pub fn update(&self, rule: Arc<dyn SecurityRule>) -> bool {
        let mut rules = self.rules.write();
        let id = rule.id().to_string();
        if !rules.contains_key(&id) {
            return false;
        }
        rules.insert(id, rule);
        true
    }

    pub fn remove(&self, rule_id: &str) -> bool {
        self.rules.write().remove(rule_id).is_some()
    }

    pub fn get(&self, rule_id: &str) -> Option<Arc<dyn SecurityRule>> {
        self.rules.read().get(rule_id).cloned()
    }

    pub fn contains(&self, rule_id: &str) -> bool {
        self.rules.read().contains_key(rule_id)
    }

    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// Stable snapshot of the current rule set, ordered by id so repeated
    /// audits of the same registry are deterministic.
    pub fn snapshot(&self) -> Vec<Arc<dyn SecurityRule>> {
        let rules = self.rules.read();
        let mut snapshot: Vec<_> = rules.values().cloned().collect();
        snapshot.sort_by(|a, b| a.id().cmp(b.id()));
        snapshot
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
