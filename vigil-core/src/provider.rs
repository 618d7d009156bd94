//! Provider model: the external infrastructure components under assessment.
//!
//! The engine never interprets a provider's `instance` handle; it is only
//! passed through to rule and probe callbacks, which may use it for live
//! probing. Assessment logic shipped with this workspace reads the
//! structured `config` instead.

use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Category of infrastructure provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Database,
    AuthService,
    Storage,
    MessagingGateway,
    Compute,
    Other,
}

/// Opaque handle to a live provider. Rule and probe implementations may
/// downcast via `as_any` to a concrete type they know; the engine itself
/// never does.
pub trait ProviderInstance: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// A handle for providers assessed from declarative config alone.
#[derive(Debug, Default)]
pub struct DetachedInstance;

impl ProviderInstance for DetachedInstance {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Structured provider configuration. A thin wrapper over a JSON value with
/// the typed accessors rule implementations need.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ProviderConfig(pub Value);

impl ProviderConfig {
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Value::as_u64)
    }

    /// Serialized form, used by heuristic rules that sniff the whole config.
    pub fn to_json_string(&self) -> String {
        self.0.to_string()
    }
}

/// One provider in the assessed fleet.
#[derive(Clone)]
pub struct Provider {
    /// Unique within a batch.
    pub id: String,
    pub kind: ProviderKind,
    pub instance: Arc<dyn ProviderInstance>,
    pub config: ProviderConfig,
}

impl Provider {
    pub fn new(
        id: impl Into<String>,
        kind: ProviderKind,
        instance: Arc<dyn ProviderInstance>,
        config: ProviderConfig,
    ) -> Self {
        Self { id: id.into(), kind, instance, config }
    }

    /// A provider with no live handle; rules evaluate its config only.
    pub fn detached(id: impl Into<String>, kind: ProviderKind, config: Value) -> Self {
        Self::new(id, kind, Arc::new(DetachedInstance), ProviderConfig::from_value(config))
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
