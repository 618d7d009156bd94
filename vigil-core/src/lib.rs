//! # Vigil Core — shared infrastructure for the assessment engine
//!
//! Everything the domain crates have in common lives here: the typed event
//! bus, the error taxonomy, the orchestration configuration and its TOML
//! loader, the provider model (with its opaque instance handle), and the
//! report persistence seam.

pub mod config;
pub mod error;
pub mod events;
pub mod provider;
pub mod report;
pub mod types;

pub use config::{Cadence, ConfigUpdate, OrchestrationConfig};
pub use error::{ProbeError, ReportError, RuleError, VigilError, VigilResult};
pub use events::{EngineEvent, EventBus, EventTopic};
pub use provider::{Provider, ProviderConfig, ProviderInstance, ProviderKind};
pub use types::{Framework, RuleCategory, Severity};
