//! # Vigil Vuln — depth-scaled vulnerability scanning
//!
//! Probes implement [`VulnProbe`] with a minimum scan depth; the scanner
//! runs every probe at or below the requested depth, so a deeper scan's
//! findings are always a superset of a shallower one's for unchanged
//! provider state. The aggregate risk score derives from the severity
//! histogram of the findings.

pub mod probes;
pub mod scanner;
pub mod types;

pub use probes::VulnProbe;
pub use scanner::VulnerabilityScanner;
pub use types::{Finding, ScanDepth, ScanResult, ScanSummary};
