//! Vigil — security assessment orchestration suite.
//!
//! Loads the orchestration config and a provider inventory, then either
//! runs a single assessment (`--once`) or starts the scheduler and
//! translates its ticks into assessment runs until interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use vigil_core::config::OrchestrationConfig;
use vigil_core::events::{EventBus, EventTopic};
use vigil_core::provider::{Provider, ProviderKind};
use vigil_core::report::JsonFileSink;
use vigil_orchestrator::types::AssessmentOptions;
use vigil_orchestrator::{AssessmentScheduler, Orchestrator};
use vigil_vuln::types::ScanDepth;

#[derive(Parser, Debug)]
#[command(name = "vigil", version, about = "Vigil — security assessment orchestration")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "vigil.toml")]
    config: String,

    /// Provider inventory (JSON array of {id, kind, config})
    #[arg(short, long, default_value = "providers.json")]
    providers: String,

    /// Log level (overrides default "info")
    #[arg(short, long)]
    log_level: Option<String>,

    /// Directory comprehensive reports are written to
    #[arg(long, default_value = "./reports")]
    report_dir: String,

    /// Run one assessment, print the dashboard as JSON, and exit
    #[arg(long)]
    once: bool,

    /// Persist a comprehensive report for each run
    #[arg(long)]
    generate_reports: bool,

    /// Execute eligible remediation tasks after each run
    #[arg(long)]
    auto_remediate: bool,

    /// Generate a default config file and exit
    #[arg(long)]
    generate_config: bool,
}

/// One entry in the provider inventory file.
#[derive(Debug, serde::Deserialize)]
struct InventoryEntry {
    id: String,
    #[serde(default = "default_kind")]
    kind: ProviderKind,
    #[serde(default)]
    config: serde_json::Value,
}

fn default_kind() -> ProviderKind {
    ProviderKind::Other
}

fn load_inventory(path: &str) -> Result<Vec<Provider>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read provider inventory {}", path))?;
    let entries: Vec<InventoryEntry> = serde_json::from_str(&raw)
        .with_context(|| format!("cannot parse provider inventory {}", path))?;
    Ok(entries
        .into_iter()
        .map(|e| Provider::detached(e.id, e.kind, e.config))
        .collect())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.generate_config {
        let config = OrchestrationConfig::default();
        config.save(&cli.config)?;
        println!("Default configuration written to {}", cli.config);
        return Ok(());
    }

    let config = OrchestrationConfig::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: {}, using defaults", e);
        OrchestrationConfig::default()
    });

    let level = match cli.log_level.as_deref().unwrap_or("info") {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Vigil v{}", env!("CARGO_PKG_VERSION"));

    let providers = load_inventory(&cli.providers)?;
    info!(providers = providers.len(), "Provider inventory loaded");

    let bus = Arc::new(EventBus::new());
    let orchestrator = Arc::new(
        Orchestrator::new(bus.clone(), config.clone())
            .with_report_sink(Arc::new(JsonFileSink::new(&cli.report_dir))),
    );

    let options = AssessmentOptions {
        generate_reports: cli.generate_reports,
        auto_remediate: cli.auto_remediate,
        ..Default::default()
    };

    if cli.once {
        let outcome = orchestrator.assess_provider_security(&providers, &options).await?;
        if let Some(e) = outcome.report_error {
            warn!(error = %e, "Report was not persisted");
        }
        println!("{}", serde_json::to_string_pretty(&outcome.dashboard)?);
        return Ok(());
    }

    // The scheduler owns no provider discovery: its ticks are translated
    // here into assessment runs over the loaded inventory.
    #[derive(Clone, Copy)]
    enum Tick {
        Security,
        Compliance,
        Vulnerability,
    }

    let (tick_tx, mut tick_rx) = tokio::sync::mpsc::unbounded_channel::<Tick>();
    for (topic, tick) in [
        (EventTopic::ScheduledSecurityAssessment, Tick::Security),
        (EventTopic::ScheduledComplianceAssessment, Tick::Compliance),
        (EventTopic::ScheduledVulnerabilityScan, Tick::Vulnerability),
    ] {
        let tx = tick_tx.clone();
        bus.subscribe(
            "tick-translator",
            Some(vec![topic]),
            Arc::new(move |_event| {
                let _ = tx.send(tick);
            }),
        );
    }

    let scheduler = AssessmentScheduler::from_config(bus.clone(), &config);
    scheduler.start();
    info!("Scheduler started; press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(tick) = tick_rx.recv() => {
                let run_options = AssessmentOptions {
                    // Scheduled vulnerability runs scan at full depth.
                    depth: match tick {
                        Tick::Vulnerability => Some(ScanDepth::Comprehensive),
                        Tick::Security | Tick::Compliance => None,
                    },
                    cancel: None,
                    ..options.clone()
                };
                if let Err(e) = orchestrator.assess_provider_security(&providers, &run_options).await {
                    warn!(error = %e, "Scheduled assessment failed");
                }
            }
        }
    }

    scheduler.shutdown();
    info!("Vigil stopped");
    Ok(())
}
