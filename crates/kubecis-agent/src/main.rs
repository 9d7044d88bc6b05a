//! kubecis - Kubernetes node benchmark auditor
//!
//! Runs as a one-shot job on a node:
//! - `scan` audits the node against a benchmark and writes the results artifact
//! - `raw` / `summary` read that artifact back for dashboards
//! - `runtime-alerts` / `runtime-stats` summarize the runtime security event log

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use kubecis_common::logging::{init_logging_with_config, LogConfig, LogFormat};
use kubecis_common::Config;
use kubecis_config_audit::{AuditSummary, BenchmarkAuditor};
use kubecis_core::Error;
use kubecis_runtime::{load_events, recent_alerts, summarize, EventFilter};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, info, warn};

/// Kubernetes node benchmark auditor
#[derive(Parser, Debug)]
#[command(name = "kubecis")]
#[command(version)]
#[command(about = "Audit a Kubernetes node against a CIS-style benchmark", long_about = None)]
struct Cli {
    /// Configuration file path (missing file means defaults)
    #[arg(short, long, global = true, default_value = "/etc/kubecis/kubecis.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format (pretty, json, compact)
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Audit this node and write the results artifact
    Scan(ScanArgs),
    /// Print the raw result records
    Raw {
        /// Results artifact to read
        #[arg(long)]
        results: Option<String>,
    },
    /// Print the processed summary of the results artifact
    Summary {
        /// Results artifact to read
        #[arg(long)]
        results: Option<String>,
    },
    /// Print recent runtime alerts, newest first
    RuntimeAlerts {
        /// Newline-delimited JSON event log
        #[arg(long)]
        events: Option<String>,
    },
    /// Print runtime alert statistics
    RuntimeStats {
        /// Newline-delimited JSON event log
        #[arg(long)]
        events: Option<String>,
    },
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Benchmark directory or single document
    #[arg(long)]
    source: Option<String>,

    /// Where to write the results artifact
    #[arg(long)]
    output: Option<String>,

    /// Do not echo the results to stdout
    #[arg(long)]
    quiet: bool,

    /// Exit non-zero when any check failed
    #[arg(long)]
    strict: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let mut log_config = LogConfig::from_settings(&config.logging);
    if let Some(format) = &cli.log_format {
        log_config = log_config.format(LogFormat::parse(format));
    }
    init_logging_with_config(log_config);

    debug!("kubecis v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Scan(args) => run_scan(config, args).await,
        Commands::Raw { results } => {
            let path = results.unwrap_or(config.report.results_path);
            let records = kubecis_report::load_raw(&path).await?;
            print_json(&records)
        }
        Commands::Summary { results } => {
            let path = results.unwrap_or(config.report.results_path);
            let summary = kubecis_report::summarize_file(&path).await?;
            print_json(&summary)
        }
        Commands::RuntimeAlerts { events } => {
            let path = events.unwrap_or_else(|| config.runtime.events_path.clone());
            run_runtime_alerts(&config, &path)
        }
        Commands::RuntimeStats { events } => {
            let path = events.unwrap_or_else(|| config.runtime.events_path.clone());
            run_runtime_stats(&config, &path)
        }
    }
}

/// Load the config file (if present), apply env overrides, then CLI overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let config = if Path::new(&cli.config).exists() {
        Config::from_file(&cli.config)
            .with_context(|| format!("Failed to load config from {}", cli.config))?
    } else {
        Config::default()
    };

    let mut config = config.merge_env();
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Run the benchmark audit and write the results artifact
async fn run_scan(config: Config, args: ScanArgs) -> Result<()> {
    let mut audit = config.audit;
    if let Some(source) = args.source {
        audit.benchmark_source = source;
    }
    if let Some(output) = args.output {
        audit.output_path = output;
    }

    if !Path::new(&audit.benchmark_source).exists() {
        bail!(
            "Source '{}' not found (expected directory or file)",
            audit.benchmark_source
        );
    }

    info!("Running benchmark audit from {}", audit.benchmark_source);
    let auditor = BenchmarkAuditor::from_config(&audit);
    let run = auditor.audit_source(&audit.benchmark_source).await?;

    let artifact = to_pretty_json(&run.results)?;
    write_artifact(&audit.output_path, &artifact)?;
    info!("Results written to {}", audit.output_path);

    if !args.quiet {
        println!("{}", artifact);
    }
    log_summary(&run.summary);

    if args.strict && run.summary.failed > 0 {
        bail!("{} checks failed", run.summary.failed);
    }
    Ok(())
}

fn log_summary(summary: &AuditSummary) {
    let pass_rate = if summary.total_checks > 0 {
        summary.passed as f64 / summary.total_checks as f64 * 100.0
    } else {
        0.0
    };
    info!(
        documents = summary.documents,
        total = summary.total_checks,
        passed = summary.passed,
        failed = summary.failed,
        warned = summary.warned,
        errors = summary.errors,
        "Audit summary ({:.1}% passed)",
        pass_rate
    );
}

fn run_runtime_alerts(config: &Config, path: &str) -> Result<()> {
    let filter = EventFilter::from_config(&config.runtime);

    let output = match load_events(path) {
        Ok(events) => {
            let alerts: Vec<Value> = recent_alerts(events, &filter)
                .into_iter()
                .map(|event| event.raw)
                .collect();
            json!({
                "alerts": alerts,
                "total": alerts.len(),
                "timestamp": timestamp(),
            })
        }
        Err(Error::ResultsUnavailable { message, .. }) => {
            warn!("{}: {}", message, path);
            json!({"alerts": [], "total": 0, "error": message})
        }
        Err(e) => return Err(e.into()),
    };

    print_json(&output)
}

fn run_runtime_stats(config: &Config, path: &str) -> Result<()> {
    let filter = EventFilter::from_config(&config.runtime);

    let output = match load_events(path) {
        Ok(events) => {
            let mut stats = serde_json::to_value(summarize(events, &filter))?;
            stats["timestamp"] = json!(timestamp());
            stats
        }
        Err(Error::ResultsUnavailable { message, .. }) => {
            warn!("{}: {}", message, path);
            json!({"error": message})
        }
        Err(e) => return Err(e.into()),
    };

    print_json(&output)
}

/// Seconds since the Unix epoch, with millisecond precision
fn timestamp() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Pretty JSON with four-space indentation
fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8(buf)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", to_pretty_json(value)?);
    Ok(())
}

fn write_artifact(path: &str, content: &str) -> Result<()> {
    let path = Path::new(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, format!("{}\n", content))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
