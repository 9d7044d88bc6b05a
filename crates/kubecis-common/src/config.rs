//! Configuration management for kubecis components

use kubecis_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Benchmark audit settings
    #[serde(default)]
    pub audit: AuditConfig,

    /// Result summary settings
    #[serde(default)]
    pub report: ReportConfig,

    /// Runtime alert stream settings
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Configuration(format!("Failed to parse config: {}", e)))
    }

    /// Create a configuration builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Merge with environment variables (KUBECIS_ prefix)
    pub fn merge_env(self) -> Self {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source
    pub fn merge_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Audit settings
        if let Some(val) = lookup("KUBECIS_BENCHMARK_SOURCE") {
            self.audit.benchmark_source = val;
        }
        if let Some(val) = lookup("KUBECIS_OUTPUT_PATH") {
            self.audit.output_path = val;
        }
        if let Some(val) = lookup("KUBECIS_COMMAND_TIMEOUT") {
            if let Ok(n) = val.trim().parse() {
                self.audit.command_timeout_seconds = n;
            }
        }

        // Report settings
        if let Some(val) = lookup("KUBECIS_RESULTS_PATH") {
            self.report.results_path = val;
        }

        // Runtime settings
        if let Some(val) = lookup("KUBECIS_EVENTS_PATH") {
            self.runtime.events_path = val;
        }
        if let Some(val) = lookup("KUBECIS_EXCLUDED_BINARIES") {
            self.runtime.excluded_binaries = split_list(&val);
        }
        if let Some(val) = lookup("KUBECIS_INCLUDED_EVENT_TYPES") {
            self.runtime.included_event_types = split_list(&val);
        }
        if let Some(val) = lookup("KUBECIS_INCLUDED_SUBSYSTEMS") {
            self.runtime.included_subsystems = split_list(&val);
        }

        // Logging
        if let Some(val) = lookup("KUBECIS_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = lookup("KUBECIS_LOG_FORMAT") {
            self.logging.format = val;
        }

        self
    }

    /// Reject values the audit cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.audit.command_timeout_seconds == 0 {
            return Err(Error::InvalidConfig {
                key: "audit.command_timeout_seconds".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.audit.max_concurrent_documents == 0 {
            return Err(Error::InvalidConfig {
                key: "audit.max_concurrent_documents".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.audit.shell.trim().is_empty() {
            return Err(Error::InvalidConfig {
                key: "audit.shell".into(),
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

/// Split a comma-separated list, dropping empty entries
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Benchmark audit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Benchmark directory or single document
    #[serde(default = "default_benchmark_source")]
    pub benchmark_source: String,

    /// Where the results artifact is written
    #[serde(default = "default_results_path")]
    pub output_path: String,

    /// Hard timeout for each audit command, in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_seconds: u64,

    /// Shell used to run audit commands
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Process searched for when `ps` is unavailable and the command names none
    #[serde(default = "default_process_target")]
    pub process_target: String,

    /// Process table root used by the `ps` fallback
    #[serde(default = "default_proc_root")]
    pub proc_root: String,

    /// Answer `stat ...` commands from file metadata even when a stat binary exists
    #[serde(default = "default_true")]
    pub prefer_native_stat: bool,

    /// Benchmark documents audited concurrently
    #[serde(default = "default_max_documents")]
    pub max_concurrent_documents: usize,
}

fn default_benchmark_source() -> String {
    String::from("cis-1.11")
}

fn default_results_path() -> String {
    String::from("/output/results.json")
}

fn default_command_timeout() -> u64 {
    20
}

fn default_shell() -> String {
    String::from("/bin/sh")
}

fn default_process_target() -> String {
    String::from("kube-apiserver")
}

fn default_proc_root() -> String {
    String::from("/proc")
}

fn default_true() -> bool {
    true
}

fn default_max_documents() -> usize {
    1
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            benchmark_source: default_benchmark_source(),
            output_path: default_results_path(),
            command_timeout_seconds: default_command_timeout(),
            shell: default_shell(),
            process_target: default_process_target(),
            proc_root: default_proc_root(),
            prefer_native_stat: true,
            max_concurrent_documents: default_max_documents(),
        }
    }
}

/// Result summary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Results artifact read by the raw and summary queries
    #[serde(default = "default_results_path")]
    pub results_path: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            results_path: default_results_path(),
        }
    }
}

/// Runtime alert stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Newline-delimited JSON event log
    #[serde(default = "default_events_path")]
    pub events_path: String,

    /// Event kinds to keep (empty = all)
    #[serde(default)]
    pub included_event_types: Vec<String>,

    /// Tracepoint subsystems to keep (empty = all)
    #[serde(default)]
    pub included_subsystems: Vec<String>,

    /// Binary-name substrings treated as monitoring noise
    #[serde(default = "default_excluded_binaries")]
    pub excluded_binaries: Vec<String>,
}

fn default_events_path() -> String {
    String::from("/output/runtime_alerts.json")
}

fn default_excluded_binaries() -> Vec<String> {
    split_list("kubectl,jq,grep,bash,sh,chmod,touch,echo,cat,head,tail,sed,awk,curl,wget")
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            events_path: default_events_path(),
            included_event_types: Vec::new(),
            included_subsystems: Vec::new(),
            excluded_binaries: default_excluded_binaries(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, json, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    String::from("info")
}

fn default_log_format() -> String {
    String::from("pretty")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Builder for constructing Config
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn benchmark_source(mut self, source: impl Into<String>) -> Self {
        self.config.audit.benchmark_source = source.into();
        self
    }

    pub fn output_path(mut self, path: impl Into<String>) -> Self {
        self.config.audit.output_path = path.into();
        self
    }

    pub fn command_timeout(mut self, seconds: u64) -> Self {
        self.config.audit.command_timeout_seconds = seconds;
        self
    }

    pub fn proc_root(mut self, root: impl Into<String>) -> Self {
        self.config.audit.proc_root = root.into();
        self
    }

    pub fn results_path(mut self, path: impl Into<String>) -> Self {
        self.config.report.results_path = path.into();
        self
    }

    pub fn events_path(mut self, path: impl Into<String>) -> Self {
        self.config.runtime.events_path = path.into();
        self
    }

    pub fn excluded_binaries(mut self, binaries: Vec<String>) -> Self {
        self.config.runtime.excluded_binaries = binaries;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
