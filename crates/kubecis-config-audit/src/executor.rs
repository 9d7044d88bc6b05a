//! Audit command execution
//!
//! Every failure mode is folded into the returned text: a missing binary, a
//! permission error, or a timeout becomes output that the evaluator grades
//! like any other.

use kubecis_common::AuditConfig;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

/// Something that can run an audit command and return its text
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command`; never fails, failures are described in the returned text
    async fn execute(&self, command: &str) -> String;
}

/// Runs audit commands through a shell, with native fallbacks
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    timeout: Duration,
    shell: String,
    process_target: String,
    proc_root: PathBuf,
    prefer_native_stat: bool,
    search_path: Option<OsString>,
}

impl ShellExecutor {
    /// Create an executor with default settings and the current `PATH`
    pub fn new() -> Self {
        Self::from_config(&AuditConfig::default())
    }

    pub fn from_config(config: &AuditConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.command_timeout_seconds),
            shell: config.shell.clone(),
            process_target: config.process_target.clone(),
            proc_root: PathBuf::from(&config.proc_root),
            prefer_native_stat: config.prefer_native_stat,
            search_path: std::env::var_os("PATH"),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn with_proc_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.proc_root = root.into();
        self
    }

    /// Override the directories searched for `ps` and `stat`
    pub fn with_search_path(mut self, search_path: Option<OsString>) -> Self {
        self.search_path = search_path;
        self
    }

    pub fn prefer_native_stat(mut self, prefer: bool) -> Self {
        self.prefer_native_stat = prefer;
        self
    }

    #[cfg(unix)]
    fn fallback(&self, command: &str) -> Option<String> {
        use crate::linux;

        if is_process_listing(command)
            && linux::find_in_path("ps", self.search_path.as_deref()).is_none()
            && self.proc_root.is_dir()
        {
            let target = grep_target(command).unwrap_or(self.process_target.as_str());
            debug!("ps unavailable, scanning {} for {}", self.proc_root.display(), target);
            return Some(linux::scan_proc(&self.proc_root, target));
        }

        if command.trim_start().starts_with("stat ")
            && (self.prefer_native_stat
                || linux::find_in_path("stat", self.search_path.as_deref()).is_none())
        {
            trace!("Answering stat from file metadata: {}", command);
            return Some(linux::stat_fallback(command));
        }

        None
    }

    #[cfg(not(unix))]
    fn fallback(&self, _command: &str) -> Option<String> {
        None
    }

    async fn run_shell(&self, command: &str) -> String {
        let child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Shell {} not found", self.shell);
                return format!("Command not found: {}", command);
            }
            Err(e) => return format!("Unexpected error executing command: {}", e),
        };

        // Dropping the future on timeout kills the child
        match timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => describe_output(
                output.status.code(),
                &String::from_utf8_lossy(&output.stdout),
                &String::from_utf8_lossy(&output.stderr),
            ),
            Ok(Err(e)) => format!("Unexpected error executing command: {}", e),
            Err(_) => {
                warn!("Command timed out after {:?}: {}", self.timeout, command);
                String::from("Command timed out")
            }
        }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CommandRunner for ShellExecutor {
    async fn execute(&self, command: &str) -> String {
        if command.trim().is_empty() {
            return String::new();
        }

        if let Some(output) = self.fallback(command) {
            return output;
        }

        debug!("Executing audit command: {}", command);
        self.run_shell(command).await
    }
}

/// Turn a finished process into audit text
fn describe_output(code: Option<i32>, stdout: &str, stderr: &str) -> String {
    let stdout_trimmed = stdout.trim();
    let stderr_trimmed = stderr.trim();

    if code == Some(0) {
        return stdout_trimmed.to_string();
    }

    let detail = if stderr_trimmed.is_empty() {
        stdout_trimmed
    } else {
        stderr_trimmed
    };

    if stderr.contains("Permission denied") {
        format!("Permission denied: {}", detail)
    } else if stderr.contains("not found") {
        format!("Command not found: {}", detail)
    } else if !stdout_trimmed.is_empty() {
        stdout_trimmed.to_string()
    } else if !stderr_trimmed.is_empty() {
        stderr_trimmed.to_string()
    } else {
        format!("Command failed with code {}", code.unwrap_or(-1))
    }
}

fn is_process_listing(command: &str) -> bool {
    command.contains("ps -ef") || command.contains("ps aux")
}

/// Search pattern of the first non-inverted `grep` stage in a pipeline
///
/// Stages using `-v` filter processes out, so they never name the target.
fn grep_target(command: &str) -> Option<&str> {
    command.split('|').find_map(|stage| {
        let mut tokens = stage.split_whitespace();
        if tokens.next()? != "grep" {
            return None;
        }
        grep_pattern(tokens)
    })
}

/// Short options whose value is the next token
const GREP_VALUE_OPTIONS: &[char] = &['A', 'B', 'C', 'd', 'D', 'f', 'm'];

fn grep_pattern<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut pattern = None;

    while let Some(token) = tokens.next() {
        if token == "--invert-match" {
            return None;
        }
        if let Some(flags) = token.strip_prefix('-').filter(|f| !f.starts_with('-')) {
            if flags.contains('v') {
                return None;
            }
            if flags.ends_with('e') {
                pattern = pattern.or(tokens.next());
            } else if flags.ends_with(GREP_VALUE_OPTIONS) {
                tokens.next();
            }
            continue;
        }
        if token.starts_with("--") {
            continue;
        }
        pattern = pattern.or(Some(token));
    }

    pattern
        .map(|t| t.trim_matches(|c| c == '"' || c == '\''))
        .filter(|t| !t.is_empty())
}
