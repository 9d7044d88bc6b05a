//! Runtime event model
//!
//! Each record names its kind by a single top-level key (`process_exec`,
//! `process_tracepoint`, ...). The key is resolved once, here, into an
//! [`EventKind`]; records with no known key are rejected.

use kubecis_core::Severity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Known event kinds, in the order their keys are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ProcessTracepoint,
    ProcessExec,
    ProcessKprobe,
    ProcessExit,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::ProcessTracepoint,
        EventType::ProcessExec,
        EventType::ProcessKprobe,
        EventType::ProcessExit,
    ];

    /// Key naming this kind in a raw record
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ProcessTracepoint => "process_tracepoint",
            EventType::ProcessExec => "process_exec",
            EventType::ProcessKprobe => "process_kprobe",
            EventType::ProcessExit => "process_exit",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The process an event was raised for
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    #[serde(default)]
    pub binary: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
    #[serde(default)]
    pub pid: Option<u64>,
    #[serde(default)]
    pub uid: Option<u64>,
}

/// Payload of a `process_exec` or `process_exit` record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessEvent {
    #[serde(default)]
    pub process: ProcessInfo,
}

/// Payload of a `process_tracepoint` record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TracepointEvent {
    #[serde(default)]
    pub process: ProcessInfo,
    #[serde(default)]
    pub subsys: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
}

/// Payload of a `process_kprobe` record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KprobeEvent {
    #[serde(default)]
    pub process: ProcessInfo,
    #[serde(default)]
    pub function_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Tracepoint(TracepointEvent),
    Exec(ProcessEvent),
    Kprobe(KprobeEvent),
    Exit(ProcessEvent),
}

/// A parsed runtime event; `raw` keeps the original record for re-emission
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeEvent {
    pub kind: EventKind,
    pub time: Option<String>,
    pub raw: Value,
}

impl RuntimeEvent {
    /// Resolve a raw record; `None` when it carries no known event key
    pub fn from_value(raw: Value) -> Option<Self> {
        let object = raw.as_object()?;
        let event_type = EventType::ALL
            .into_iter()
            .find(|t| object.contains_key(t.as_str()))?;
        let payload = object.get(event_type.as_str()).cloned().unwrap_or(Value::Null);

        let kind = match event_type {
            EventType::ProcessTracepoint => EventKind::Tracepoint(lenient(payload)),
            EventType::ProcessExec => EventKind::Exec(lenient(payload)),
            EventType::ProcessKprobe => EventKind::Kprobe(lenient(payload)),
            EventType::ProcessExit => EventKind::Exit(lenient(payload)),
        };
        let time = object.get("time").and_then(Value::as_str).map(String::from);

        Some(Self { kind, time, raw })
    }

    pub fn event_type(&self) -> EventType {
        match self.kind {
            EventKind::Tracepoint(_) => EventType::ProcessTracepoint,
            EventKind::Exec(_) => EventType::ProcessExec,
            EventKind::Kprobe(_) => EventType::ProcessKprobe,
            EventKind::Exit(_) => EventType::ProcessExit,
        }
    }

    pub fn process(&self) -> &ProcessInfo {
        match &self.kind {
            EventKind::Tracepoint(e) => &e.process,
            EventKind::Kprobe(e) => &e.process,
            EventKind::Exec(e) | EventKind::Exit(e) => &e.process,
        }
    }

    /// Tracepoint subsystem, if any
    pub fn subsystem(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Tracepoint(e) => e.subsys.as_deref(),
            _ => None,
        }
    }

    /// Name used for type tallies and severity
    pub fn event_name(&self) -> &str {
        match &self.kind {
            EventKind::Tracepoint(e) => e.event.as_deref().unwrap_or("unknown"),
            EventKind::Exec(_) => "execve",
            EventKind::Kprobe(e) => e.function_name.as_deref().unwrap_or("kprobe"),
            EventKind::Exit(_) => "unknown",
        }
    }

    /// Name used for process tallies
    ///
    /// Exit records are tallied as `unknown`; the deny-list in
    /// [`EventFilter`](crate::EventFilter) still sees their binary.
    pub fn process_name(&self) -> &str {
        match &self.kind {
            EventKind::Exit(_) => "unknown",
            _ => self.process().binary.as_deref().unwrap_or("unknown"),
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::from_event_name(self.event_name())
    }
}

/// Decode a payload, treating anything unreadable as empty
fn lenient<T: serde::de::DeserializeOwned + Default>(payload: Value) -> T {
    serde_json::from_value(payload).unwrap_or_default()
}
