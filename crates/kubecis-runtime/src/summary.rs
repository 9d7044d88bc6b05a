//! Event stream reading and summaries

use crate::classifier::EventFilter;
use crate::event::RuntimeEvent;
use kubecis_core::{Error, Result, Severity};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

/// Most recent events kept for alerts and summaries
pub const MAX_RECENT_EVENTS: usize = 1000;

/// Entries kept in each type/process tally
pub const TALLY_LIMIT: usize = 10;

/// Parse newline-delimited JSON events
///
/// Blank lines, lines that are not JSON, and records with no known event
/// kind are skipped.
pub fn read_event_stream<R: BufRead>(reader: R) -> Vec<RuntimeEvent> {
    let mut events = Vec::new();
    let mut skipped = 0usize;

    for line in reader.lines() {
        let Ok(line) = line else {
            skipped += 1;
            continue;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str(line).ok().and_then(RuntimeEvent::from_value) {
            Some(event) => events.push(event),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!("Skipped {} unreadable event records", skipped);
    }
    events
}

/// Read an event log from disk
pub fn load_events(path: impl AsRef<Path>) -> Result<Vec<RuntimeEvent>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::ResultsUnavailable {
            path: path.display().to_string(),
            message: String::from("No runtime logs found"),
        },
        _ => Error::Io(e),
    })?;

    let events = read_event_stream(BufReader::new(file));
    info!("Read {} runtime events from {}", events.len(), path.display());
    Ok(events)
}

/// Keep matching events, newest first, capped at [`MAX_RECENT_EVENTS`]
///
/// Timestamps compare as strings; events without one sort last.
pub fn recent_alerts(events: Vec<RuntimeEvent>, filter: &EventFilter) -> Vec<RuntimeEvent> {
    let mut matched: Vec<RuntimeEvent> = events
        .into_iter()
        .filter(|event| filter.classify(event))
        .collect();

    // stable: equal timestamps keep stream order
    matched.sort_by(|a, b| {
        let a = a.time.as_deref().unwrap_or_default();
        let b = b.time.as_deref().unwrap_or_default();
        b.cmp(a)
    });
    matched.truncate(MAX_RECENT_EVENTS);
    matched
}

/// Frequency count that keeps first-seen order among equal counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    entries: Vec<(String, usize)>,
}

impl Tally {
    pub fn add(&mut self, key: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, count)) => *count += 1,
            None => self.entries.push((key.to_string(), 1)),
        }
    }

    /// The `n` most frequent keys
    pub fn top(mut self, n: usize) -> Self {
        self.entries.sort_by(|a, b| b.1.cmp(&a.1));
        self.entries.truncate(n);
        self
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, count)| *count)
    }

    pub fn entries(&self) -> &[(String, usize)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Tally {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, count) in &self.entries {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

/// Counts over the recent matching events
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct EventSummary {
    /// Events summarized (after the recency cap)
    pub total: usize,
    /// Events that passed the filter before the cap
    pub total_matched: usize,
    pub by_type: Tally,
    pub by_process: Tally,
    pub by_severity: BTreeMap<Severity, usize>,
}

/// Filter, keep the most recent events, and tally them
pub fn summarize(events: Vec<RuntimeEvent>, filter: &EventFilter) -> EventSummary {
    let total_matched = events.iter().filter(|e| filter.classify(e)).count();
    let recent = recent_alerts(events, filter);

    let mut by_type = Tally::default();
    let mut by_process = Tally::default();
    let mut by_severity = BTreeMap::new();

    for event in &recent {
        by_type.add(event.event_name());
        by_process.add(event.process_name());
        *by_severity.entry(event.severity()).or_insert(0) += 1;
    }

    EventSummary {
        total: recent.len(),
        total_matched,
        by_type: by_type.top(TALLY_LIMIT),
        by_process: by_process.top(TALLY_LIMIT),
        by_severity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const STREAM: &str = r#"
{"process_exec":{"process":{"binary":"/usr/bin/nc"}},"time":"2024-05-01T10:00:02Z"}
not json at all
{"process_tracepoint":{"process":{"binary":"/usr/bin/unshare"},"subsys":"syscalls","event":"sys_enter_unshare"},"time":"2024-05-01T10:00:05Z"}

{"process_lsm":{"process":{"binary":"/x"}}}
{"process_kprobe":{"process":{"binary":"/usr/bin/curl"},"function_name":"tcp_connect"},"time":"2024-05-01T10:00:03Z"}
{"process_exit":{"process":{"binary":"/usr/bin/nc"}}}
"#;

    #[test]
    fn test_read_event_stream_skips_noise() {
        let events = read_event_stream(Cursor::new(STREAM));
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn test_recent_alerts_newest_first() {
        let events = read_event_stream(Cursor::new(STREAM));
        let alerts = recent_alerts(events, &EventFilter::allow_all());
        let times: Vec<_> = alerts.iter().map(|e| e.time.as_deref()).collect();
        assert_eq!(
            times,
            vec![
                Some("2024-05-01T10:00:05Z"),
                Some("2024-05-01T10:00:03Z"),
                Some("2024-05-01T10:00:02Z"),
                None,
            ]
        );
    }

    #[test]
    fn test_recent_alerts_cap() {
        let stream: String = (0..1200)
            .map(|i| {
                format!(
                    "{{\"process_exec\":{{\"process\":{{\"binary\":\"/bin/x\"}}}},\"time\":\"t{:05}\"}}\n",
                    i
                )
            })
            .collect();
        let alerts = recent_alerts(
            read_event_stream(Cursor::new(stream)),
            &EventFilter::allow_all(),
        );
        assert_eq!(alerts.len(), MAX_RECENT_EVENTS);
        assert_eq!(alerts[0].time.as_deref(), Some("t01199"));
    }

    #[test]
    fn test_summarize() {
        let events = read_event_stream(Cursor::new(STREAM));
        let filter = EventFilter::allow_all().with_excluded_binaries(vec!["curl".into()]);
        let summary = summarize(events, &filter);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.total_matched, 3);
        assert_eq!(summary.by_process.get("/usr/bin/nc"), Some(1));
        // exit records are not attributed to their binary
        assert_eq!(summary.by_process.get("unknown"), Some(1));
        assert_eq!(summary.by_type.get("execve"), Some(1));
        assert_eq!(summary.by_type.get("tcp_connect"), None);
        assert_eq!(summary.by_severity[&Severity::Critical], 1);
        assert_eq!(summary.by_severity[&Severity::Medium], 1);
        assert_eq!(summary.by_severity[&Severity::Low], 1);
    }

    #[test]
    fn test_tally_top_keeps_first_seen_on_ties() {
        let mut tally = Tally::default();
        for key in ["b", "a", "c", "a", "d"] {
            tally.add(key);
        }
        let top = tally.top(3);
        let keys: Vec<&str> = top.entries().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(
            serde_json::to_string(&top).unwrap(),
            r#"{"a":2,"b":1,"c":1}"#
        );
    }

    #[test]
    fn test_load_events_missing_file() {
        let err = load_events("/nonexistent/runtime_alerts.json").unwrap_err();
        assert_eq!(err.code(), "RESULTS_UNAVAILABLE");
        assert!(err.to_string().contains("No runtime logs found"));
    }

    #[test]
    fn test_load_events() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("runtime_alerts.json");
        std::fs::write(&path, STREAM).unwrap();
        assert_eq!(load_events(&path).unwrap().len(), 4);
    }
}
