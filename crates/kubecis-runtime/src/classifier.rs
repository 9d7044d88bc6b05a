//! Event inclusion filter

use crate::event::RuntimeEvent;
use kubecis_common::RuntimeConfig;

/// Allow-lists and a noise deny-list; an empty list never filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    included_event_types: Vec<String>,
    included_subsystems: Vec<String>,
    excluded_binaries: Vec<String>,
}

impl EventFilter {
    /// A filter that keeps every known event
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            included_event_types: config.included_event_types.clone(),
            included_subsystems: config.included_subsystems.clone(),
            excluded_binaries: config.excluded_binaries.clone(),
        }
    }

    pub fn with_event_types(mut self, types: Vec<String>) -> Self {
        self.included_event_types = types;
        self
    }

    pub fn with_subsystems(mut self, subsystems: Vec<String>) -> Self {
        self.included_subsystems = subsystems;
        self
    }

    pub fn with_excluded_binaries(mut self, binaries: Vec<String>) -> Self {
        self.excluded_binaries = binaries;
        self
    }

    /// Whether an event should be kept
    pub fn classify(&self, event: &RuntimeEvent) -> bool {
        let event_type = event.event_type();
        if !self.included_event_types.is_empty()
            && !self.included_event_types.iter().any(|t| t == event_type.as_str())
        {
            return false;
        }

        if let Some(subsys) = event.subsystem().filter(|s| !s.is_empty()) {
            if !self.included_subsystems.is_empty()
                && !self.included_subsystems.iter().any(|s| s == subsys)
            {
                return false;
            }
        }

        let binary = event.process().binary.as_deref().unwrap_or_default();
        !self
            .excluded_binaries
            .iter()
            .any(|noise| binary.contains(noise.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: serde_json::Value) -> RuntimeEvent {
        RuntimeEvent::from_value(value).unwrap()
    }

    #[test]
    fn test_allow_all_keeps_everything() {
        let filter = EventFilter::allow_all();
        assert!(filter.classify(&event(json!({"process_exit": {}}))));
    }

    #[test]
    fn test_event_type_allow_list() {
        let filter = EventFilter::allow_all().with_event_types(vec!["process_tracepoint".into()]);
        assert!(filter.classify(&event(json!({"process_tracepoint": {"event": "x"}}))));
        assert!(!filter.classify(&event(json!({"process_exec": {}}))));
    }

    #[test]
    fn test_subsystem_allow_list_only_applies_to_tracepoints() {
        let filter = EventFilter::allow_all().with_subsystems(vec!["syscalls".into()]);
        assert!(filter.classify(&event(json!({"process_tracepoint": {"subsys": "syscalls"}}))));
        assert!(!filter.classify(&event(json!({"process_tracepoint": {"subsys": "sched"}}))));
        // no subsystem present: filter skipped
        assert!(filter.classify(&event(json!({"process_tracepoint": {}}))));
        assert!(filter.classify(&event(json!({"process_kprobe": {}}))));
    }

    #[test]
    fn test_default_noise_list() {
        let filter = EventFilter::from_config(&RuntimeConfig::default());
        assert!(!filter.classify(&event(json!({"process_exec": {"process": {"binary": "/usr/bin/kubectl"}}}))));
        // substring match: "sh" also catches "/usr/sbin/sshd"
        assert!(!filter.classify(&event(json!({"process_exec": {"process": {"binary": "/usr/sbin/sshd"}}}))));
        assert!(filter.classify(&event(json!({"process_exec": {"process": {"binary": "/usr/bin/nc"}}}))));
    }
}
