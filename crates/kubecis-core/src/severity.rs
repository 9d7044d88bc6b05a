//! Severity tiers for runtime security events

use serde::{Deserialize, Serialize};

/// Severity tier assigned to a runtime event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Nothing in the event name matched a known keyword
    #[default]
    Low,
    /// File mode/owner changes, tracing, plain exec
    Medium,
    /// Process creation and network activity
    High,
    /// Privilege, namespace, and mount changes
    Critical,
}

/// Keyword tiers, checked in order; the first tier with a matching keyword wins.
const KEYWORD_TIERS: &[(Severity, &[&str])] = &[
    (
        Severity::Critical,
        &["setuid", "capset", "sigkill", "unshare", "mount"],
    ),
    (Severity::High, &["clone", "accept", "connect", "bind"]),
    (Severity::Medium, &["execve", "ptrace", "chmod", "chown"]),
];

impl Severity {
    /// Classify an event or kernel function name by keyword
    pub fn from_event_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        KEYWORD_TIERS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(severity, _)| *severity)
            .unwrap_or(Severity::Low)
    }

    /// Get display string
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_tiers() {
        assert_eq!(Severity::from_event_name("sys_setuid"), Severity::Critical);
        assert_eq!(Severity::from_event_name("sys_enter_mount"), Severity::Critical);
        assert_eq!(Severity::from_event_name("tcp_connect"), Severity::High);
        assert_eq!(Severity::from_event_name("execve"), Severity::Medium);
        assert_eq!(Severity::from_event_name("sys_openat"), Severity::Low);
    }

    #[test]
    fn test_case_insensitive_and_first_match_wins() {
        assert_eq!(Severity::from_event_name("SYS_CHMOD"), Severity::Medium);
        // "umount" contains "mount" (critical) even though nothing else matches
        assert_eq!(Severity::from_event_name("sys_umount"), Severity::Critical);
        // critical keywords beat high ones in the same name
        assert_eq!(Severity::from_event_name("clone_unshare"), Severity::Critical);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }
}
