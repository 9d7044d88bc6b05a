//! kubecis Runtime - Classifies runtime security events
//!
//! Events arrive as newline-delimited JSON from a kernel-level monitor. This
//! crate parses them into a closed set of event kinds, drops monitoring noise,
//! assigns a coarse severity tier, and tallies what is left.

pub mod classifier;
pub mod event;
pub mod summary;

pub use classifier::EventFilter;
pub use event::{EventKind, EventType, ProcessInfo, RuntimeEvent};
pub use summary::{
    load_events, read_event_stream, recent_alerts, summarize, EventSummary, Tally,
    MAX_RECENT_EVENTS, TALLY_LIMIT,
};
