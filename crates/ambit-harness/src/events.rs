#![forbid(unsafe_code)]

//! Lifecycle event log.
//!
//! Every hook the renderer drives is recorded in order so tests can assert
//! on mount/update/unmount sequences and per-component render counts. The
//! log exports as JSONL for post-mortem inspection.

use std::fmt;

use ambit::NodeId;
use serde_json::json;

/// Which hook ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Create,
    Render,
    Mount,
    /// `should_update` returned false.
    Skip,
    Update,
    /// An update triggered through an update handle.
    Forced,
    Unmount,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Render => "render",
            Self::Mount => "mount",
            Self::Skip => "skip",
            Self::Update => "update",
            Self::Forced => "forced",
            Self::Unmount => "unmount",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded hook call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub seq: u64,
    pub node: NodeId,
    pub component: &'static str,
    pub phase: Phase,
}

/// Ordered record of lifecycle events.
#[derive(Debug, Default)]
pub struct EventLog {
    enabled: bool,
    next_seq: u64,
    events: Vec<LifecycleEvent>,
}

impl EventLog {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            next_seq: 0,
            events: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, node: NodeId, component: &'static str, phase: Phase) {
        if !self.enabled {
            return;
        }
        self.events.push(LifecycleEvent {
            seq: self.next_seq,
            node,
            component,
            phase,
        });
        self.next_seq += 1;
    }

    #[must_use]
    pub fn events(&self) -> &[LifecycleEvent] {
        &self.events
    }

    /// Number of `phase` events for components named `component`.
    #[must_use]
    pub fn count(&self, component: &str, phase: Phase) -> usize {
        self.events
            .iter()
            .filter(|e| e.component == component && e.phase == phase)
            .count()
    }

    /// Number of `phase` events for one node.
    #[must_use]
    pub fn count_for(&self, node: NodeId, phase: Phase) -> usize {
        self.events
            .iter()
            .filter(|e| e.node == node && e.phase == phase)
            .count()
    }

    /// `component:phase` pairs in order, for sequence assertions.
    #[must_use]
    pub fn trace(&self) -> Vec<String> {
        self.events
            .iter()
            .map(|e| format!("{}:{}", e.component, e.phase))
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// One JSON object per line.
    #[must_use]
    pub fn to_jsonl(&self) -> String {
        let mut out = String::new();
        for event in &self.events {
            let line = json!({
                "seq": event.seq,
                "node": event.node.0,
                "component": event.component,
                "phase": event.phase.as_str(),
            });
            out.push_str(&line.to_string());
            out.push('\n');
        }
        out
    }
}
