use serde::{Deserialize, Serialize};

/// Whether an event opens or closes a collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Start,
    End,
}

/// A single timing event reported by an instrumented thread.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameEvent {
    pub kind: EventKind,
    pub collector_index: usize,
    /// Timestamp in seconds.
    pub time: f64,
}

impl FrameEvent {
    pub fn start(collector_index: usize, time: f64) -> Self {
        Self {
            kind: EventKind::Start,
            collector_index,
            time,
        }
    }

    pub fn end(collector_index: usize, time: f64) -> Self {
        Self {
            kind: EventKind::End,
            collector_index,
            time,
        }
    }

    pub fn is_start(&self) -> bool {
        self.kind == EventKind::Start
    }
}

/// One frame's worth of events for one thread, in the order they were
/// recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameData {
    pub start: f64,
    pub end: f64,
    pub events: Vec<FrameEvent>,
}

impl FrameData {
    pub fn new(start: f64, end: f64, events: Vec<FrameEvent>) -> Self {
        Self { start, end, events }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
