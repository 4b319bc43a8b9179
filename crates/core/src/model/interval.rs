use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Collector index reserved for the whole-frame span.
pub const FRAME_COLLECTOR: usize = 0;

/// A closed time span attributed to one collector within one frame of one
/// thread. Drawn as a single bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    pub collector_index: usize,
    pub thread_index: usize,
    pub frame_number: i64,
}

impl Interval {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether this is a whole-frame marker.
    pub fn is_frame(&self) -> bool {
        self.collector_index == FRAME_COLLECTOR
    }

    /// Whether `time` lies in `[start, end)`.
    pub fn covers(&self, time: f64) -> bool {
        self.start <= time && time < self.end
    }

    /// Row ordering: by start, then by end.
    pub fn cmp_by_time(&self, other: &Self) -> Ordering {
        self.start
            .total_cmp(&other.start)
            .then_with(|| self.end.total_cmp(&other.end))
    }
}

/// All intervals at one nesting depth of one thread, sorted by start.
pub type Row = Vec<Interval>;

/// Index to start scanning `row` from to find every interval reaching
/// `time` or later.
///
/// Finds the last interval starting at or before `time`, then steps back
/// over earlier ones that still end at or after it. Only start order is
/// assumed: empty intervals from clamped late frames break end order.
pub fn first_reaching(row: &[Interval], time: f64) -> usize {
    let mut first = row.partition_point(|bar| bar.start <= time).saturating_sub(1);
    while first > 0 && row[first - 1].end >= time {
        first -= 1;
    }
    first
}
