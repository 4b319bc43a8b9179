use frame_timeline_protocol::{EventKind, FrameData};
use tracing::trace;

use crate::model::Interval;

/// One entry of the open-collector stack. A collector closed out of order
/// leaves a `Closed` slot behind so the depth of everything above it stays
/// put.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Slot {
    Open { collector_index: usize, start: f64 },
    Closed,
}

/// An interval together with the depth row it belongs in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedBar {
    pub depth: usize,
    pub interval: Interval,
}

/// The result of decoding one frame of one thread.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedFrame {
    pub bars: Vec<DecodedBar>,
    /// Number of depth rows the destination needs, never less than it had.
    pub row_count: usize,
    /// Whether `row_count` exceeds the destination's previous row count.
    pub grew: bool,
}

/// Turns one frame's start/end event list into closed intervals.
#[derive(Debug, Clone, Copy)]
pub struct IntervalDecoder {
    thread_index: usize,
    frame_number: i64,
    /// Starts earlier than this are clamped to it.
    clamp_start: f64,
}

impl IntervalDecoder {
    pub fn new(thread_index: usize, frame_number: i64, clamp_start: f64) -> Self {
        Self {
            thread_index,
            frame_number,
            clamp_start,
        }
    }

    /// Decode `frame`, given the destination thread currently has
    /// `existing_rows` depth rows.
    ///
    /// Every start event yields exactly one interval: matched ends close
    /// it, and anything still open when the events run out is closed at
    /// the frame's end time. End events with no matching open collector are
    /// dropped.
    pub fn decode(&self, frame: &FrameData, existing_rows: usize) -> DecodedFrame {
        let mut out = DecodedFrame {
            bars: Vec::with_capacity(frame.events.len() / 2),
            row_count: existing_rows,
            grew: false,
        };
        let mut stack: Vec<Slot> = Vec::new();

        for event in &frame.events {
            match event.kind {
                EventKind::Start => {
                    stack.push(Slot::Open {
                        collector_index: event.collector_index,
                        start: event.time.max(self.clamp_start),
                    });
                    if stack.len() > out.row_count {
                        out.row_count = stack.len();
                        out.grew = true;
                    }
                }
                EventKind::End => self.close(&mut stack, event.collector_index, event.time, &mut out),
            }
        }

        while let Some(slot) = stack.pop() {
            if let Slot::Open {
                collector_index,
                start,
            } = slot
            {
                self.emit(&mut out, stack.len(), collector_index, start, frame.end);
            }
        }

        out
    }

    fn close(&self, stack: &mut Vec<Slot>, collector_index: usize, time: f64, out: &mut DecodedFrame) {
        match stack.last().copied() {
            Some(Slot::Open {
                collector_index: top,
                start,
            }) if top == collector_index => {
                stack.pop();
                self.emit(out, stack.len(), collector_index, start, time);
                while stack.last() == Some(&Slot::Closed) {
                    stack.pop();
                }
            }
            Some(_) => {
                // Closed before one of its children; keep its slot so the
                // children keep their depth.
                let found = stack.iter().rposition(|slot| {
                    matches!(slot, Slot::Open { collector_index: c, .. } if *c == collector_index)
                });
                match found {
                    Some(depth) => {
                        if let Slot::Open { start, .. } = stack[depth] {
                            self.emit(out, depth, collector_index, start, time);
                        }
                        stack[depth] = Slot::Closed;
                    }
                    None => trace!(
                        thread = self.thread_index,
                        frame = self.frame_number,
                        collector_index,
                        "dropping end event with no open collector"
                    ),
                }
            }
            None => trace!(
                thread = self.thread_index,
                frame = self.frame_number,
                collector_index,
                "dropping end event on empty stack"
            ),
        }
    }

    /// A start clamped past its end collapses to an empty interval.
    fn emit(&self, out: &mut DecodedFrame, depth: usize, collector_index: usize, start: f64, end: f64) {
        out.bars.push(DecodedBar {
            depth,
            interval: Interval {
                start,
                end: end.max(start),
                collector_index,
                thread_index: self.thread_index,
                frame_number: self.frame_number,
            },
        });
    }
}
