use std::collections::BTreeMap;

use frame_timeline_protocol::Renderer;
use tracing::debug;

use crate::source::EventSource;
use crate::timeline::Timeline;

/// Opaque key for a registered timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimelineHandle(u64);

struct Entry<R> {
    timeline: Timeline,
    renderer: R,
}

/// The live timelines of one monitor, each paired with the renderer it
/// draws into. New data is broadcast to every registered timeline.
pub struct TimelineRegistry<R> {
    next_handle: u64,
    entries: BTreeMap<TimelineHandle, Entry<R>>,
}

impl<R> Default for TimelineRegistry<R> {
    fn default() -> Self {
        Self {
            next_handle: 0,
            entries: BTreeMap::new(),
        }
    }
}

impl<R: Renderer> TimelineRegistry<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, timeline: Timeline, renderer: R) -> TimelineHandle {
        let handle = TimelineHandle(self.next_handle);
        self.next_handle += 1;
        self.entries.insert(handle, Entry { timeline, renderer });
        debug!(?handle, live = self.entries.len(), "timeline registered");
        handle
    }

    /// Remove a timeline, handing back it and its renderer.
    pub fn unregister(&mut self, handle: TimelineHandle) -> Option<(Timeline, R)> {
        let entry = self.entries.remove(&handle)?;
        debug!(?handle, live = self.entries.len(), "timeline unregistered");
        Some((entry.timeline, entry.renderer))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn handles(&self) -> impl Iterator<Item = TimelineHandle> + '_ {
        self.entries.keys().copied()
    }

    pub fn get(&self, handle: TimelineHandle) -> Option<&Timeline> {
        self.entries.get(&handle).map(|e| &e.timeline)
    }

    pub fn get_mut(&mut self, handle: TimelineHandle) -> Option<&mut Timeline> {
        self.entries.get_mut(&handle).map(|e| &mut e.timeline)
    }

    pub fn renderer(&self, handle: TimelineHandle) -> Option<&R> {
        self.entries.get(&handle).map(|e| &e.renderer)
    }

    /// Both halves of an entry at once, e.g. to redraw after input.
    pub fn parts_mut(&mut self, handle: TimelineHandle) -> Option<(&mut Timeline, &mut R)> {
        self.entries
            .get_mut(&handle)
            .map(|e| (&mut e.timeline, &mut e.renderer))
    }

    /// Forward a newly available frame to every timeline.
    pub fn new_data<S: EventSource + ?Sized>(&mut self, source: &S, thread_index: usize, frame_number: i64) {
        for entry in self.entries.values_mut() {
            entry
                .timeline
                .new_data(source, thread_index, frame_number, &mut entry.renderer);
        }
    }

    /// Tick every timeline. Returns whether any of them is still animating.
    pub fn animate<S: EventSource + ?Sized>(&mut self, dt: f64, source: &S) -> bool {
        let mut animating = false;
        for entry in self.entries.values_mut() {
            animating |= entry.timeline.animate(dt, source, &mut entry.renderer);
        }
        animating
    }
}
