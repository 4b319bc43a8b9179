use std::collections::BTreeMap;

use frame_timeline_protocol::FrameData;

use crate::model::FRAME_COLLECTOR;

/// Where a timeline reads raw per-thread frame data and collector names.
///
/// Frames may be missing or arrive in any order; a source only has to
/// answer for what it currently holds.
pub trait EventSource {
    fn num_threads(&self) -> usize;

    fn thread_name(&self, thread_index: usize) -> Option<&str>;

    fn oldest_frame_number(&self, thread_index: usize) -> Option<i64>;

    fn latest_frame_number(&self, thread_index: usize) -> Option<i64>;

    fn is_empty(&self, thread_index: usize) -> bool {
        self.latest_frame_number(thread_index).is_none()
    }

    fn frame(&self, thread_index: usize, frame_number: i64) -> Option<&FrameData>;

    fn has_collector(&self, collector_index: usize) -> bool;

    /// Short name, used as a bar label.
    fn collector_name(&self, collector_index: usize) -> Option<&str>;

    /// Name including parent collectors, used in tooltips.
    fn collector_fullname(&self, collector_index: usize) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectorDef {
    pub name: String,
    pub fullname: String,
    pub parent: Option<usize>,
}

#[derive(Debug, Clone, Default)]
struct ThreadLog {
    name: String,
    frames: BTreeMap<i64, FrameData>,
}

/// An [`EventSource`] kept entirely in memory, with an optional cap on
/// how many frames each thread retains. Older frames age out first.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    collectors: Vec<Option<CollectorDef>>,
    threads: Vec<ThreadLog>,
    history: Option<usize>,
}

impl MemorySource {
    pub fn new() -> Self {
        let mut source = Self::default();
        source.define_collector(FRAME_COLLECTOR, "Frame", None);
        source
    }

    /// Keep at most `frames` frames per thread.
    pub fn with_history(frames: usize) -> Self {
        Self {
            history: Some(frames.max(1)),
            ..Self::new()
        }
    }

    /// Define collector `index`. Children of anything but the frame
    /// collector get a `parent:child` full name.
    pub fn define_collector(&mut self, index: usize, name: &str, parent: Option<usize>) {
        let fullname = match parent
            .filter(|&p| p != FRAME_COLLECTOR)
            .and_then(|p| self.collector_fullname(p))
        {
            Some(parent_name) => format!("{parent_name}:{name}"),
            None => name.to_string(),
        };
        if index >= self.collectors.len() {
            self.collectors.resize(index + 1, None);
        }
        self.collectors[index] = Some(CollectorDef {
            name: name.to_string(),
            fullname,
            parent,
        });
    }

    /// Add a named thread, returning its index.
    pub fn add_thread(&mut self, name: &str) -> usize {
        self.threads.push(ThreadLog {
            name: name.to_string(),
            frames: BTreeMap::new(),
        });
        self.threads.len() - 1
    }

    /// Store a frame, creating unnamed threads up to `thread_index` if
    /// needed. Replaces any frame already stored under that number.
    pub fn insert_frame(&mut self, thread_index: usize, frame_number: i64, frame: FrameData) {
        while thread_index >= self.threads.len() {
            let name = format!("Thread {}", self.threads.len());
            self.add_thread(&name);
        }
        let log = &mut self.threads[thread_index];
        log.frames.insert(frame_number, frame);
        if let Some(limit) = self.history {
            while log.frames.len() > limit {
                log.frames.pop_first();
            }
        }
    }

    pub fn num_frames(&self, thread_index: usize) -> usize {
        self.threads.get(thread_index).map_or(0, |t| t.frames.len())
    }
}

impl EventSource for MemorySource {
    fn num_threads(&self) -> usize {
        self.threads.len()
    }

    fn thread_name(&self, thread_index: usize) -> Option<&str> {
        self.threads.get(thread_index).map(|t| t.name.as_str())
    }

    fn oldest_frame_number(&self, thread_index: usize) -> Option<i64> {
        self.threads
            .get(thread_index)?
            .frames
            .first_key_value()
            .map(|(n, _)| *n)
    }

    fn latest_frame_number(&self, thread_index: usize) -> Option<i64> {
        self.threads
            .get(thread_index)?
            .frames
            .last_key_value()
            .map(|(n, _)| *n)
    }

    fn frame(&self, thread_index: usize, frame_number: i64) -> Option<&FrameData> {
        self.threads.get(thread_index)?.frames.get(&frame_number)
    }

    fn has_collector(&self, collector_index: usize) -> bool {
        matches!(self.collectors.get(collector_index), Some(Some(_)))
    }

    fn collector_name(&self, collector_index: usize) -> Option<&str> {
        self.collectors
            .get(collector_index)?
            .as_ref()
            .map(|c| c.name.as_str())
    }

    fn collector_fullname(&self, collector_index: usize) -> Option<&str> {
        self.collectors
            .get(collector_index)?
            .as_ref()
            .map(|c| c.fullname.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_fullnames() {
        let mut source = MemorySource::new();
        source.define_collector(1, "Draw", Some(FRAME_COLLECTOR));
        source.define_collector(4, "Cull", Some(1));
        assert_eq!(source.collector_name(4), Some("Cull"));
        assert_eq!(source.collector_fullname(4), Some("Draw:Cull"));
        assert_eq!(source.collector_fullname(1), Some("Draw"));
        assert!(source.has_collector(0));
        assert!(!source.has_collector(2));
        assert!(!source.has_collector(99));
    }

    #[test]
    fn history_drops_oldest() {
        let mut source = MemorySource::with_history(2);
        for n in [3, 1, 2] {
            source.insert_frame(0, n, FrameData::new(n as f64, n as f64 + 1.0, vec![]));
        }
        assert_eq!(source.num_frames(0), 2);
        assert_eq!(source.oldest_frame_number(0), Some(2));
        assert_eq!(source.latest_frame_number(0), Some(3));
        assert!(source.frame(0, 1).is_none());
    }

    #[test]
    fn threads_created_on_insert() {
        let mut source = MemorySource::new();
        let main = source.add_thread("Main");
        source.insert_frame(2, 0, FrameData::default());
        assert_eq!(main, 0);
        assert_eq!(source.num_threads(), 3);
        assert_eq!(source.thread_name(1), Some("Thread 1"));
        assert!(source.is_empty(1));
        assert!(!source.is_empty(2));
        assert!(source.is_empty(7));
    }
}
