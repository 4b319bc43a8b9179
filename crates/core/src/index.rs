use tracing::debug;

use crate::decoder::DecodedFrame;
use crate::model::{Interval, Row, ThreadRow};

/// Per-thread, depth-indexed interval rows plus the global row layout.
///
/// Threads are created on first reference and never removed; rows only
/// grow. Thread `i + 1` starts one row below the last row of thread `i`,
/// leaving a separator row between them.
#[derive(Debug, Clone, Default)]
pub struct ThreadRowIndex {
    threads: Vec<ThreadRow>,
}

impl ThreadRowIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn threads(&self) -> &[ThreadRow] {
        &self.threads
    }

    pub fn thread(&self, thread_index: usize) -> Option<&ThreadRow> {
        self.threads.get(thread_index)
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn row(&self, thread_index: usize, depth: usize) -> Option<&Row> {
        self.threads.get(thread_index)?.rows.get(depth)
    }

    /// Depth-0 row of thread 0, where the whole-frame markers live.
    pub fn frame_row(&self) -> Option<&Row> {
        self.row(0, 0)
    }

    /// Number of display rows, including one separator per thread.
    pub fn total_rows(&self) -> usize {
        self.threads.last().map_or(0, ThreadRow::next_offset)
    }

    pub fn set_label(&mut self, thread_index: usize, label: &str) {
        if let Some(thread) = self.threads.get_mut(thread_index)
            && thread.label != label
        {
            thread.label = label.to_string();
        }
    }

    /// Make sure `thread_index` exists. Returns whether any thread was
    /// created.
    pub fn ensure_thread(&mut self, thread_index: usize) -> bool {
        let created = thread_index >= self.threads.len();
        while thread_index >= self.threads.len() {
            let offset = self.threads.last().map_or(0, ThreadRow::next_offset);
            debug!(thread = self.threads.len(), row_offset = offset, "new thread row");
            self.threads.push(ThreadRow::with_offset(offset));
        }
        created
    }

    /// Add one decoded frame to a thread. Returns whether the thread's row
    /// count changed, in which case the offsets of every later thread have
    /// been recomputed.
    pub fn append(&mut self, thread_index: usize, frame_number: i64, decoded: DecodedFrame) -> bool {
        self.ensure_thread(thread_index);
        let thread = &mut self.threads[thread_index];

        let grew = decoded.grew && decoded.row_count > thread.rows.len();
        if grew {
            debug!(
                thread = thread_index,
                rows = decoded.row_count,
                "thread gained depth rows"
            );
            thread.rows.resize_with(decoded.row_count, Vec::new);
        }

        for bar in decoded.bars {
            if let Some(row) = thread.rows.get_mut(bar.depth) {
                row.push(bar.interval);
            }
        }

        match thread.last_frame {
            Some(last) if frame_number < last => {
                debug!(
                    thread = thread_index,
                    frame = frame_number,
                    last_frame = last,
                    "frame arrived out of order, re-sorting rows"
                );
                for row in &mut thread.rows {
                    row.sort_by(Interval::cmp_by_time);
                }
            }
            _ => thread.last_frame = Some(frame_number),
        }

        if grew {
            self.recompute_offsets(thread_index + 1);
        }
        grew
    }

    /// Recompute `row_offset` for every thread from `first` onwards.
    fn recompute_offsets(&mut self, first: usize) {
        let mut offset = first
            .checked_sub(1)
            .and_then(|prev| self.threads.get(prev))
            .map_or(0, ThreadRow::next_offset);
        for thread in self.threads.iter_mut().skip(first) {
            thread.row_offset = offset;
            offset = thread.next_offset();
        }
    }

    /// Map a global row index to `(thread_index, depth)`. Separator rows and
    /// rows past the end map to `None`.
    pub fn locate(&self, global_row: usize) -> Option<(usize, usize)> {
        let mut found = None;
        for (thread_index, thread) in self.threads.iter().enumerate() {
            if thread.row_offset > global_row {
                break;
            }
            found = Some((thread_index, thread));
        }
        let (thread_index, thread) = found?;
        let depth = global_row - thread.row_offset;
        (depth < thread.rows.len()).then_some((thread_index, depth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::IntervalDecoder;
    use frame_timeline_protocol::{FrameData, FrameEvent};

    fn decode(index: &ThreadRowIndex, thread: usize, number: i64, frame: &FrameData) -> DecodedFrame {
        let rows = index.thread(thread).map_or(0, |t| t.rows.len());
        IntervalDecoder::new(thread, number, f64::NEG_INFINITY).decode(frame, rows)
    }

    fn nested(depth: usize, start: f64, end: f64) -> FrameData {
        let mut events = Vec::new();
        for c in 0..depth {
            events.push(FrameEvent::start(c, start + c as f64 * 0.001));
        }
        for c in (0..depth).rev() {
            events.push(FrameEvent::end(c, end - c as f64 * 0.001));
        }
        FrameData::new(start, end, events)
    }

    fn push(index: &mut ThreadRowIndex, thread: usize, number: i64, frame: &FrameData) -> bool {
        let decoded = decode(index, thread, number, frame);
        index.append(thread, number, decoded)
    }

    fn assert_offsets(index: &ThreadRowIndex) {
        for pair in index.threads().windows(2) {
            assert_eq!(pair[1].row_offset, pair[0].row_offset + pair[0].rows.len() + 1);
        }
    }

    fn assert_sorted(index: &ThreadRowIndex) {
        for thread in index.threads() {
            for row in &thread.rows {
                assert!(row.windows(2).all(|w| w[0].cmp_by_time(&w[1]).is_le()));
            }
        }
    }

    #[test]
    fn threads_created_lazily_with_offsets() {
        let mut index = ThreadRowIndex::new();
        push(&mut index, 0, 0, &nested(2, 0.0, 1.0));
        push(&mut index, 2, 0, &nested(1, 0.0, 1.0));
        assert_eq!(index.len(), 3);
        assert_eq!(index.threads()[0].row_offset, 0);
        assert_eq!(index.threads()[1].row_offset, 3);
        assert_eq!(index.threads()[2].row_offset, 4);
        assert_eq!(index.total_rows(), 6);
        assert_offsets(&index);
    }

    #[test]
    fn growth_shifts_later_threads() {
        let mut index = ThreadRowIndex::new();
        push(&mut index, 0, 0, &nested(1, 0.0, 1.0));
        push(&mut index, 1, 0, &nested(2, 0.0, 1.0));
        assert_eq!(index.threads()[1].row_offset, 2);

        assert!(push(&mut index, 0, 1, &nested(3, 1.0, 2.0)));
        assert_eq!(index.threads()[0].rows.len(), 3);
        assert_eq!(index.threads()[1].row_offset, 4);
        assert_offsets(&index);

        // Same depth again: no change.
        assert!(!push(&mut index, 0, 2, &nested(3, 2.0, 3.0)));
    }

    #[test]
    fn in_order_frames_stay_sorted() {
        let mut index = ThreadRowIndex::new();
        for n in 0..10 {
            push(&mut index, 0, n, &nested(3, n as f64, n as f64 + 0.9));
        }
        assert_sorted(&index);
        assert_eq!(index.thread(0).map(|t| t.last_frame), Some(Some(9)));
    }

    #[test]
    fn late_frame_forces_resort() {
        let mut index = ThreadRowIndex::new();
        push(&mut index, 0, 5, &nested(1, 5.0, 6.0));
        push(&mut index, 0, 3, &nested(1, 3.0, 4.0));

        let row = index.row(0, 0).map(|r| r.iter().map(|b| b.frame_number).collect::<Vec<_>>());
        assert_eq!(row, Some(vec![3, 5]));
        // The late frame does not move the high-water mark.
        assert_eq!(index.thread(0).and_then(|t| t.last_frame), Some(5));
        assert_sorted(&index);
    }

    #[test]
    fn locate_rows() {
        let mut index = ThreadRowIndex::new();
        push(&mut index, 0, 0, &nested(2, 0.0, 1.0));
        push(&mut index, 1, 0, &nested(1, 0.0, 1.0));
        assert_eq!(index.locate(0), Some((0, 0)));
        assert_eq!(index.locate(1), Some((0, 1)));
        // Separator.
        assert_eq!(index.locate(2), None);
        assert_eq!(index.locate(3), Some((1, 0)));
        assert_eq!(index.locate(4), None);
        assert_eq!(index.locate(100), None);
    }

    #[test]
    fn empty_index() {
        let index = ThreadRowIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.total_rows(), 0);
        assert!(index.frame_row().is_none());
        assert_eq!(index.locate(0), None);
    }
}
