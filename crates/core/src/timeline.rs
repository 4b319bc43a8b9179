use frame_timeline_protocol::{GuideBar, Renderer};
use tracing::{debug, trace};

use crate::config::TimelineConfig;
use crate::decoder::IntervalDecoder;
use crate::format::format_time;
use crate::guide_bars::GuideBarPlanner;
use crate::hit_test::HitTester;
use crate::index::ThreadRowIndex;
use crate::model::{Interval, first_reaching};
use crate::source::EventSource;
use crate::state::{GraphState, StateError, TimelineState};
use crate::viewport::{Key, ViewportController};

/// A live timeline of nested timing intervals across threads.
///
/// Owns the interval index, the viewport and the current guide bars.
/// Data comes in through [`Timeline::new_data`]; drawing goes out through
/// whatever [`Renderer`] the caller passes in.
#[derive(Debug, Clone)]
pub struct Timeline {
    config: TimelineConfig,
    planner: GuideBarPlanner,
    index: ThreadRowIndex,
    viewport: ViewportController,
    guide_bars: Vec<GuideBar>,
    height: i32,
    have_start_time: bool,
    lowest_start_time: f64,
    highest_end_time: f64,
    threads_changed: bool,
}

impl Timeline {
    /// Create a timeline of `width`×`height` pixels and load everything the
    /// source currently holds.
    pub fn new<S: EventSource + ?Sized>(source: &S, config: TimelineConfig, width: i32, height: i32) -> Self {
        let mut timeline = Self {
            planner: GuideBarPlanner::new(&config),
            viewport: ViewportController::new(config.initial_time_scale, width),
            config,
            index: ThreadRowIndex::new(),
            guide_bars: Vec::new(),
            height,
            have_start_time: false,
            lowest_start_time: 0.0,
            highest_end_time: 0.0,
            threads_changed: false,
        };

        let mut ranges = Vec::new();
        for thread_index in 0..source.num_threads() {
            if timeline.index.ensure_thread(thread_index) {
                timeline.threads_changed = true;
            }
            if let Some(name) = source.thread_name(thread_index) {
                timeline.index.set_label(thread_index, name);
            }
            if source.is_empty(thread_index) {
                continue;
            }
            let (Some(oldest), Some(latest)) = (
                source.oldest_frame_number(thread_index),
                source.latest_frame_number(thread_index),
            ) else {
                continue;
            };
            if let Some(frame) = source.frame(thread_index, oldest) {
                timeline.extend_start(frame.start);
            }
            if let Some(frame) = source.frame(thread_index, latest) {
                timeline.highest_end_time = timeline.highest_end_time.max(frame.end);
            }
            ranges.push((thread_index, oldest, latest));
        }

        let scale = timeline.viewport.time_scale();
        timeline.viewport.reset_targets(timeline.lowest_start_time, scale);

        for (thread_index, oldest, latest) in ranges {
            for frame_number in oldest..=latest {
                timeline.update_bars(source, thread_index, frame_number);
            }
        }

        debug!(
            threads = timeline.index.len(),
            rows = timeline.index.total_rows(),
            "timeline loaded"
        );
        timeline.update_guide_bars();
        timeline
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn index(&self) -> &ThreadRowIndex {
        &self.index
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn guide_bars(&self) -> &[GuideBar] {
        &self.guide_bars
    }

    pub fn width(&self) -> i32 {
        self.viewport.width()
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn lowest_start_time(&self) -> f64 {
        self.lowest_start_time
    }

    pub fn highest_end_time(&self) -> f64 {
        self.highest_end_time
    }

    /// Whether threads or rows were added since the last call.
    pub fn take_threads_changed(&mut self) -> bool {
        std::mem::take(&mut self.threads_changed)
    }

    fn extend_start(&mut self, start: f64) {
        if self.have_start_time {
            self.lowest_start_time = self.lowest_start_time.min(start);
        } else {
            self.have_start_time = true;
            self.lowest_start_time = start;
        }
    }

    /// Called once a frame of a thread becomes available. Frames may arrive
    /// out of order or not at all.
    pub fn new_data<S, R>(&mut self, source: &S, thread_index: usize, frame_number: i64, renderer: &mut R)
    where
        S: EventSource + ?Sized,
        R: Renderer + ?Sized,
    {
        if source.is_empty(thread_index) {
            trace!(thread = thread_index, frame = frame_number, "no data for thread");
            return;
        }
        let Some(frame) = source.frame(thread_index, frame_number) else {
            trace!(thread = thread_index, frame = frame_number, "frame not available");
            return;
        };
        let (frame_start, frame_end) = (frame.start, frame.end);

        if !self.have_start_time {
            self.viewport.scroll_by(frame_start - self.viewport.start_time());
        }
        self.extend_start(frame_start);
        self.highest_end_time = self.highest_end_time.max(frame_end);

        if self.index.ensure_thread(thread_index) {
            self.threads_changed = true;
        }

        if self.update_bars(source, thread_index, frame_number) {
            self.threads_changed = true;
            self.update_guide_bars();
            self.force_redraw(source, renderer);
        } else {
            let window = self.viewport.window();
            if frame_end >= window.start && frame_start <= window.end() {
                self.update_guide_bars();
                renderer.begin();
                self.draw_thread(source, thread_index, frame_start, frame_end, renderer);
                renderer.end();
            }
        }
    }

    /// Decode one frame into the index. Returns whether the thread's row
    /// count changed.
    fn update_bars<S: EventSource + ?Sized>(&mut self, source: &S, thread_index: usize, frame_number: i64) -> bool {
        let Some(frame) = source.frame(thread_index, frame_number) else {
            return false;
        };
        self.index.ensure_thread(thread_index);
        if let Some(name) = source.thread_name(thread_index) {
            self.index.set_label(thread_index, name);
        }
        let existing_rows = self.index.thread(thread_index).map_or(0, |t| t.rows.len());
        let decoded =
            IntervalDecoder::new(thread_index, frame_number, self.viewport.start_time()).decode(frame, existing_rows);
        self.index.append(thread_index, frame_number, decoded)
    }

    /// Recompute the guide bars for the current window.
    pub fn update_guide_bars(&mut self) {
        let window = self.viewport.window();
        self.guide_bars = self
            .planner
            .plan(self.index.frame_row().map(Vec::as_slice), &window);
    }

    /// Resize the drawing area, redrawing if anything changed.
    pub fn changed_size<S, R>(&mut self, width: i32, height: i32, source: &S, renderer: &mut R)
    where
        S: EventSource + ?Sized,
        R: Renderer + ?Sized,
    {
        if width != self.viewport.width() || height != self.height {
            self.viewport.set_width(width);
            self.height = height;
            self.update_guide_bars();
            self.force_redraw(source, renderer);
        }
    }

    /// Redraw everything: guide bars, every row of every thread and the
    /// separators between threads.
    pub fn force_redraw<S, R>(&self, source: &S, renderer: &mut R)
    where
        S: EventSource + ?Sized,
        R: Renderer + ?Sized,
    {
        renderer.clear();
        renderer.begin();

        let width = self.viewport.width();
        for bar in &self.guide_bars {
            let x = self.viewport.timestamp_to_pixel(bar.height);
            if x > 0 && x < width - 1 {
                renderer.draw_guide_bar(x, bar.style);
            }
        }

        let window = self.viewport.window();
        let mut num_rows = 0;
        for (thread_index, thread) in self.index.threads().iter().enumerate() {
            for depth in 0..thread.rows.len() {
                self.draw_row(source, thread_index, depth, window.start, window.end(), renderer);
                num_rows += 1;
            }
            renderer.draw_separator(num_rows);
            num_rows += 1;
        }

        renderer.end();
    }

    /// Redraw part of one global row, between two pixel columns.
    pub fn redraw_region<S, R>(&self, source: &S, row: usize, from_x: i32, to_x: i32, renderer: &mut R)
    where
        S: EventSource + ?Sized,
        R: Renderer + ?Sized,
    {
        let window = self.viewport.window();
        let start = window.start.max(self.viewport.pixel_to_timestamp(from_x));
        let end = window.end().min(self.viewport.pixel_to_timestamp(to_x));

        renderer.begin();
        if let Some((thread_index, depth)) = self.index.locate(row) {
            self.draw_row(source, thread_index, depth, start, end, renderer);
        }
        renderer.end();
    }

    fn draw_thread<S, R>(&self, source: &S, thread_index: usize, start: f64, end: f64, renderer: &mut R)
    where
        S: EventSource + ?Sized,
        R: Renderer + ?Sized,
    {
        if let Some(thread) = self.index.thread(thread_index) {
            for depth in 0..thread.rows.len() {
                self.draw_row(source, thread_index, depth, start, end, renderer);
            }
        }
    }

    /// Draw the bars of one row overlapping `[start, end]`. The frame of
    /// the first visible bar is always drawn completely.
    fn draw_row<S, R>(&self, source: &S, thread_index: usize, depth: usize, start: f64, end: f64, renderer: &mut R)
    where
        S: EventSource + ?Sized,
        R: Renderer + ?Sized,
    {
        let Some(thread) = self.index.thread(thread_index) else {
            return;
        };
        let Some(row) = thread.rows.get(depth) else {
            return;
        };
        let first = first_reaching(row, start);
        let Some(frame_number) = row.get(first).map(|bar| bar.frame_number) else {
            return;
        };
        let global_row = thread.row_offset + depth;
        let width = self.viewport.width();

        for bar in &row[first..] {
            if bar.start > end && bar.frame_number != frame_number {
                break;
            }
            let from_x = self.viewport.timestamp_to_pixel(bar.start);
            let to_x = self.viewport.timestamp_to_pixel(bar.end);
            if to_x < 0 || to_x <= from_x || from_x >= width {
                continue;
            }
            if bar.is_frame() {
                let label = format!("Frame {}", bar.frame_number);
                renderer.draw_bar(global_row, from_x, to_x, bar.collector_index, &label);
            } else {
                let label = source.collector_name(bar.collector_index).unwrap_or_default();
                renderer.draw_bar(global_row, from_x, to_x, bar.collector_index, label);
            }
        }
    }

    /// Advance the viewport animation by `dt` seconds and redraw. Returns
    /// whether the caller should keep ticking.
    pub fn animate<S, R>(&mut self, dt: f64, source: &S, renderer: &mut R) -> bool
    where
        S: EventSource + ?Sized,
        R: Renderer + ?Sized,
    {
        let animating = self.viewport.tick(dt);
        self.update_guide_bars();
        self.force_redraw(source, renderer);
        animating
    }

    pub fn key_down(&mut self, key: Key) {
        self.viewport.key_down(key);
    }

    pub fn key_up(&mut self, key: Key) {
        self.viewport.key_up(key);
    }

    pub fn set_zoom_center(&mut self, x: i32) {
        self.viewport.set_zoom_center(x);
    }

    /// Ease toward a window `time_width` seconds wide, pivoting on pixel `x`.
    pub fn zoom_to(&mut self, time_width: f64, x: i32) {
        self.viewport.zoom_to(time_width, x);
    }

    /// Ease toward a new left edge.
    pub fn scroll_to(&mut self, start_time: f64) {
        self.viewport.scroll_to(start_time);
    }

    /// The interval drawn at pixel `x` of global row `row`.
    pub fn find_bar(&self, row: usize, x: i32) -> Option<Interval> {
        HitTester::new(&self.index).find(&self.viewport.window(), row, x)
    }

    /// Tooltip text for the bar under the cursor, or an empty string.
    pub fn bar_tooltip<S: EventSource + ?Sized>(&self, source: &S, row: usize, x: i32) -> String {
        let Some(bar) = self.find_bar(row, x) else {
            return String::new();
        };
        if !source.has_collector(bar.collector_index) {
            return String::new();
        }
        let name = source.collector_fullname(bar.collector_index).unwrap_or_default();
        let duration = format_time(bar.duration(), self.config.time_unit, self.config.show_units);
        format!("{name} ({duration})")
    }

    pub fn save_state(&self) -> TimelineState {
        TimelineState {
            time_scale: self.viewport.time_scale(),
            start_time: self.viewport.start_time(),
            lowest_start_time: self.lowest_start_time,
            highest_end_time: self.highest_end_time,
            graph: GraphState {
                time_unit: self.config.time_unit,
                show_units: self.config.show_units,
            },
        }
    }

    /// Restore a saved view. Animation targets jump to the loaded values and
    /// any scroll or zoom motion stops.
    pub fn restore_state<S, R>(&mut self, state: &TimelineState, source: &S, renderer: &mut R) -> Result<(), StateError>
    where
        S: EventSource + ?Sized,
        R: Renderer + ?Sized,
    {
        state.validate()?;
        self.viewport.reset_targets(state.start_time, state.time_scale);
        self.lowest_start_time = state.lowest_start_time;
        self.highest_end_time = state.highest_end_time;
        self.have_start_time = true;
        self.config.time_unit = state.graph.time_unit;
        self.config.show_units = state.graph.show_units;
        self.planner = GuideBarPlanner::new(&self.config);
        debug!(
            start_time = state.start_time,
            time_scale = state.time_scale,
            "restored timeline view"
        );
        self.update_guide_bars();
        self.force_redraw(source, renderer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use frame_timeline_protocol::{CommandRecorder, FrameData, FrameEvent, NullRenderer, RenderCommand};

    fn source() -> MemorySource {
        let mut source = MemorySource::new();
        source.define_collector(1, "Draw", Some(0));
        source.define_collector(2, "Cull", Some(1));
        source.add_thread("Main");
        source
    }

    fn frame(start: f64) -> FrameData {
        FrameData::new(
            start,
            start + 0.010,
            vec![
                FrameEvent::start(0, start),
                FrameEvent::start(1, start + 0.001),
                FrameEvent::start(2, start + 0.002),
                FrameEvent::end(2, start + 0.004),
                FrameEvent::end(1, start + 0.008),
                FrameEvent::end(0, start + 0.010),
            ],
        )
    }

    #[test]
    fn loads_existing_frames() {
        let mut src = source();
        for n in 0..3 {
            src.insert_frame(0, n, frame(n as f64 * 0.010));
        }
        let timeline = Timeline::new(&src, TimelineConfig::default(), 800, 200);
        assert_eq!(timeline.index().len(), 1);
        assert_eq!(timeline.index().threads()[0].rows.len(), 3);
        assert_eq!(timeline.index().threads()[0].label, "Main");
        assert_eq!(timeline.lowest_start_time(), 0.0);
        assert!((timeline.highest_end_time() - 0.03).abs() < 1e-12);
        assert!(!timeline.guide_bars().is_empty());
    }

    #[test]
    fn new_data_grows_rows_and_redraws_everything() {
        let mut src = source();
        let mut timeline = Timeline::new(&src, TimelineConfig::default(), 800, 200);
        src.insert_frame(0, 0, frame(1.0));

        let mut rec = CommandRecorder::new();
        timeline.new_data(&src, 0, 0, &mut rec);

        assert!(timeline.take_threads_changed());
        assert_eq!(rec.commands.first(), Some(&RenderCommand::Clear));
        assert!(rec.commands.contains(&RenderCommand::DrawSeparator { row: 3 }));
        // The first frame moves the view to where the data is.
        assert_eq!(timeline.viewport().start_time(), 1.0);
        assert_eq!(rec.bars().count(), 3);
    }

    #[test]
    fn same_depth_frame_draws_only_its_thread() {
        let mut src = source();
        src.insert_frame(0, 0, frame(0.0));
        let mut timeline = Timeline::new(&src, TimelineConfig::default(), 800, 200);
        src.insert_frame(0, 1, frame(0.010));

        let mut rec = CommandRecorder::new();
        timeline.new_data(&src, 0, 1, &mut rec);
        assert_eq!(rec.commands.first(), Some(&RenderCommand::Begin));
        assert!(!rec.commands.contains(&RenderCommand::Clear));
        assert!(rec.bars().count() >= 3);
    }

    #[test]
    fn missing_data_is_ignored() {
        let src = source();
        let mut timeline = Timeline::new(&src, TimelineConfig::default(), 800, 200);
        let mut rec = CommandRecorder::new();
        timeline.new_data(&src, 0, 42, &mut rec);
        timeline.new_data(&src, 9, 0, &mut rec);
        assert!(rec.commands.is_empty());
        // One empty thread: just its separator.
        assert_eq!(timeline.index().total_rows(), 1);
    }

    #[test]
    fn late_frame_left_of_view_keeps_visible_bars() {
        let mut src = source();
        src.insert_frame(0, 1, frame(0.010));
        src.insert_frame(0, 2, frame(0.020));
        let mut timeline = Timeline::new(&src, TimelineConfig::default(), 800, 200);
        timeline.scroll_to(0.015);
        while timeline.animate(0.05, &src, &mut NullRenderer) {}
        assert_eq!(timeline.viewport().start_time(), 0.015);

        // Entirely before the view start, so every start is clamped.
        src.insert_frame(0, 0, frame(0.0));
        timeline.new_data(&src, 0, 0, &mut NullRenderer);

        for row in &timeline.index().threads()[0].rows {
            assert!(row.iter().all(|bar| bar.start <= bar.end), "{row:?}");
        }
        let mut rec = CommandRecorder::new();
        timeline.force_redraw(&src, &mut rec);
        let frames: Vec<(usize, i32, i32, usize)> = rec.bars().filter(|bar| bar.0 == 0).collect();
        assert_eq!(frames, vec![(0, -50, 50, 0), (0, 50, 150, 0)]);
    }

    #[test]
    fn frame_bars_are_labelled() {
        let mut src = source();
        src.insert_frame(0, 7, frame(0.0));
        let timeline = Timeline::new(&src, TimelineConfig::default(), 800, 200);
        let mut rec = CommandRecorder::new();
        timeline.force_redraw(&src, &mut rec);

        let labels: Vec<&str> = rec
            .commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::DrawBar { label, .. } => Some(label.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["Frame 7", "Draw", "Cull"]);
        assert_eq!(rec.commands.last(), Some(&RenderCommand::End));
    }

    #[test]
    fn tooltip_shows_fullname_and_duration() {
        let mut src = source();
        src.insert_frame(0, 0, frame(0.0));
        let timeline = Timeline::new(&src, TimelineConfig::default(), 800, 200);
        // 0.1 ms per pixel: Cull spans pixels 20..40 on row 2.
        assert_eq!(timeline.bar_tooltip(&src, 2, 30), "Draw:Cull (2 ms)");
        assert_eq!(timeline.bar_tooltip(&src, 2, 50), "");
        assert_eq!(timeline.bar_tooltip(&src, 3, 30), "");
    }

    #[test]
    fn animation_settles() {
        let mut src = source();
        src.insert_frame(0, 0, frame(0.0));
        let mut timeline = Timeline::new(&src, TimelineConfig::default(), 800, 200);
        timeline.key_down(Key::Right);
        assert!(timeline.animate(0.016, &src, &mut NullRenderer));
        timeline.key_up(Key::Right);

        let mut ticks = 0;
        while timeline.animate(0.016, &src, &mut NullRenderer) {
            ticks += 1;
            assert!(ticks < 1000);
        }
        assert!(timeline.viewport().start_time() > 0.0);
        assert_eq!(timeline.viewport().scroll_speed(), 0.0);
    }

    #[test]
    fn restore_resets_targets_and_speeds() {
        let mut src = source();
        src.insert_frame(0, 0, frame(0.0));
        let mut timeline = Timeline::new(&src, TimelineConfig::default(), 800, 200);
        timeline.key_down(Key::Up);
        timeline.animate(0.016, &src, &mut NullRenderer);
        timeline.key_up(Key::Up);
        timeline.scroll_to(5.0);

        let mut state = timeline.save_state();
        state.start_time = 0.002;
        state.time_scale = 0.00005;

        let mut rec = CommandRecorder::new();
        timeline.restore_state(&state, &src, &mut rec).unwrap();
        let vp = timeline.viewport();
        assert_eq!(vp.start_time(), 0.002);
        assert_eq!(vp.target_start_time(), 0.002);
        assert_eq!(vp.time_scale(), 0.00005);
        assert_eq!(vp.target_time_scale(), 0.00005);
        assert_eq!(vp.zoom_speed(), 0.0);
        assert!(!vp.is_animating());
        assert_eq!(rec.commands.first(), Some(&RenderCommand::Clear));
        assert_eq!(timeline.save_state(), state);
    }

    #[test]
    fn resize_redraws_once() {
        let src = source();
        let mut timeline = Timeline::new(&src, TimelineConfig::default(), 800, 200);
        let mut rec = CommandRecorder::new();
        timeline.changed_size(800, 200, &src, &mut rec);
        assert!(rec.commands.is_empty());
        timeline.changed_size(1000, 200, &src, &mut rec);
        assert_eq!(rec.commands.first(), Some(&RenderCommand::Clear));
        assert_eq!(timeline.width(), 1000);
    }

    #[test]
    fn redraw_region_limits_to_row() {
        let mut src = source();
        src.insert_frame(0, 0, frame(0.0));
        let timeline = Timeline::new(&src, TimelineConfig::default(), 800, 200);
        let mut rec = CommandRecorder::new();
        timeline.redraw_region(&src, 1, 0, 100, &mut rec);
        let rows: Vec<usize> = rec.bars().map(|(row, ..)| row).collect();
        assert_eq!(rows, vec![1]);
    }
}
