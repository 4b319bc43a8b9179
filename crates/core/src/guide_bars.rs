use frame_timeline_protocol::{GuideBar, GuideBarStyle};
use tracing::debug;

use crate::config::TimelineConfig;
use crate::format::{TimeUnit, format_time};
use crate::model::{Interval, first_reaching};
use crate::viewport::ViewWindow;

/// Pick a "nice" axis interval of the form `{1, 2, 5} × 10^k` close to
/// `delta`. Returns 0 for non-positive or non-finite input.
pub fn nice_interval(delta: f64) -> f64 {
    if !(delta.is_finite() && delta > 0.0) {
        return 0.0;
    }
    let l = (3.0 * delta.log10()).round() as i32;
    let interval = 10.0_f64.powi((f64::from(l) / 3.0).ceil() as i32);
    match l.rem_euclid(3) {
        1 => interval / 5.0,
        2 => interval / 2.0,
        _ => interval,
    }
}

/// Computes the vertical gridlines for a visible window.
#[derive(Debug, Clone)]
pub struct GuideBarPlanner {
    spacing_px: f64,
    label_gap_px: f64,
    frame_label_spacing_px: f64,
    time_unit: TimeUnit,
    show_units: bool,
}

impl Default for GuideBarPlanner {
    fn default() -> Self {
        Self::new(&TimelineConfig::default())
    }
}

impl GuideBarPlanner {
    pub fn new(config: &TimelineConfig) -> Self {
        Self {
            spacing_px: config.guide_spacing_px,
            label_gap_px: config.label_gap_px,
            frame_label_spacing_px: config.frame_label_spacing_px,
            time_unit: config.time_unit,
            show_units: config.show_units,
        }
    }

    /// Axis interval for the window's current scale.
    pub fn interval(&self, window: &ViewWindow) -> f64 {
        nice_interval(self.spacing_px * window.time_scale)
    }

    /// Plan the guide bars for `window`.
    ///
    /// When `frame_row` holds whole-frame markers, bars are anchored to
    /// frame boundaries (`#N`) with offsets from each frame start (`+t`)
    /// in between. Without usable frame markers, or when there would be
    /// too many frames to label, bars fall back to multiples of the
    /// interval from time zero.
    pub fn plan(&self, frame_row: Option<&[Interval]>, window: &ViewWindow) -> Vec<GuideBar> {
        let interval = self.interval(window);
        let mut bars = match frame_row {
            Some(row) if !row.is_empty() => self.frame_bars(row, window, interval),
            _ => Vec::new(),
        };
        if bars.is_empty() && interval > 0.0 {
            bars = self.absolute_bars(window, interval);
        }
        bars
    }

    fn frame_bars(&self, row: &[Interval], window: &ViewWindow, interval: f64) -> Vec<GuideBar> {
        let start_time = window.start;
        let end_time = window.end();
        let max_frames = (f64::from(window.width_px) / self.frame_label_spacing_px).max(0.0) as usize;
        // Empty frames are late arrivals clamped to the view start.
        let next_frame = |from: usize| {
            row.get(from..)
                .and_then(|rest| rest.iter().position(|bar| bar.is_frame() && bar.end > bar.start))
                .map(|pos| from + pos)
        };

        let mut bars: Vec<GuideBar> = Vec::new();
        let mut num_frames = 0;
        let mut cursor = next_frame(first_reaching(row, start_time));

        while let Some(idx) = cursor {
            let frame = &row[idx];
            if frame.start > end_time {
                break;
            }
            let frame_start = frame.start;

            if frame_start > start_time {
                if let Some(last) = bars.last_mut()
                    && window.duration_to_pixel(frame_start - last.height) < self.label_gap_px
                {
                    last.label.clear();
                }
                bars.push(GuideBar::new(
                    frame_start,
                    format!("#{}", frame.frame_number),
                    GuideBarStyle::Frame,
                ));
                num_frames += 1;
                if num_frames > max_frames {
                    debug!(max_frames, "too many frames to label, dropping frame guide bars");
                    return Vec::new();
                }
            }

            cursor = next_frame(idx + 1);
            // Up to the next frame, or to the right edge.
            let frame_width = match cursor {
                Some(next) => (row[next].start - frame_start).min(end_time - frame_start),
                None => end_time - frame_start,
            };

            if interval > 0.0 {
                let first = (((start_time - frame_start) / interval) as i64).max(1);
                let count = (frame_width / interval).round() as i64;
                for i in first..count {
                    let offset = i as f64 * interval;
                    let time = frame_start + offset;
                    if time < start_time || time > end_time {
                        continue;
                    }
                    let label = format!("+{}", self.format(offset));
                    bars.push(GuideBar::new(time, label, GuideBarStyle::Normal));
                }
            }
        }

        bars
    }

    fn absolute_bars(&self, window: &ViewWindow, interval: f64) -> Vec<GuideBar> {
        let first = ((window.start / interval) as i64).max(1);
        let count = (window.end() / interval).round() as i64;
        (first..count)
            .map(|i| i as f64 * interval)
            .filter(|&time| time >= window.start)
            .map(|time| GuideBar::new(time, self.format(time), GuideBarStyle::Frame))
            .collect()
    }

    fn format(&self, seconds: f64) -> String {
        format_time(seconds, self.time_unit, self.show_units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FRAME_COLLECTOR;

    fn frame(number: i64, start: f64, end: f64) -> Interval {
        Interval {
            start,
            end,
            collector_index: FRAME_COLLECTOR,
            thread_index: 0,
            frame_number: number,
        }
    }

    fn window(start: f64, width_px: i32) -> ViewWindow {
        ViewWindow {
            start,
            time_scale: 1e-4,
            width_px,
        }
    }

    fn near(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn mantissa_is_nice(value: f64) -> bool {
        let exp = value.log10().floor();
        let mantissa = value / 10.0_f64.powf(exp);
        [1.0, 2.0, 5.0, 10.0]
            .iter()
            .any(|m| (mantissa - m).abs() < 1e-9)
    }

    #[test]
    fn nice_interval_is_one_two_five() {
        let mut delta = 1e-9;
        while delta < 1e6 {
            let interval = nice_interval(delta);
            assert!(mantissa_is_nice(interval), "delta={delta} interval={interval}");
            // Never further than a factor ~2.5 from the request.
            assert!(interval / delta < 2.5 && delta / interval < 2.5);
            delta *= 1.37;
        }
    }

    #[test]
    fn nice_interval_values() {
        assert!(near(nice_interval(1.0), 1.0));
        assert!(near(nice_interval(0.015), 0.02));
        assert!(near(nice_interval(0.004), 0.005));
        assert!(near(nice_interval(0.0011), 0.001));
        assert!(near(nice_interval(300.0), 200.0));
        assert_eq!(nice_interval(0.0), 0.0);
        assert_eq!(nice_interval(-1.0), 0.0);
    }

    #[test]
    fn absolute_fallback_without_frames() {
        let planner = GuideBarPlanner::default();
        let bars = planner.plan(None, &window(0.0, 800));
        let heights: Vec<f64> = bars.iter().map(|b| b.height).collect();
        assert_eq!(bars.len(), 3);
        assert!(near(heights[0], 0.02) && near(heights[1], 0.04) && near(heights[2], 0.06));
        assert_eq!(bars[0].label, "20 ms");
        assert!(bars.iter().all(|b| b.style == GuideBarStyle::Frame));
    }

    #[test]
    fn anchored_to_frames() {
        let row = vec![frame(10, 0.0, 0.06), frame(11, 0.06, 0.12), frame(12, 0.12, 0.18)];
        let planner = GuideBarPlanner::default();
        let bars = planner.plan(Some(&row), &window(0.01, 900));

        let summary: Vec<(&str, GuideBarStyle)> =
            bars.iter().map(|b| (b.label.as_str(), b.style)).collect();
        assert_eq!(
            summary,
            vec![
                ("+20 ms", GuideBarStyle::Normal),
                ("+40 ms", GuideBarStyle::Normal),
                ("#11", GuideBarStyle::Frame),
                ("+20 ms", GuideBarStyle::Normal),
            ]
        );
        assert!(near(bars[2].height, 0.06));
        assert!(near(bars[3].height, 0.08));
        assert!(bars.iter().all(|b| b.height >= 0.01 && b.height <= 0.10));
    }

    #[test]
    fn empty_late_frame_does_not_cut_the_visible_frame() {
        // Frame 0 arrived late and was clamped to an empty span at 0.05.
        let row = vec![frame(1, 0.0, 0.1), frame(0, 0.05, 0.05), frame(2, 0.1, 0.2)];
        let planner = GuideBarPlanner::default();
        let bars = planner.plan(Some(&row), &window(0.05, 1100));

        let labels: Vec<&str> = bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["+60 ms", "+80 ms", "#2", "+20 ms", "+40 ms"]);
    }

    #[test]
    fn crowded_frame_label_is_dropped() {
        let row = vec![frame(1, 0.0, 0.04), frame(2, 0.04, 0.042), frame(3, 0.042, 0.1)];
        let planner = GuideBarPlanner::default();
        let bars = planner.plan(Some(&row), &window(0.01, 1000));

        let frames: Vec<&GuideBar> = bars
            .iter()
            .filter(|b| b.style == GuideBarStyle::Frame)
            .collect();
        assert_eq!(frames.len(), 2);
        assert!(near(frames[0].height, 0.04));
        assert!(frames[0].label.is_empty());
        assert_eq!(frames[1].label, "#3");
    }

    #[test]
    fn too_many_frames_falls_back() {
        let row: Vec<Interval> = (0..100)
            .map(|n| frame(n, n as f64 * 0.002, (n + 1) as f64 * 0.002))
            .collect();
        let planner = GuideBarPlanner::default();
        let bars = planner.plan(Some(&row), &window(0.0005, 800));
        assert_eq!(bars.len(), 3);
        assert!(bars.iter().all(|b| !b.label.starts_with('#')));
    }

    #[test]
    fn non_frame_bars_are_skipped() {
        let row = vec![
            frame(1, 0.0, 0.05),
            Interval {
                collector_index: 4,
                ..frame(1, 0.05, 0.055)
            },
            frame(2, 0.06, 0.12),
        ];
        let planner = GuideBarPlanner::default();
        let bars = planner.plan(Some(&row), &window(0.01, 900));
        let frames: Vec<&str> = bars
            .iter()
            .filter(|b| b.style == GuideBarStyle::Frame)
            .map(|b| b.label.as_str())
            .collect();
        assert_eq!(frames, vec!["#2"]);
    }
}
