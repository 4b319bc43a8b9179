use serde::{Deserialize, Serialize};

/// Exponential approach rate, per second, of speeds and eased values.
const EASING_RATE: f64 = 12.0;
/// Speeds below this snap to zero once their key is released.
const SPEED_CUTOFF: f64 = 0.2;
/// Pixels scrolled per second at unit scroll speed.
const SCROLL_RATE_PX: f64 = 300.0;
/// The start time snaps to its target once closer than this many pixels.
const START_SNAP_PX: f64 = 2.0;
/// The time scale snaps to its target once closer than this (absolute).
const SCALE_SNAP: f64 = 0.01;

/// Directional keys that drive continuous scrolling and zooming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Left,
    Right,
    /// Zoom in.
    Up,
    /// Zoom out.
    Down,
}

impl Key {
    fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Bitmask of currently held keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeldKeys(u8);

impl HeldKeys {
    pub fn press(&mut self, key: Key) {
        self.0 |= key.bit();
    }

    pub fn release(&mut self, key: Key) {
        self.0 &= !key.bit();
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.0 & key.bit() != 0
    }

    pub fn any(&self) -> bool {
        self.0 != 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// +1 when only `positive` is held, -1 when only `negative` is, else 0.
    fn axis(&self, positive: Key, negative: Key) -> i32 {
        i32::from(self.is_held(positive)) - i32::from(self.is_held(negative))
    }
}

/// The visible time window at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewWindow {
    /// Timestamp at the left edge, in seconds.
    pub start: f64,
    /// Seconds per pixel.
    pub time_scale: f64,
    pub width_px: i32,
}

impl ViewWindow {
    pub fn width(&self) -> f64 {
        f64::from(self.width_px) * self.time_scale
    }

    pub fn end(&self) -> f64 {
        self.start + self.width()
    }

    pub fn duration_to_pixel(&self, duration: f64) -> f64 {
        duration / self.time_scale
    }
}

/// Scroll position and zoom level of a timeline, eased toward targets set
/// by input.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportController {
    start_time: f64,
    target_start_time: f64,
    time_scale: f64,
    target_time_scale: f64,
    scroll_speed: f64,
    zoom_speed: f64,
    keys: HeldKeys,
    zoom_center: i32,
    width: i32,
}

impl ViewportController {
    pub fn new(time_scale: f64, width: i32) -> Self {
        Self {
            start_time: 0.0,
            target_start_time: 0.0,
            time_scale,
            target_time_scale: time_scale,
            scroll_speed: 0.0,
            zoom_speed: 0.0,
            keys: HeldKeys::default(),
            zoom_center: width / 2,
            width,
        }
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn target_start_time(&self) -> f64 {
        self.target_start_time
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    pub fn target_time_scale(&self) -> f64 {
        self.target_time_scale
    }

    pub fn scroll_speed(&self) -> f64 {
        self.scroll_speed
    }

    pub fn zoom_speed(&self) -> f64 {
        self.zoom_speed
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn keys(&self) -> HeldKeys {
        self.keys
    }

    pub fn window(&self) -> ViewWindow {
        ViewWindow {
            start: self.start_time,
            time_scale: self.time_scale,
            width_px: self.width,
        }
    }

    /// Time span covered by the full width.
    pub fn window_width(&self) -> f64 {
        f64::from(self.width) * self.time_scale
    }

    pub fn pixel_to_timestamp(&self, x: i32) -> f64 {
        self.start_time + f64::from(x) * self.time_scale
    }

    pub fn timestamp_to_pixel(&self, time: f64) -> i32 {
        ((time - self.start_time) / self.time_scale).round() as i32
    }

    pub fn duration_to_pixel(&self, duration: f64) -> f64 {
        duration / self.time_scale
    }

    pub fn set_width(&mut self, width: i32) {
        self.width = width;
        self.zoom_center = self.zoom_center.clamp(0, width.max(0));
    }

    /// Pixel that stays fixed while zooming with the keyboard.
    pub fn set_zoom_center(&mut self, x: i32) {
        self.zoom_center = x;
    }

    pub fn key_down(&mut self, key: Key) {
        self.keys.press(key);
    }

    pub fn key_up(&mut self, key: Key) {
        self.keys.release(key);
    }

    /// Jump both current and target values, stopping any motion.
    pub fn reset_targets(&mut self, start_time: f64, time_scale: f64) {
        self.start_time = start_time;
        self.target_start_time = start_time;
        self.time_scale = time_scale;
        self.target_time_scale = time_scale;
        self.scroll_speed = 0.0;
        self.zoom_speed = 0.0;
    }

    /// Ease toward a new left-edge timestamp.
    pub fn scroll_to(&mut self, start_time: f64) {
        self.target_start_time = start_time;
    }

    /// Shift the view immediately, keeping any pending easing distance.
    pub fn scroll_by(&mut self, delta: f64) {
        self.start_time += delta;
        self.target_start_time += delta;
    }

    /// Ease toward showing `time_width` seconds across the full width,
    /// keeping the timestamp under pixel `center_x` where it is.
    pub fn zoom_to(&mut self, time_width: f64, center_x: i32) {
        if self.width <= 0 || !(time_width.is_finite() && time_width > 0.0) {
            return;
        }
        let pivot = self.pixel_to_timestamp(center_x);
        self.target_time_scale = time_width / f64::from(self.width);
        self.target_start_time = pivot - f64::from(center_x) * self.target_time_scale;
    }

    pub fn is_animating(&self) -> bool {
        self.keys.any()
            || self.scroll_speed != 0.0
            || self.zoom_speed != 0.0
            || self.target_start_time != self.start_time
            || self.target_time_scale != self.time_scale
    }

    /// Advance by `dt` seconds. Returns whether another tick is needed.
    pub fn tick(&mut self, dt: f64) -> bool {
        let decay = (-EASING_RATE * dt).exp();

        accelerate(
            &mut self.scroll_speed,
            self.keys.axis(Key::Right, Key::Left),
            decay,
        );
        accelerate(&mut self.zoom_speed, self.keys.axis(Key::Up, Key::Down), decay);

        if self.zoom_speed != 0.0 {
            let width = self.window_width() * 0.5_f64.powf(self.zoom_speed * dt);
            self.zoom_to(width, self.zoom_center);
        }

        if self.scroll_speed != 0.0 {
            self.scroll_by(self.scroll_speed * SCROLL_RATE_PX * self.time_scale * dt);
        }

        if self.target_start_time != self.start_time {
            let dist = self.target_start_time - self.start_time;
            if dist.abs() < self.time_scale * START_SNAP_PX {
                self.start_time = self.target_start_time;
            } else {
                self.start_time += dist * (1.0 - decay);
            }
        }

        if self.target_time_scale != self.time_scale {
            let dist = self.target_time_scale - self.time_scale;
            if self.target_start_time == self.start_time && dist.abs() < SCALE_SNAP {
                self.time_scale = self.target_time_scale;
            } else {
                self.time_scale += dist * (1.0 - decay);
            }
        }

        self.is_animating()
    }
}

/// Held keys add one unit of speed per tick; reversing restarts from one
/// unit in the new direction. Released, the speed decays to zero.
fn accelerate(speed: &mut f64, direction: i32, decay: f64) {
    match direction.signum() {
        1 => {
            if *speed < 0.0 {
                *speed = 1.0;
            }
            *speed += 1.0;
        }
        -1 => {
            if *speed > 0.0 {
                *speed = -1.0;
            }
            *speed -= 1.0;
        }
        _ => {
            if *speed != 0.0 {
                *speed *= decay;
                if speed.abs() < SPEED_CUTOFF {
                    *speed = 0.0;
                }
            }
        }
    }
}
