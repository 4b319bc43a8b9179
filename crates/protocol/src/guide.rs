use serde::{Deserialize, Serialize};

/// How a vertical gridline should be painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GuideBarStyle {
    /// Regular gridline at a multiple of the axis interval.
    Normal,
    /// Gridline at a frame boundary.
    Frame,
}

/// A vertical gridline on the time axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideBar {
    /// Timestamp of the line, in seconds.
    pub height: f64,
    /// Caption; empty when the label was dropped to avoid overlap.
    pub label: String,
    pub style: GuideBarStyle,
}

impl GuideBar {
    pub fn new(height: f64, label: impl Into<String>, style: GuideBarStyle) -> Self {
        Self {
            height,
            label: label.into(),
            style,
        }
    }
}
