use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::TimeUnit;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("{field} must be a positive number, got {value}")]
    NotPositive { field: &'static str, value: f64 },
}

/// Tunables for a timeline. Every field has a default, so a config file
/// only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Seconds per pixel when the timeline opens.
    pub initial_time_scale: f64,
    /// Desired distance between guide bars, in pixels.
    pub guide_spacing_px: f64,
    /// Frame labels closer than this drop the previous caption.
    pub label_gap_px: f64,
    /// One frame label is allowed per this many pixels of width.
    pub frame_label_spacing_px: f64,
    pub time_unit: TimeUnit,
    pub show_units: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            // 1 ms per 10 pixels.
            initial_time_scale: 1.0 / 10_000.0,
            guide_spacing_px: 150.0,
            label_gap_px: 30.0,
            frame_label_spacing_px: 100.0,
            time_unit: TimeUnit::Milliseconds,
            show_units: true,
        }
    }
}

impl TimelineConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("initial_time_scale", self.initial_time_scale),
            ("guide_spacing_px", self.guide_spacing_px),
            ("label_gap_px", self.label_gap_px),
            ("frame_label_spacing_px", self.frame_label_spacing_px),
        ];
        for (field, value) in fields {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = TimelineConfig::from_json(r#"{"guide_spacing_px": 80}"#).unwrap();
        assert_eq!(config.guide_spacing_px, 80.0);
        assert_eq!(config.label_gap_px, 30.0);
        assert_eq!(config.time_unit, TimeUnit::Milliseconds);
    }

    #[test]
    fn rejects_zero_scale() {
        let err = TimelineConfig::from_json(r#"{"initial_time_scale": 0}"#);
        assert!(matches!(
            err,
            Err(ConfigError::NotPositive {
                field: "initial_time_scale",
                ..
            })
        ));
    }

    #[test]
    fn rejects_bad_json() {
        assert!(matches!(
            TimelineConfig::from_json("{"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn unit_by_name() {
        let config = TimelineConfig::from_json(r#"{"time_unit": "Microseconds", "show_units": false}"#).unwrap();
        assert_eq!(config.time_unit, TimeUnit::Microseconds);
        assert!(!config.show_units);
    }
}
