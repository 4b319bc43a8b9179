use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::TimeUnit;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} is not finite")]
    NonFinite(&'static str),
    #[error("time scale must be positive, got {0}")]
    InvalidScale(f64),
}

/// Settings shared by every graph kind: how axis values are labelled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphState {
    pub time_unit: TimeUnit,
    pub show_units: bool,
}

/// Saved view of a timeline. Fields serialize in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineState {
    pub time_scale: f64,
    pub start_time: f64,
    pub lowest_start_time: f64,
    pub highest_end_time: f64,
    pub graph: GraphState,
}

impl TimelineState {
    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, StateError> {
        let state: Self = serde_json::from_str(text)?;
        state.validate()?;
        Ok(state)
    }

    pub fn validate(&self) -> Result<(), StateError> {
        let fields = [
            ("time_scale", self.time_scale),
            ("start_time", self.start_time),
            ("lowest_start_time", self.lowest_start_time),
            ("highest_end_time", self.highest_end_time),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(StateError::NonFinite(name));
            }
        }
        if self.time_scale <= 0.0 {
            return Err(StateError::InvalidScale(self.time_scale));
        }
        Ok(())
    }
}
