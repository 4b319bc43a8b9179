use serde::{Deserialize, Serialize};

/// Unit used for guide bar labels and tooltips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeUnit {
    Seconds,
    #[default]
    Milliseconds,
    Microseconds,
}

impl TimeUnit {
    fn factor(self) -> f64 {
        match self {
            Self::Seconds => 1.0,
            Self::Milliseconds => 1_000.0,
            Self::Microseconds => 1_000_000.0,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Self::Seconds => "s",
            Self::Milliseconds => "ms",
            Self::Microseconds => "µs",
        }
    }
}

/// Format a time value given in seconds, e.g. `16.7 ms`.
///
/// Precision shrinks as the magnitude grows so labels stay short, and
/// trailing zeros are trimmed.
pub fn format_time(seconds: f64, unit: TimeUnit, show_units: bool) -> String {
    let value = seconds * unit.factor();
    let abs = value.abs();
    let text = if abs >= 100.0 {
        format!("{value:.0}")
    } else if abs >= 10.0 {
        trim_zeros(format!("{value:.1}"))
    } else if abs >= 1.0 {
        trim_zeros(format!("{value:.2}"))
    } else {
        trim_zeros(format!("{value:.3}"))
    };
    // "-0" reads oddly on an axis.
    let text = if text == "-0" { "0".to_string() } else { text };
    if show_units {
        format!("{text} {}", unit.suffix())
    } else {
        text
    }
}

fn trim_zeros(mut s: String) -> String {
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}
