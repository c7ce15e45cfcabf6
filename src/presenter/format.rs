//! Display formatting for results

use serde::Serialize;
use std::fmt;

/// Confidence band used for colour coding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    /// High from 0.8, Medium from 0.6, Low below
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.8 {
            ConfidenceTier::High
        } else if confidence >= 0.6 {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfidenceTier::Low => "low",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::High => "high",
        };
        f.write_str(name)
    }
}

/// Format seconds as `m:ss.s`
///
/// Rounds to tenths first so 59.96 becomes `1:00.0`, never `0:60.0`.
/// Negative or non-finite input formats as `0:00.0`.
pub fn format_time(seconds: f64) -> String {
    let tenths = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 10.0).round() as u64
    } else {
        0
    };
    let mins = tenths / 600;
    let secs = (tenths % 600) as f64 / 10.0;
    format!("{}:{:04.1}", mins, secs)
}

/// Confidence as a percentage with one decimal, e.g. `87.0%`
pub fn format_percent(confidence: f64) -> String {
    format!("{:.1}%", confidence * 100.0)
}

/// Time axis labels at 0, 1/4, 1/2, 3/4 and the full duration
pub fn axis_labels(duration: f64) -> [String; 5] {
    [0.0, 0.25, 0.5, 0.75, 1.0].map(|fraction| format_time(duration * fraction))
}

/// Frequency axis labels, top to bottom
pub fn frequency_labels(max_khz: f64) -> [String; 5] {
    [1.0, 0.75, 0.5, 0.25, 0.0].map(|fraction| format!("{:.0} kHz", max_khz * fraction))
}
