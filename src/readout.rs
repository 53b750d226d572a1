//! # Readout Formatting Module
//!
//! Display-only transforms applied to numeric metrics before they reach a
//! text widget. Non-positive values mean the sensor has no reading and are
//! shown as a placeholder rather than as zero.

/// Shown in place of a metric that has no reading
pub const PLACEHOLDER: &str = "--";

/// Confidence readout color class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    Good,
    Warning,
    Poor,
}

impl ConfidenceLevel {
    /// >= 80 good, >= 50 warning, everything else (negative included) poor
    pub fn classify(confidence: f64) -> Self {
        if confidence >= 80.0 {
            ConfidenceLevel::Good
        } else if confidence >= 50.0 {
            ConfidenceLevel::Warning
        } else {
            ConfidenceLevel::Poor
        }
    }
}

/// Render `value` with `format` only when it is a real reading
fn positive_or_placeholder(value: f64, format: impl Fn(f64) -> String) -> String {
    if value > 0.0 {
        format(value)
    } else {
        PLACEHOLDER.to_string()
    }
}

pub fn heart_rate(bpm: f64) -> String {
    positive_or_placeholder(bpm, |v| format!("{}", v.round() as i64))
}

pub fn spo2(percent: f64) -> String {
    positive_or_placeholder(percent, |v| format!("{:.1}", v))
}

pub fn hrv(rmssd_ms: f64) -> String {
    positive_or_placeholder(rmssd_ms, |v| format!("{}", v.round() as i64))
}

pub fn perfusion_index(pi: f64) -> String {
    positive_or_placeholder(pi, |v| format!("{:.2}%", v))
}

pub fn temperature(celsius: f64) -> String {
    positive_or_placeholder(celsius, |v| format!("{:.1}", v))
}

/// Confidence is always shown, whatever its value
pub fn confidence(value: f64) -> String {
    format!("{}%", value)
}
