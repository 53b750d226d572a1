//! # Rolling Series Module
//!
//! Fixed-capacity FIFO windows backing each chart, plus the auto-scaling
//! policy that keeps the y-axis fitted to what is currently visible.
//!
//! A window starts full of empty slots (`None`, distinct from zero). Every
//! accepted push evicts exactly one slot from the head, so the length never
//! changes and the tail is always the most recent value.

use std::collections::VecDeque;

/// Slots shown for slow metrics (heart rate, SpO2)
pub const SHORT_WINDOW_LEN: usize = 30;
/// Slots shown for the raw pulse waveform
pub const WAVEFORM_WINDOW_LEN: usize = 150;

/// Margin added around short-metric bounds
const SHORT_METRIC_MARGIN: f64 = 5.0;
/// Values required before short-metric bounds are recomputed
const SHORT_METRIC_MIN_VALUES: usize = 3;
/// Margin added around waveform bounds, in raw sensor counts
const WAVEFORM_PADDING: f64 = 300.0;
/// Waveform bounds are recomputed only once more than this many values exist
const WAVEFORM_MIN_VALUES: usize = 5;

/// How a window reacts to new values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalePolicy {
    /// Bounds never change after construction
    Fixed,
    /// Physiological metric: floored at zero, integer bounds with margin
    ShortMetric,
    /// Raw sensor counts: values under `noise_floor` are discarded
    Waveform { noise_floor: f64 },
}

/// Visible y-axis bounds of one chart
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScaleState {
    /// Bounds computed by auto-scaling; overrides everything else when set
    pub bounds: Option<(f64, f64)>,
    /// Range the axis should at least cover until bounds exist
    pub suggested: Option<(f64, f64)>,
}

pub trait ValueSliceExt {
    fn min_max_value(&self) -> Option<(f64, f64)>;
}

impl ValueSliceExt for &[f64] {
    fn min_max_value(&self) -> Option<(f64, f64)> {
        self.iter().fold(None, |acc, &value| match acc {
            None => Some((value, value)),
            Some((min, max)) => Some((min.min(value), max.max(value))),
        })
    }
}

pub struct SeriesWindow {
    slots: VecDeque<Option<f64>>,
    policy: ScalePolicy,
    scale: ScaleState,
    revision: u64,
}

impl SeriesWindow {
    /// A window always holds at least one slot
    pub fn new(capacity: usize, policy: ScalePolicy) -> Self {
        Self {
            slots: std::iter::repeat(None).take(capacity.max(1)).collect(),
            policy,
            scale: ScaleState::default(),
            revision: 0,
        }
    }

    /// Heart-rate style window: 30 slots, auto-scaled
    pub fn short_metric() -> Self {
        Self::new(SHORT_WINDOW_LEN, ScalePolicy::ShortMetric)
    }

    /// Waveform window: 150 slots, auto-scaled, noise floor applied
    pub fn waveform(noise_floor: f64) -> Self {
        Self::new(WAVEFORM_WINDOW_LEN, ScalePolicy::Waveform { noise_floor })
    }

    pub fn with_suggested_range(mut self, min: f64, max: f64) -> Self {
        self.scale.suggested = Some((min, max));
        self
    }

    /// Append a value, evicting the oldest slot.
    ///
    /// Returns true when the owning chart has to redraw. Waveform values
    /// below the noise floor are rejected before touching the buffer.
    pub fn push(&mut self, value: f64) -> bool {
        if let ScalePolicy::Waveform { noise_floor } = self.policy {
            if value < noise_floor {
                return false;
            }
        }

        self.slots.pop_front();
        self.slots.push_back(Some(value));
        self.rescale();
        self.revision += 1;
        true
    }

    fn rescale(&mut self) {
        let values = self.values();
        let Some((min, max)) = values.as_slice().min_max_value() else {
            return;
        };

        match self.policy {
            ScalePolicy::Fixed => {}
            ScalePolicy::ShortMetric => {
                if values.len() >= SHORT_METRIC_MIN_VALUES {
                    let lower = (min - SHORT_METRIC_MARGIN).floor().max(0.0);
                    let upper = (max + SHORT_METRIC_MARGIN).ceil();
                    self.scale.bounds = Some((lower, upper));
                }
            }
            ScalePolicy::Waveform { .. } => {
                if values.len() > WAVEFORM_MIN_VALUES {
                    self.scale.bounds = Some((min - WAVEFORM_PADDING, max + WAVEFORM_PADDING));
                }
            }
        }
    }

    /// Non-empty slots, oldest first
    pub fn values(&self) -> Vec<f64> {
        self.slots.iter().flatten().copied().collect()
    }

    /// Slot index paired with its value, skipping empty slots
    pub fn indexed_values(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|v| (i, v)))
    }

    #[cfg(test)]
    pub fn slots(&self) -> &VecDeque<Option<f64>> {
        &self.slots
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub fn latest(&self) -> Option<f64> {
        self.slots.back().copied().flatten()
    }

    #[cfg(test)]
    pub fn scale(&self) -> ScaleState {
        self.scale
    }

    /// Number of accepted pushes since construction
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Range the chart should draw.
    ///
    /// Computed bounds win. Otherwise the data range is widened to cover the
    /// suggested range, falling back to `(0, 1)` when there is nothing.
    pub fn display_range(&self) -> (f64, f64) {
        if let Some(bounds) = self.scale.bounds {
            return bounds;
        }

        let values = self.values();
        let data = values.as_slice().min_max_value();
        let (min, max) = match (data, self.scale.suggested) {
            (Some((lo, hi)), Some((s_lo, s_hi))) => (lo.min(s_lo), hi.max(s_hi)),
            (Some(range), None) | (None, Some(range)) => range,
            (None, None) => (0.0, 1.0),
        };

        if max > min {
            (min, max)
        } else {
            (min - 1.0, max + 1.0)
        }
    }
}
