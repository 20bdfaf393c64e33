//! Chart history aggregation
//!
//! Each chart on the dashboard shows a fixed number of time-weighted
//! averages. An [`IntervalAggregator`] integrates the dose rate over one
//! window, appends the average as a new bucket and keeps the buckets ordered
//! oldest → newest so they can be drawn and exported as-is.

use heapless::Vec;
use log::debug;

use crate::config::{CHART_HEADROOM, CHART_MIN_SCALE};

/// Time-weighted bucketed history with capacity `C`.
#[derive(Debug, Clone)]
pub struct IntervalAggregator<const C: usize> {
    window_ms: u64,
    buckets: Vec<f32, C>,
    /// Integral of rate over the open window, µSv/h × s
    accum_sum: f64,
    /// Time covered by the open window. Integer so window edges are exact.
    accum_elapsed_ms: u64,
    scale_max: f32,
}

impl<const C: usize> IntervalAggregator<C> {
    pub fn new(window_secs: u32) -> Self {
        Self {
            window_ms: u64::from(window_secs.max(1)) * 1000,
            buckets: Vec::new(),
            accum_sum: 0.0,
            accum_elapsed_ms: 0,
            scale_max: CHART_MIN_SCALE,
        }
    }

    /// Integrate `rate` over `dt_ms`.
    ///
    /// Returns the bucket value when this call closed a window.
    pub fn accumulate(&mut self, rate: f32, dt_ms: u64) -> Option<f32> {
        let rate = if rate.is_finite() { rate } else { 0.0 };

        self.accum_sum += f64::from(rate) * (dt_ms as f64 / 1000.0);
        self.accum_elapsed_ms = self.accum_elapsed_ms.saturating_add(dt_ms);

        if self.accum_elapsed_ms < self.window_ms {
            return None;
        }

        let value = (self.accum_sum / (self.accum_elapsed_ms as f64 / 1000.0)) as f32;
        self.accum_sum = 0.0;
        self.accum_elapsed_ms = 0;
        self.commit(value);

        debug!(
            "Chart bucket ({}s window): {:.3} µSv/h, scale {:.0}",
            self.window_ms / 1000,
            value,
            self.scale_max
        );

        Some(value)
    }

    fn commit(&mut self, value: f32) {
        if C == 0 {
            return;
        }
        if self.buckets.is_full() {
            self.buckets.remove(0);
        }
        // A slot is always free here: either the history was not full or
        // the oldest bucket was just evicted.
        let _ = self.buckets.push(value);
        self.recompute_scale();
    }

    fn recompute_scale(&mut self) {
        let peak = self.buckets.iter().copied().fold(0.0f32, f32::max);
        self.scale_max = libm::ceilf(peak * CHART_HEADROOM).max(CHART_MIN_SCALE);
    }

    /// Buckets ordered oldest → newest.
    pub fn buckets(&self) -> &[f32] {
        &self.buckets
    }

    /// Upper bound for drawing this chart.
    pub fn scale_max(&self) -> f32 {
        self.scale_max
    }

    /// Total span covered when the history is full, seconds.
    pub fn horizon_secs(&self) -> u64 {
        self.window_ms / 1000 * C as u64
    }

    /// Time already integrated into the open window.
    pub fn pending_elapsed_ms(&self) -> u64 {
        self.accum_elapsed_ms
    }

    pub const fn capacity(&self) -> usize {
        C
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.accum_sum = 0.0;
        self.accum_elapsed_ms = 0;
        self.scale_max = CHART_MIN_SCALE;
    }
}
