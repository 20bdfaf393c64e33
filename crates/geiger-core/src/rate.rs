//! Counts-per-minute estimation and dose-rate smoothing

use crate::config::{PipelineConfig, SMOOTHING_WINDOW_LEN};
use crate::history::SecondHistory;

/// Moving average over the last `M` instantaneous dose-rate samples.
#[derive(Debug, Clone)]
pub struct SmoothingWindow<const M: usize = SMOOTHING_WINDOW_LEN> {
    samples: [f32; M],
    cursor: usize,
    filled: usize,
}

impl<const M: usize> Default for SmoothingWindow<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const M: usize> SmoothingWindow<M> {
    pub const fn new() -> Self {
        Self {
            samples: [0.0; M],
            cursor: 0,
            filled: 0,
        }
    }

    /// Push a sample and return the mean of the valid samples.
    pub fn push(&mut self, sample: f32) -> f32 {
        if M == 0 {
            return sample;
        }
        self.samples[self.cursor] = sample;
        self.cursor = (self.cursor + 1) % M;
        if self.filled < M {
            self.filled += 1;
        }
        self.mean()
    }

    /// Mean of the valid samples, 0 when empty.
    pub fn mean(&self) -> f32 {
        if self.filled == 0 {
            return 0.0;
        }
        // Slots are filled from index 0, so the valid ones are a prefix
        // until the window wraps for the first time.
        let sum: f32 = self.samples[..self.filled].iter().sum();
        sum / self.filled as f32
    }

    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

/// Output of one [`RateEstimator::estimate`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateEstimate {
    /// Counts per minute (extrapolated during the first minute)
    pub cpm: f32,
    /// Dose rate from `cpm` alone, µSv/h
    pub raw_rate: f32,
    /// Moving average of `raw_rate`, the value shown to the user
    pub smoothed_rate: f32,
}

/// Turns the per-second history into a calibrated, smoothed dose rate.
#[derive(Debug, Clone)]
pub struct RateEstimator {
    conversion_factor: f32,
    min_extrapolation_secs: usize,
    smoothing: SmoothingWindow,
}

impl RateEstimator {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            conversion_factor: config.conversion_factor,
            min_extrapolation_secs: config.min_extrapolation_secs.max(1),
            smoothing: SmoothingWindow::new(),
        }
    }

    /// Counts per minute over the history window.
    ///
    /// Before the window has been filled once the partial sum is scaled up
    /// to a full window, dividing by at least `min_extrapolation_secs` so the
    /// first seconds after boot cannot multiply a single pulse by 60.
    pub fn instantaneous_cpm<const N: usize>(&self, history: &SecondHistory<N>) -> f32 {
        let sum = history.sum() as f32;
        let valid = history.len();

        if valid == 0 {
            return 0.0;
        }
        if history.is_full() {
            return sum * (60.0 / N as f32);
        }

        let divisor = valid.max(self.min_extrapolation_secs.min(N));
        sum * (N as f32 / divisor as f32) * (60.0 / N as f32)
    }

    /// CPM → µSv/h
    pub fn cpm_to_dose_rate(&self, cpm: f32) -> f32 {
        if self.conversion_factor <= 0.0 {
            return 0.0;
        }
        cpm / self.conversion_factor
    }

    /// Push a raw dose rate into the smoothing window and return the average.
    pub fn smooth(&mut self, raw_rate: f32) -> f32 {
        self.smoothing.push(raw_rate)
    }

    /// Full estimation pass for one consumer cycle.
    pub fn estimate<const N: usize>(&mut self, history: &SecondHistory<N>) -> RateEstimate {
        let cpm = self.instantaneous_cpm(history);
        let raw_rate = self.cpm_to_dose_rate(cpm);
        let smoothed_rate = self.smooth(raw_rate);

        RateEstimate {
            cpm,
            raw_rate,
            smoothed_rate,
        }
    }

    pub fn reset(&mut self) {
        self.smoothing.clear();
    }
}
