//! Running dose statistics

use log::warn;
use serde::Serialize;

use crate::config::PipelineConfig;

/// Current, average, maximum and cumulative readings.
///
/// Rates are µSv/h, the cumulative dose is mSv. `cumulative_dose` is kept in
/// `f64`: at 50 ms cycles an `f32` sum stops absorbing background-level
/// increments after a few days of uptime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RunningStats {
    pub current_rate: f32,
    pub average_rate: f32,
    pub max_rate: f32,
    pub cumulative_dose: f64,
    /// Pulses committed since start (or the last reset)
    pub total_counts: u64,
    /// Timestamp the statistics were started at, milliseconds
    pub start_ms: u64,
}

impl RunningStats {
    pub fn new(start_ms: u64) -> Self {
        Self {
            start_ms,
            ..Self::default()
        }
    }

    /// Milliseconds the statistics have been running at `now_ms`.
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.start_ms)
    }
}

/// Integrates the smoothed dose rate and maintains the derived statistics.
#[derive(Debug, Clone)]
pub struct DoseAccumulator {
    conversion_factor: f32,
    implausible_rate: f32,
    rejected_readings: u32,
}

impl DoseAccumulator {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            conversion_factor: config.conversion_factor,
            implausible_rate: config.implausible_rate_usv_h,
            rejected_readings: 0,
        }
    }

    /// Fold one cycle's reading into `stats`.
    ///
    /// `current_rate` is the smoothed dose rate, `dt_ms` the wall time since
    /// the previous cycle.
    pub fn update(&mut self, stats: &mut RunningStats, current_rate: f32, dt_ms: u64, now_ms: u64) {
        stats.current_rate = current_rate;

        let elapsed_min = stats.elapsed_ms(now_ms) as f64 / 60_000.0;
        if elapsed_min > 0.0 && self.conversion_factor > 0.0 {
            let average_cpm = stats.total_counts as f64 / elapsed_min;
            stats.average_rate = (average_cpm / f64::from(self.conversion_factor)) as f32;
        }

        if current_rate > self.implausible_rate {
            self.rejected_readings = self.rejected_readings.saturating_add(1);
            warn!(
                "Rejecting {:.2} µSv/h as maximum (ceiling {:.0})",
                current_rate, self.implausible_rate
            );
        } else if current_rate > stats.max_rate {
            stats.max_rate = current_rate;
        }

        if current_rate.is_finite() && current_rate > 0.0 {
            // µSv/h → µSv/s → µSv over dt → mSv
            let dt_secs = dt_ms as f64 / 1000.0;
            stats.cumulative_dose += f64::from(current_rate) / 3600.0 * dt_secs / 1000.0;
        }
    }

    /// Forget the rejected readings. The statistics themselves are restarted
    /// by [`SharedState::reset`](crate::pipeline::SharedState::reset).
    pub fn reset(&mut self) {
        self.rejected_readings = 0;
    }

    /// Readings refused as maximum since the last reset.
    pub fn rejected_readings(&self) -> u32 {
        self.rejected_readings
    }
}
