//! Pipeline constants and tunables
//!
//! The constants describe the device as shipped (SBM-20 class tube on the
//! ESP32-S3 PCNT unit). [`PipelineConfig`] groups the ones that may be tuned
//! per build and is what the producer and consumer are constructed from.

use serde::{Deserialize, Serialize};

// ============================================================================
// Sampling cadence
// ============================================================================

/// How often the hardware counter is read
pub const POLL_INTERVAL_MS: u64 = 100;

/// Length of one per-second bucket
pub const BUCKET_INTERVAL_MS: u64 = 1000;

/// Sleep between producer iterations
pub const PRODUCER_LOOP_MS: u64 = 50;

/// Sleep between consumer iterations
pub const CONSUMER_LOOP_MS: u64 = 50;

/// Gate for once-per-second consumer sub-tasks (status line, exports)
pub const STATUS_INTERVAL_MS: u64 = 1000;

// ============================================================================
// Counter hardware
// ============================================================================

/// High limit of the PCNT unit. The unit clears itself when it gets there.
pub const PCNT_HIGH_LIMIT: u16 = 32767;

// ============================================================================
// Rate estimation
// ============================================================================

/// Number of one-second slots in the pulse history (one minute)
pub const SECOND_HISTORY_LEN: usize = 60;

/// Number of instantaneous dose-rate samples averaged for display
pub const SMOOTHING_WINDOW_LEN: usize = 5;

/// Smallest number of filled seconds the cold-start extrapolation divides by.
///
/// Caps the extrapolation multiplier at `SECOND_HISTORY_LEN / 5 = 12`. The
/// cost is an under-read during seconds 1 to 4 after boot or reset: with `n`
/// filled seconds the CPM reads `n / 5` of the true rate (20 % at one
/// second, 80 % at four) and is exact from the fifth second on.
pub const MIN_EXTRAPOLATION_SECS: usize = 5;

/// Counts per minute that correspond to 1 µSv/h for the fitted tube
pub const CONVERSION_FACTOR: f32 = 153.8;

/// Readings above this dose rate (µSv/h) never become the running maximum
pub const IMPLAUSIBLE_RATE_USV_H: f32 = 10_000.0;

// ============================================================================
// Chart aggregation
// ============================================================================

/// Hourly chart: 20 × 3-minute buckets
pub const HOURLY_WINDOW_SECS: u32 = 180;
pub const HOURLY_BUCKETS: usize = 20;

/// Daily chart: 24 × 1-hour buckets
pub const DAILY_WINDOW_SECS: u32 = 3600;
pub const DAILY_BUCKETS: usize = 24;

/// Headroom applied to the largest bucket when autoscaling a chart
pub const CHART_HEADROOM: f32 = 1.2;

/// Smallest chart scale ever reported
pub const CHART_MIN_SCALE: f32 = 1.0;

// ============================================================================
// Alarm
// ============================================================================

pub const ALARM_FREQ_LOW_HZ: u32 = 1000;
pub const ALARM_FREQ_HIGH_HZ: u32 = 1500;
pub const ALARM_TONE_MS: u64 = 200;
pub const ALARM_PAUSE_MS: u64 = 50;
pub const ALARM_DUTY_PCT: u8 = 50;

/// Tunable pipeline parameters.
///
/// `Default` yields the device constants above.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    pub poll_interval_ms: u64,
    pub bucket_interval_ms: u64,
    pub conversion_factor: f32,
    pub implausible_rate_usv_h: f32,
    pub min_extrapolation_secs: usize,
    pub hourly_window_secs: u32,
    pub daily_window_secs: u32,
    pub alarm_tone_ms: u64,
    pub alarm_pause_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: POLL_INTERVAL_MS,
            bucket_interval_ms: BUCKET_INTERVAL_MS,
            conversion_factor: CONVERSION_FACTOR,
            implausible_rate_usv_h: IMPLAUSIBLE_RATE_USV_H,
            min_extrapolation_secs: MIN_EXTRAPOLATION_SECS,
            hourly_window_secs: HOURLY_WINDOW_SECS,
            daily_window_secs: DAILY_WINDOW_SECS,
            alarm_tone_ms: ALARM_TONE_MS,
            alarm_pause_ms: ALARM_PAUSE_MS,
        }
    }
}
