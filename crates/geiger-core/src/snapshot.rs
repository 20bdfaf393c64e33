//! Point-in-time export of the readings for the web dashboard

use heapless::Vec;
use serde::Serialize;

use crate::config::{DAILY_BUCKETS, HOURLY_BUCKETS};
use crate::pipeline::SharedState;

/// JSON body served to the dashboard.
///
/// Rates are µSv/h, `cumulative` is mSv, `timestamp` is milliseconds of
/// uptime. Chart histories are ordered oldest → newest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSnapshot {
    pub current: f32,
    pub average: f32,
    pub maximum: f32,
    pub cumulative: f64,
    pub total_counts: u64,
    pub timestamp: u64,
    pub hourly: Vec<f32, HOURLY_BUCKETS>,
    pub daily: Vec<f32, DAILY_BUCKETS>,
}

impl DataSnapshot {
    /// Read straight from the shared state. Call with the gate held.
    pub fn capture(state: &SharedState, timestamp: u64) -> Self {
        Self {
            current: state.stats.current_rate,
            average: state.stats.average_rate,
            maximum: state.stats.max_rate,
            cumulative: state.stats.cumulative_dose,
            total_counts: state.stats.total_counts,
            timestamp,
            hourly: Vec::from_slice(state.hourly.buckets()).unwrap_or_default(),
            daily: Vec::from_slice(state.daily.buckets()).unwrap_or_default(),
        }
    }
}
