//! What the pipeline publishes to the screen

use core::fmt::Write;

use heapless::String;

use crate::dose::RunningStats;

/// Capacity of one formatted reading
pub const LABEL_LEN: usize = 16;

/// Shown when a reading does not fit its label
const OVERFLOW_TEXT: &str = "---";

/// The four numeric readouts of the main screen, two decimals each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayLabels {
    pub current: String<LABEL_LEN>,
    pub average: String<LABEL_LEN>,
    pub maximum: String<LABEL_LEN>,
    pub cumulative: String<LABEL_LEN>,
}

impl DisplayLabels {
    pub fn from_stats(stats: &RunningStats) -> Self {
        Self {
            current: format_reading(f64::from(stats.current_rate)),
            average: format_reading(f64::from(stats.average_rate)),
            maximum: format_reading(f64::from(stats.max_rate)),
            cumulative: format_reading(stats.cumulative_dose),
        }
    }
}

fn format_reading(value: f64) -> String<LABEL_LEN> {
    let mut label = String::new();
    if write!(label, "{:.2}", value).is_err() {
        label.clear();
        // Always fits
        let _ = label.push_str(OVERFLOW_TEXT);
    }
    label
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartId {
    /// 20 × 3 min
    Hourly,
    /// 24 × 1 h
    Daily,
}

/// Receiver of everything the consumer publishes each cycle.
pub trait DisplaySink {
    fn show_labels(&mut self, labels: &DisplayLabels);

    /// `values` are ordered oldest → newest and drawn against `0..=scale_max`.
    fn show_chart(&mut self, chart: ChartId, values: &[f32], scale_max: f32);
}
