//! Producer and consumer cycle drivers
//!
//! The producer owns the pulse counter and feeds the per-second history. The
//! consumer turns the history into dose readings, chart buckets and alarm
//! decisions. Everything both sides touch lives in one [`SharedState`] behind
//! a [`SharedGate`]; each side keeps the bookkeeping only it needs.

use heapless::Vec;
use log::{debug, info};

use crate::alarm::{AlarmConfig, AlarmDecision, AlarmEvaluator, AlarmOutput};
use crate::bucketizer::SecondBucketizer;
use crate::config::{DAILY_BUCKETS, HOURLY_BUCKETS, PipelineConfig};
use crate::counter::PulseCounter;
use crate::display::{ChartId, DisplayLabels, DisplaySink};
use crate::dose::{DoseAccumulator, RunningStats};
use crate::gate::SharedStateGate;
use crate::history::SecondHistory;
use crate::interval::IntervalAggregator;
use crate::rate::RateEstimator;

pub type HourlyAggregator = IntervalAggregator<HOURLY_BUCKETS>;
pub type DailyAggregator = IntervalAggregator<DAILY_BUCKETS>;

/// State shared between the producer and the consumer.
#[derive(Debug, Clone)]
pub struct SharedState {
    pub history: SecondHistory,
    pub stats: RunningStats,
    pub hourly: HourlyAggregator,
    pub daily: DailyAggregator,
    /// Bumped by every [`reset`](Self::reset)
    pub generation: u32,
}

impl SharedState {
    pub fn new(config: &PipelineConfig, start_ms: u64) -> Self {
        Self {
            history: SecondHistory::new(),
            stats: RunningStats::new(start_ms),
            hourly: HourlyAggregator::new(config.hourly_window_secs),
            daily: DailyAggregator::new(config.daily_window_secs),
            generation: 0,
        }
    }

    /// Commit one finished second.
    pub fn record_second(&mut self, pulses: u32) {
        self.history.push(pulses);
        self.stats.total_counts = self.stats.total_counts.saturating_add(u64::from(pulses));
    }

    /// Drop all readings and chart history, restarting at `now_ms`.
    pub fn reset(&mut self, now_ms: u64) {
        self.history.clear();
        self.stats = RunningStats::new(now_ms);
        self.hourly.clear();
        self.daily.clear();
        self.generation = self.generation.wrapping_add(1);
    }
}

pub type SharedGate = SharedStateGate<SharedState>;

/// Sampling side of the pipeline.
pub struct Producer<P: PulseCounter> {
    counter: P,
    bucketizer: SecondBucketizer,
    /// Reset generation the bucket in progress belongs to
    generation: u32,
}

impl<P: PulseCounter> Producer<P> {
    /// Take ownership of `counter`, clearing it.
    pub fn new(mut counter: P, config: &PipelineConfig, now_ms: u64) -> Self {
        counter.reset();
        let mut bucketizer = SecondBucketizer::new(config, now_ms);
        bucketizer.sync(&mut counter, now_ms);

        Self {
            counter,
            bucketizer,
            generation: 0,
        }
    }

    /// Run one producer iteration.
    ///
    /// The counter is polled without holding the gate; the gate is taken only
    /// to commit a finished second, which is also returned. A second that
    /// started before a reset of the shared state is dropped instead.
    pub async fn step(&mut self, gate: &SharedGate, now_ms: u64) -> Option<u32> {
        let pulses = self.bucketizer.tick(&mut self.counter, now_ms)?;
        let generation = self.generation;
        let current = gate
            .with_lock(|state| {
                if state.generation == generation {
                    state.record_second(pulses);
                }
                state.generation
            })
            .await;

        if current != generation {
            debug!("Dropped {} pulses counted before a reset", pulses);
            self.generation = current;
            return None;
        }
        Some(pulses)
    }

    /// Polls dropped because the counter went backwards.
    pub fn clamped_reads(&self) -> u32 {
        self.bucketizer.clamped_reads()
    }
}

/// Copy of a chart's buckets and scale taken under the gate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeries<const C: usize> {
    pub values: Vec<f32, C>,
    pub scale_max: f32,
}

impl<const C: usize> ChartSeries<C> {
    pub fn from_aggregator(chart: &IntervalAggregator<C>) -> Self {
        Self {
            values: Vec::from_slice(chart.buckets()).unwrap_or_default(),
            scale_max: chart.scale_max(),
        }
    }
}

/// Everything one consumer cycle produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub stats: RunningStats,
    pub cpm: f32,
    /// Unsmoothed dose rate, µSv/h
    pub raw_rate: f32,
    pub alarm: AlarmDecision,
    pub hourly: ChartSeries<HOURLY_BUCKETS>,
    pub daily: ChartSeries<DAILY_BUCKETS>,
    /// Bucket closed on the hourly chart during this cycle
    pub hourly_committed: Option<f32>,
    /// Bucket closed on the daily chart during this cycle
    pub daily_committed: Option<f32>,
}

impl CycleReport {
    /// Push labels and both charts to `sink`.
    pub fn publish<S: DisplaySink + ?Sized>(&self, sink: &mut S) {
        sink.show_labels(&DisplayLabels::from_stats(&self.stats));
        sink.show_chart(ChartId::Hourly, &self.hourly.values, self.hourly.scale_max);
        sink.show_chart(ChartId::Daily, &self.daily.values, self.daily.scale_max);
    }
}

/// Statistics side of the pipeline.
pub struct Consumer {
    rate: RateEstimator,
    dose: DoseAccumulator,
    alarm: AlarmEvaluator,
    last_cycle_ms: u64,
}

impl Consumer {
    pub fn new(config: &PipelineConfig, now_ms: u64) -> Self {
        Self {
            rate: RateEstimator::new(config),
            dose: DoseAccumulator::new(config),
            alarm: AlarmEvaluator::new(config),
            last_cycle_ms: now_ms,
        }
    }

    /// Run one consumer iteration.
    ///
    /// Rate estimation, dose integration and both chart aggregators are
    /// updated under a single lock. The alarm output is driven afterwards
    /// from the copied readings.
    pub async fn step<O: AlarmOutput>(
        &mut self,
        gate: &SharedGate,
        now_ms: u64,
        alarm_config: &AlarmConfig,
        output: &mut O,
    ) -> CycleReport {
        let dt_ms = now_ms.saturating_sub(self.last_cycle_ms);
        self.last_cycle_ms = now_ms;

        let rate = &mut self.rate;
        let dose = &mut self.dose;
        let (estimate, stats, hourly, daily, hourly_committed, daily_committed) = gate
            .with_lock(|state| {
                let estimate = rate.estimate(&state.history);
                dose.update(&mut state.stats, estimate.smoothed_rate, dt_ms, now_ms);

                let hourly_committed = state.hourly.accumulate(estimate.smoothed_rate, dt_ms);
                let daily_committed = state.daily.accumulate(estimate.smoothed_rate, dt_ms);

                (
                    estimate,
                    state.stats,
                    ChartSeries::from_aggregator(&state.hourly),
                    ChartSeries::from_aggregator(&state.daily),
                    hourly_committed,
                    daily_committed,
                )
            })
            .await;

        if let Some(value) = daily_committed {
            debug!("Daily chart bucket closed at {:.3} µSv/h", value);
        }

        let alarm = self.alarm.evaluate(
            stats.current_rate,
            stats.cumulative_dose,
            alarm_config,
            now_ms,
            output,
        );

        CycleReport {
            stats,
            cpm: estimate.cpm,
            raw_rate: estimate.raw_rate,
            alarm,
            hourly,
            daily,
            hourly_committed,
            daily_committed,
        }
    }

    /// Dose reset: clear the shared readings and the consumer's own history.
    pub async fn reset(&mut self, gate: &SharedGate, now_ms: u64) {
        gate.with_lock(|state| state.reset(now_ms)).await;
        self.dose.reset();
        self.rate.reset();
        self.last_cycle_ms = now_ms;
        info!("Dose statistics reset");
    }

    /// Readings refused as running maximum since the last reset.
    pub fn rejected_readings(&self) -> u32 {
        self.dose.rejected_readings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::SimulatedCounter;
    use embassy_futures::block_on;

    struct Silent;

    impl AlarmOutput for Silent {
        fn start_tone(&mut self, _freq_hz: u32, _duty_pct: u8) {}
        fn stop_tone(&mut self) {}
    }

    #[derive(Default)]
    struct RecordingSink {
        labels: Option<DisplayLabels>,
        charts: std::vec::Vec<(ChartId, usize, f32)>,
    }

    impl DisplaySink for RecordingSink {
        fn show_labels(&mut self, labels: &DisplayLabels) {
            self.labels = Some(labels.clone());
        }

        fn show_chart(&mut self, chart: ChartId, values: &[f32], scale_max: f32) {
            self.charts.push((chart, values.len(), scale_max));
        }
    }

    fn gate() -> SharedGate {
        SharedGate::new(SharedState::new(&PipelineConfig::default(), 0))
    }

    /// Run both sides in lock-step for `secs` seconds at 50 ms, injecting
    /// one pulse every 100 ms.
    fn run(gate: &SharedGate, secs: u64) -> CycleReport {
        let config = PipelineConfig::default();
        let counter = SimulatedCounter::new();
        let source = counter.clone();
        let mut producer = Producer::new(counter, &config, 0);
        let mut consumer = Consumer::new(&config, 0);
        let alarm = AlarmConfig::default();
        let mut report = None;

        let mut now = 50;
        while now <= secs * 1000 {
            if now % 100 == 0 {
                source.inject(1);
            }
            block_on(producer.step(gate, now));
            report = Some(block_on(consumer.step(gate, now, &alarm, &mut Silent)));
            now += 50;
        }

        report.expect("at least one cycle")
    }

    #[test]
    fn test_producer_commits_once_per_second() {
        let gate = gate();
        let config = PipelineConfig::default();
        let counter = SimulatedCounter::new();
        let source = counter.clone();
        let mut producer = Producer::new(counter, &config, 0);

        let mut committed = std::vec::Vec::new();
        for step in 1..=40u64 {
            source.inject(1);
            if let Some(pulses) = block_on(producer.step(&gate, step * 50)) {
                committed.push(pulses);
            }
        }

        // Polls at 100 ms see two injections each
        assert_eq!(committed, [20, 20]);
        let total = block_on(gate.with_lock(|s| s.stats.total_counts));
        assert_eq!(total, 40);
    }

    #[test]
    fn test_steady_source_reaches_expected_rate() {
        let gate = gate();

        let report = run(&gate, 120);

        assert!((report.cpm - 600.0).abs() < 1e-3);
        assert!((report.stats.current_rate - 600.0 / 153.8).abs() < 1e-3);
        assert_eq!(report.stats.total_counts, 1200);
    }

    #[test]
    fn test_hourly_chart_fills_after_window() {
        let gate = gate();

        let report = run(&gate, 181);

        assert_eq!(report.hourly.values.len(), 1);
        assert!(report.daily.values.is_empty());
        assert!(report.hourly.scale_max >= 1.0);
    }

    #[test]
    fn test_publish_reaches_sink() {
        let gate = gate();
        let report = run(&gate, 5);
        let mut sink = RecordingSink::default();

        report.publish(&mut sink);

        let labels = sink.labels.expect("labels published");
        assert_eq!(labels, DisplayLabels::from_stats(&report.stats));
        assert_eq!(sink.charts.len(), 2);
        assert_eq!(sink.charts[0].0, ChartId::Hourly);
        assert_eq!(sink.charts[1].0, ChartId::Daily);
    }

    #[test]
    fn test_consumer_reset_clears_shared_state() {
        let gate = gate();
        run(&gate, 200);
        let mut consumer = Consumer::new(&PipelineConfig::default(), 200_000);

        block_on(consumer.reset(&gate, 200_000));

        block_on(gate.with_lock(|state| {
            assert!(state.history.is_empty());
            assert_eq!(state.stats, RunningStats::new(200_000));
            assert!(state.hourly.buckets().is_empty());
            assert_eq!(state.generation, 1);
        }));
    }

    #[test]
    fn test_pulses_pending_at_reset_are_dropped() {
        let gate = gate();
        let config = PipelineConfig::default();
        let counter = SimulatedCounter::new();
        let source = counter.clone();
        let mut producer = Producer::new(counter, &config, 0);
        let mut consumer = Consumer::new(&config, 0);

        let mut now = 50;
        while now <= 10_500 {
            if now % 100 == 0 {
                source.inject(5);
            }
            block_on(producer.step(&gate, now));
            now += 50;
        }
        // Five polls of the current second are still pending
        block_on(consumer.reset(&gate, 10_500));

        let mut committed = std::vec::Vec::new();
        while now <= 12_000 {
            if let Some(pulses) = block_on(producer.step(&gate, now)) {
                committed.push(pulses);
            }
            now += 50;
        }

        assert_eq!(committed, [0]);
        block_on(gate.with_lock(|state| {
            assert_eq!(state.stats.total_counts, 0);
            assert_eq!(state.history.sum(), 0);
        }));
    }

    #[test]
    fn test_alarm_driven_from_cycle_readings() {
        let gate = gate();
        block_on(gate.with_lock(|state| {
            for _ in 0..60 {
                state.record_second(100);
            }
        }));
        let mut consumer = Consumer::new(&PipelineConfig::default(), 0);
        let alarm = AlarmConfig {
            enabled: true,
            ..AlarmConfig::default()
        };

        // 6000 CPM is ~39 µSv/h
        let report = block_on(consumer.step(&gate, 50, &alarm, &mut Silent));

        assert_eq!(report.alarm, AlarmDecision::ToneStarted(1500));
    }
}
