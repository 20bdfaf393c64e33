//! Producer and consumer running on separate threads against one gate.

use std::sync::Arc;
use std::thread;

use embassy_futures::block_on;
use geiger_core::config::PipelineConfig;
use geiger_core::{
    AlarmConfig, AlarmOutput, Consumer, Producer, SharedGate, SharedState, SimulatedCounter,
};

struct Silent;

impl AlarmOutput for Silent {
    fn start_tone(&mut self, _freq_hz: u32, _duty_pct: u8) {}
    fn stop_tone(&mut self) {}
}

const RUN_MS: u64 = 60_000;
const STEP_MS: u64 = 50;

#[test]
fn test_concurrent_contexts_agree_on_counts() {
    let config = PipelineConfig::default();
    let gate = Arc::new(SharedGate::new(SharedState::new(&config, 0)));

    let producer_gate = Arc::clone(&gate);
    let producer = thread::spawn(move || {
        let counter = SimulatedCounter::new();
        let source = counter.clone();
        let mut producer = Producer::new(counter, &config, 0);
        let mut seconds = 0;

        for now in (STEP_MS..=RUN_MS).step_by(STEP_MS as usize) {
            if now % 100 == 0 {
                source.inject(1);
            }
            if block_on(producer.step(&producer_gate, now)).is_some() {
                seconds += 1;
            }
        }
        seconds
    });

    let consumer_gate = Arc::clone(&gate);
    let consumer = thread::spawn(move || {
        let mut consumer = Consumer::new(&config, 0);
        let alarm = AlarmConfig::default();
        let mut previous_dose = 0.0;

        for now in (STEP_MS..=RUN_MS).step_by(STEP_MS as usize) {
            let report = block_on(consumer.step(&consumer_gate, now, &alarm, &mut Silent));
            assert!(report.stats.cumulative_dose >= previous_dose);
            previous_dose = report.stats.cumulative_dose;
            thread::yield_now();
        }
        consumer
    });

    let seconds = producer.join().expect("producer thread panicked");
    let mut consumer = consumer.join().expect("consumer thread panicked");
    assert_eq!(seconds, 60);

    // Let the smoothing window settle on the final history
    let mut report = None;
    for i in 1..=5 {
        let now = RUN_MS + i * STEP_MS;
        report = Some(block_on(consumer.step(&gate, now, &AlarmConfig::default(), &mut Silent)));
    }
    let report = report.expect("consumer ran");

    assert_eq!(report.stats.total_counts, 600);
    assert!((report.cpm - 600.0).abs() < 1e-3);
    assert!((report.stats.current_rate - 600.0 / 153.8).abs() < 1e-3);
}
