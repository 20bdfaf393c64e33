//! Desktop simulator for the geiger-rs radiation monitor.
//!
//! Runs the full two-context pipeline on the host: a producer thread feeds a
//! [`SimulatedCounter`] from a synthetic pulse source while the main thread
//! runs the consumer, logs the readouts and prints a JSON snapshot every few
//! seconds. Build with `--features window` to see the device dashboard in
//! an SDL2 window.
//!
//! # Environment
//!
//! | Variable           | Meaning                                  | Default |
//! |--------------------|------------------------------------------|---------|
//! | `GEIGER_SIM_CPM`   | Background rate of the synthetic tube    | 30      |
//! | `GEIGER_SIM_SECS`  | Stop after this many seconds             | forever |
//! | `GEIGER_SIM_ALARM` | `1` enables the alarm at startup         | off     |

mod frontend;
mod source;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use embassy_futures::block_on;
use log::{debug, error, info, warn};

use geiger_core::config::{CONSUMER_LOOP_MS, PRODUCER_LOOP_MS, PipelineConfig, STATUS_INTERVAL_MS};
use geiger_core::{
    Consumer, DataSnapshot, MemorySettingsStore, Producer, SettingsChange, SettingsStore,
    SharedGate, SharedState, SimulatedCounter,
};

use frontend::{Command, LogBuzzer};
use source::PulseSource;

#[cfg(not(feature = "window"))]
type Frontend = frontend::LogFrontend;
#[cfg(feature = "window")]
type Frontend = frontend::WindowFrontend;

/// Interval between JSON snapshot exports
const EXPORT_INTERVAL_MS: u64 = 10_000;

const DEFAULT_BACKGROUND_CPM: f64 = 30.0;

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparsable {}={:?}", name, raw);
            None
        }
    }
}

fn main() {
    env_logger::init();
    info!("Starting geiger-rs simulator");

    let background_cpm = env_parse("GEIGER_SIM_CPM").unwrap_or(DEFAULT_BACKGROUND_CPM);
    let run_for_ms = env_parse::<u64>("GEIGER_SIM_SECS").map(|secs| secs * 1000);
    info!("Synthetic background: {:.1} CPM", background_cpm);

    let config = PipelineConfig::default();
    let start = Instant::now();
    let now_ms = move || start.elapsed().as_millis() as u64;

    let mut settings_store = MemorySettingsStore::new();
    let mut settings = settings_store.load_or_default();
    if env_parse::<u8>("GEIGER_SIM_ALARM") == Some(1) {
        SettingsChange::AlarmEnabled(true).apply(&mut settings);
        if let Err(e) = settings_store.save(&settings) {
            warn!("Failed to save settings: {}", e);
        }
    }
    let mut alarm_config = settings.alarm_config();
    info!("Alarm config: {:?}", alarm_config);

    let gate = Arc::new(SharedGate::new(SharedState::new(&config, now_ms())));
    let running = Arc::new(AtomicBool::new(true));

    // -----------------------------------------------------------------------
    // Producer context
    // -----------------------------------------------------------------------
    let counter = SimulatedCounter::new();
    let tube = counter.clone();
    let producer_gate = Arc::clone(&gate);
    let producer_running = Arc::clone(&running);
    let producer = thread::spawn(move || {
        let mut producer = Producer::new(counter, &config, now_ms());
        let mut source = PulseSource::new(background_cpm, now_ms());

        while producer_running.load(Ordering::Relaxed) {
            let now = now_ms();
            tube.inject(source.pulses_until(now));
            block_on(producer.step(&producer_gate, now));
            thread::sleep(Duration::from_millis(PRODUCER_LOOP_MS));
        }

        info!(
            "Producer stopped ({} counter clears seen)",
            producer.clamped_reads()
        );
    });

    // -----------------------------------------------------------------------
    // Consumer context
    // -----------------------------------------------------------------------
    let mut consumer = Consumer::new(&config, now_ms());
    let mut buzzer = LogBuzzer::default();
    let mut frontend = Frontend::new();
    let mut last_status = 0u64;
    let mut last_export = 0u64;

    loop {
        let now = now_ms();
        let report = block_on(consumer.step(&gate, now, &alarm_config, &mut buzzer));

        match frontend.present(&report) {
            Some(Command::Quit) => break,
            Some(Command::ResetDose) => block_on(consumer.reset(&gate, now)),
            Some(Command::ToggleAlarm) => {
                let enabled = !settings.alarm_enabled;
                if SettingsChange::AlarmEnabled(enabled).apply(&mut settings) {
                    alarm_config = settings.alarm_config();
                    info!("Alarm {}", if enabled { "enabled" } else { "disabled" });
                }
                if let Err(e) = settings_store.save(&settings) {
                    warn!("Failed to save settings: {}", e);
                }
            }
            None => {}
        }

        if now.saturating_sub(last_status) >= STATUS_INTERVAL_MS {
            last_status = now;
            info!(
                "{:.0} CPM | {:.3} uSv/h (raw {:.3}) | max {:.3} | dose {:.6} mSv | {} counts | {:?}",
                report.cpm,
                report.stats.current_rate,
                report.raw_rate,
                report.stats.max_rate,
                report.stats.cumulative_dose,
                report.stats.total_counts,
                report.alarm
            );
        }

        // Skipped for this cycle while the producer holds the gate
        if now.saturating_sub(last_export) >= EXPORT_INTERVAL_MS {
            match gate.try_with_lock(|state| DataSnapshot::capture(state, now)) {
                Some(snapshot) => {
                    last_export = now;
                    match serde_json::to_string(&snapshot) {
                        Ok(json) => println!("{json}"),
                        Err(e) => error!("Snapshot export failed: {}", e),
                    }
                }
                None => debug!("Gate busy, snapshot export deferred"),
            }
        }

        if run_for_ms.is_some_and(|limit| now >= limit) {
            break;
        }

        thread::sleep(Duration::from_millis(CONSUMER_LOOP_MS));
    }

    running.store(false, Ordering::Relaxed);
    if producer.join().is_err() {
        error!("Producer thread panicked");
    }
    info!(
        "Simulator exiting ({} readings rejected as implausible)",
        consumer.rejected_readings()
    );
}
