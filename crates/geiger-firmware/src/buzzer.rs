//! Piezo buzzer driven by a square-wave task
//!
//! The alarm evaluator runs in the consumer loop and must not block, so
//! [`SignalBuzzer`] only posts the latest tone request. [`buzzer_task`]
//! picks it up and bit-bangs the pin until the next request.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Timer;
use esp_hal::gpio::Output;

use geiger_core::AlarmOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneCommand {
    Start { freq_hz: u32, duty_pct: u8 },
    Stop,
}

pub type ToneSignal = Signal<CriticalSectionRawMutex, ToneCommand>;

pub static TONE_SIGNAL: ToneSignal = Signal::new();

/// High and low time of one period, microseconds.
fn tone_timing(freq_hz: u32, duty_pct: u8) -> (u64, u64) {
    let period_us = 1_000_000 / u64::from(freq_hz.max(1));
    let high_us = period_us * u64::from(duty_pct.min(100)) / 100;
    (high_us, period_us - high_us)
}

/// [`AlarmOutput`] that forwards requests to [`buzzer_task`].
pub struct SignalBuzzer {
    signal: &'static ToneSignal,
    /// Last request sent, to avoid re-signalling an identical one
    current: ToneCommand,
}

impl SignalBuzzer {
    pub fn new(signal: &'static ToneSignal) -> Self {
        Self {
            signal,
            current: ToneCommand::Stop,
        }
    }

    fn send(&mut self, command: ToneCommand) {
        if command != self.current {
            self.current = command;
            self.signal.signal(command);
        }
    }
}

impl AlarmOutput for SignalBuzzer {
    fn start_tone(&mut self, freq_hz: u32, duty_pct: u8) {
        self.send(ToneCommand::Start { freq_hz, duty_pct });
    }

    fn stop_tone(&mut self) {
        self.send(ToneCommand::Stop);
    }
}

#[embassy_executor::task]
pub async fn buzzer_task(mut pin: Output<'static>, signal: &'static ToneSignal) {
    let mut command = ToneCommand::Stop;

    loop {
        match command {
            ToneCommand::Stop => {
                pin.set_low();
                command = signal.wait().await;
            }
            ToneCommand::Start { freq_hz, duty_pct } => {
                let (high_us, low_us) = tone_timing(freq_hz, duty_pct);
                pin.set_high();
                Timer::after_micros(high_us).await;
                pin.set_low();
                Timer::after_micros(low_us).await;

                if let Some(next) = signal.try_take() {
                    command = next;
                }
            }
        }
    }
}
