//! Audible dose alarm
//!
//! When either threshold is exceeded the buzzer plays short tones that
//! alternate between two pitches. A new tone starts at most once per
//! tone + pause period, so a reading hovering around the threshold never
//! turns into a continuous tone or a rapid chatter.

use log::info;

use crate::config::{ALARM_DUTY_PCT, ALARM_FREQ_HIGH_HZ, ALARM_FREQ_LOW_HZ, PipelineConfig};

/// Tone generator driven by the alarm.
pub trait AlarmOutput {
    /// Start (or retune) a tone.
    fn start_tone(&mut self, freq_hz: u32, duty_pct: u8);

    /// Silence the output. Must be harmless when already silent.
    fn stop_tone(&mut self);
}

/// Thresholds the alarm compares against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlarmConfig {
    /// Dose rate threshold, µSv/h
    pub current_threshold: f32,
    /// Cumulative dose threshold, mSv
    pub cumulative_threshold: f32,
    pub enabled: bool,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            current_threshold: 5.0,
            cumulative_threshold: 1.0,
            enabled: false,
        }
    }
}

/// What the evaluator did during one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmDecision {
    /// Alarm switched off in the settings
    Disabled,
    /// Readings below both thresholds
    Quiet,
    /// A new tone was started at the given frequency
    ToneStarted(u32),
    /// Triggered, tone still sounding
    Sounding,
    /// Triggered, inside the pause between two tones
    Pausing,
}

/// Mutable alarm bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlarmState {
    pub tone_active: bool,
    /// Selects the pitch of the next tone
    pub tone_toggle: bool,
    pub last_trigger_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AlarmEvaluator {
    state: AlarmState,
    tone_ms: u64,
    pause_ms: u64,
    /// Readings were over a threshold on the previous enabled cycle
    raised: bool,
}

impl AlarmEvaluator {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            state: AlarmState::default(),
            tone_ms: config.alarm_tone_ms,
            pause_ms: config.alarm_pause_ms,
            raised: false,
        }
    }

    pub fn state(&self) -> &AlarmState {
        &self.state
    }

    /// Compare the readings against `config` and drive `output`.
    pub fn evaluate<O: AlarmOutput>(
        &mut self,
        current_rate: f32,
        cumulative_dose: f64,
        config: &AlarmConfig,
        now_ms: u64,
        output: &mut O,
    ) -> AlarmDecision {
        if !config.enabled {
            self.silence(output);
            return AlarmDecision::Disabled;
        }

        let triggered = current_rate > config.current_threshold
            || cumulative_dose > f64::from(config.cumulative_threshold);

        if !triggered {
            if self.raised {
                info!("Alarm cleared");
            }
            self.silence(output);
            return AlarmDecision::Quiet;
        }

        let since_trigger = self
            .state
            .last_trigger_ms
            .map(|last| now_ms.saturating_sub(last));

        match since_trigger {
            Some(elapsed) if elapsed < self.tone_ms + self.pause_ms => {
                if self.state.tone_active && elapsed >= self.tone_ms {
                    output.stop_tone();
                    self.state.tone_active = false;
                }
                if self.state.tone_active {
                    AlarmDecision::Sounding
                } else {
                    AlarmDecision::Pausing
                }
            }
            _ => {
                if !self.raised {
                    info!(
                        "Alarm triggered: {:.2} µSv/h, {:.3} mSv",
                        current_rate, cumulative_dose
                    );
                    self.raised = true;
                }
                let freq_hz = if self.state.tone_toggle {
                    ALARM_FREQ_LOW_HZ
                } else {
                    ALARM_FREQ_HIGH_HZ
                };
                output.stop_tone();
                output.start_tone(freq_hz, ALARM_DUTY_PCT);
                self.state.tone_toggle = !self.state.tone_toggle;
                self.state.tone_active = true;
                self.state.last_trigger_ms = Some(now_ms);
                AlarmDecision::ToneStarted(freq_hz)
            }
        }
    }

    fn silence<O: AlarmOutput>(&mut self, output: &mut O) {
        output.stop_tone();
        self.state.tone_active = false;
        self.raised = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every call made to the output.
    #[derive(Default)]
    struct RecordingOutput {
        starts: Vec<(u64, u32)>,
        stops: usize,
        now_ms: u64,
        sounding: bool,
    }

    impl AlarmOutput for RecordingOutput {
        fn start_tone(&mut self, freq_hz: u32, _duty_pct: u8) {
            self.starts.push((self.now_ms, freq_hz));
            self.sounding = true;
        }

        fn stop_tone(&mut self) {
            self.stops += 1;
            self.sounding = false;
        }
    }

    fn enabled() -> AlarmConfig {
        AlarmConfig {
            current_threshold: 5.0,
            cumulative_threshold: 100.0,
            enabled: true,
        }
    }

    fn run(config: &AlarmConfig, rate: f32, until_ms: u64) -> RecordingOutput {
        let mut alarm = AlarmEvaluator::new(&PipelineConfig::default());
        let mut output = RecordingOutput::default();
        let mut now = 0;
        while now <= until_ms {
            output.now_ms = now;
            alarm.evaluate(rate, 0.0, config, now, &mut output);
            now += 50;
        }
        output
    }

    #[test]
    fn test_tone_starts_respect_minimum_interval() {
        let output = run(&enabled(), 6.0, 10_000);

        assert!(!output.starts.is_empty());
        for pair in output.starts.windows(2) {
            assert!(pair[1].0 - pair[0].0 >= 250);
        }
    }

    #[test]
    fn test_tones_alternate_between_pitches() {
        let output = run(&enabled(), 6.0, 1000);

        let freqs: Vec<u32> = output.starts.iter().map(|(_, f)| *f).collect();
        assert_eq!(freqs[..4], [1500, 1000, 1500, 1000]);
    }

    #[test]
    fn test_disabled_alarm_never_sounds() {
        let config = AlarmConfig {
            enabled: false,
            ..enabled()
        };

        let output = run(&config, 1000.0, 10_000);

        assert!(output.starts.is_empty());
        assert!(!output.sounding);
        assert!(output.stops > 0);
    }

    #[test]
    fn test_below_threshold_stays_quiet() {
        let output = run(&enabled(), 4.9, 2000);

        assert!(output.starts.is_empty());
    }

    #[test]
    fn test_cumulative_threshold_triggers() {
        let mut alarm = AlarmEvaluator::new(&PipelineConfig::default());
        let mut output = RecordingOutput::default();
        let config = AlarmConfig {
            cumulative_threshold: 0.5,
            ..enabled()
        };

        let decision = alarm.evaluate(0.1, 0.6, &config, 0, &mut output);

        assert_eq!(decision, AlarmDecision::ToneStarted(1500));
    }

    #[test]
    fn test_pause_between_tones() {
        let mut alarm = AlarmEvaluator::new(&PipelineConfig::default());
        let mut output = RecordingOutput::default();
        let config = enabled();

        alarm.evaluate(6.0, 0.0, &config, 0, &mut output);
        assert_eq!(
            alarm.evaluate(6.0, 0.0, &config, 100, &mut output),
            AlarmDecision::Sounding
        );
        assert_eq!(
            alarm.evaluate(6.0, 0.0, &config, 200, &mut output),
            AlarmDecision::Pausing
        );
        assert!(!output.sounding);
        assert_eq!(
            alarm.evaluate(6.0, 0.0, &config, 250, &mut output),
            AlarmDecision::ToneStarted(1000)
        );
    }

    #[test]
    fn test_clearing_readings_stops_tone() {
        let mut alarm = AlarmEvaluator::new(&PipelineConfig::default());
        let mut output = RecordingOutput::default();
        let config = enabled();

        alarm.evaluate(6.0, 0.0, &config, 0, &mut output);
        let decision = alarm.evaluate(1.0, 0.0, &config, 50, &mut output);

        assert_eq!(decision, AlarmDecision::Quiet);
        assert!(!output.sounding);
        assert!(!alarm.state().tone_active);
    }
}
