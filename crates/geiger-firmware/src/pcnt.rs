//! Geiger pulse input on the PCNT peripheral

use esp_hal::gpio::interconnect::PeripheralInput;
use esp_hal::pcnt::channel::EdgeMode;
use esp_hal::pcnt::unit::Unit;
use log::info;

use geiger_core::config::PCNT_HIGH_LIMIT;
use geiger_core::{CounterError, PulseCounter};

/// Glitch filter in APB clock cycles (80 MHz), rejects spikes under 125 ns
const FILTER_THRESHOLD: u16 = 10;

/// PCNT unit 0 counting rising edges of the tube output.
///
/// The unit counts `0..=PCNT_HIGH_LIMIT` and clears itself at the limit.
pub struct PcntCounter<'d> {
    unit: Unit<'d, 0>,
}

impl<'d> PcntCounter<'d> {
    pub fn new(
        unit: Unit<'d, 0>,
        pulse_pin: impl PeripheralInput<'d>,
    ) -> Result<Self, CounterError> {
        unit.set_low_limit(None)
            .map_err(|_| CounterError::Config("low limit"))?;
        unit.set_high_limit(Some(PCNT_HIGH_LIMIT as i16))
            .map_err(|_| CounterError::Config("high limit"))?;
        unit.set_filter(Some(FILTER_THRESHOLD))
            .map_err(|_| CounterError::Config("filter threshold"))?;

        let channel = &unit.channel0;
        channel.set_edge_signal(pulse_pin);
        // Count rising edges only
        channel.set_input_mode(EdgeMode::Hold, EdgeMode::Increment);

        unit.pause();
        unit.clear();
        unit.resume();

        info!("PCNT unit 0 counting, limit {}", PCNT_HIGH_LIMIT);
        Ok(Self { unit })
    }
}

impl PulseCounter for PcntCounter<'_> {
    fn read(&mut self) -> u16 {
        // Never negative with a low limit of zero
        self.unit.value().max(0) as u16
    }

    fn reset(&mut self) {
        self.unit.clear();
    }
}
