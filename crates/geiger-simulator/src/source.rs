//! Synthetic tube output

/// Period of the simulated hot-spot pass, seconds
const SPIKE_PERIOD_SECS: u64 = 600;

/// How long the simulated hot spot lasts, seconds
const SPIKE_LENGTH_SECS: u64 = 30;

/// Multiplier applied to the background rate during a hot-spot pass
const SPIKE_FACTOR: f64 = 20.0;

/// Generates pulse counts around a background rate.
///
/// The rate drifts slowly and rises sharply for half a minute every ten
/// minutes, so the charts and the alarm have something to show.
pub struct PulseSource {
    background_cpm: f64,
    last_ms: u64,
    /// Fractional pulses carried into the next call
    carry: f64,
    /// xorshift32 state for arrival jitter
    seed: u32,
}

impl PulseSource {
    pub fn new(background_cpm: f64, start_ms: u64) -> Self {
        Self {
            background_cpm: background_cpm.max(0.0),
            last_ms: start_ms,
            carry: 0.0,
            seed: 0x9E37_79B9,
        }
    }

    /// Expected counts per minute at `t_secs`.
    pub fn rate_cpm(&self, t_secs: f64) -> f64 {
        let drift = 1.0 + 0.3 * (t_secs / 90.0).sin();
        let spike = if (t_secs as u64) % SPIKE_PERIOD_SECS
            >= SPIKE_PERIOD_SECS - SPIKE_LENGTH_SECS
        {
            SPIKE_FACTOR
        } else {
            1.0
        };
        self.background_cpm * drift * spike
    }

    /// Pulses produced since the previous call.
    pub fn pulses_until(&mut self, now_ms: u64) -> u32 {
        let dt_ms = now_ms.saturating_sub(self.last_ms);
        self.last_ms = now_ms;
        if dt_ms == 0 {
            return 0;
        }

        let t_secs = now_ms as f64 / 1000.0;
        let expected = self.rate_cpm(t_secs) / 60.0 * (dt_ms as f64 / 1000.0);
        // Spread arrivals by up to ±50 % while keeping the long-run mean
        let jittered = expected * (0.5 + self.next_unit());
        let total = self.carry + jittered;
        let whole = total.floor();
        self.carry = total - whole;
        whole as u32
    }

    fn next_unit(&mut self) -> f64 {
        let mut x = self.seed;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.seed = x;
        f64::from(x) / f64::from(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_run_matches_background() {
        let mut source = PulseSource::new(120.0, 0);
        let mut total = 0u64;

        // 5 minutes of 50 ms steps, before the first hot spot
        for step in 1..=6000u64 {
            total += u64::from(source.pulses_until(step * 50));
        }

        let cpm = total as f64 / 5.0;
        assert!(cpm > 100.0 && cpm < 200.0, "cpm was {cpm}");
    }

    #[test]
    fn test_hot_spot_raises_rate() {
        let source = PulseSource::new(100.0, 0);

        assert!(source.rate_cpm(580.0) > 10.0 * source.rate_cpm(100.0));
    }
}
