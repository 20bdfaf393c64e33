//! Counter polling and per-second bucketing
//!
//! The counter is read on a short cadence and the differences are summed,
//! then handed out once per second. Reading ten times per bucket keeps the
//! window in which a counter clear can swallow pulses small.

use log::trace;

use crate::config::PipelineConfig;
use crate::counter::PulseCounter;

/// Two-cadence state machine turning absolute counter values into
/// "pulses per second" buckets.
#[derive(Debug, Clone)]
pub struct SecondBucketizer {
    poll_interval_ms: u64,
    bucket_interval_ms: u64,
    /// Counter value seen at the previous poll
    last_count: u16,
    /// Pulses accumulated towards the current second
    pending: u32,
    last_poll_ms: u64,
    last_commit_ms: u64,
    /// Number of polls whose difference was negative and got dropped
    clamped_reads: u32,
}

impl SecondBucketizer {
    pub fn new(config: &PipelineConfig, start_ms: u64) -> Self {
        Self {
            poll_interval_ms: config.poll_interval_ms,
            bucket_interval_ms: config.bucket_interval_ms,
            last_count: 0,
            pending: 0,
            last_poll_ms: start_ms,
            last_commit_ms: start_ms,
            clamped_reads: 0,
        }
    }

    /// Re-baseline against `counter` without clearing it.
    pub fn sync<P: PulseCounter>(&mut self, counter: &mut P, now_ms: u64) {
        self.last_count = counter.read();
        self.pending = 0;
        self.last_poll_ms = now_ms;
        self.last_commit_ms = now_ms;
    }

    /// Advance both cadences.
    ///
    /// Polls the counter when the poll interval has elapsed and returns the
    /// finished bucket when the bucket interval has elapsed. The caller is
    /// responsible for committing the returned value into the history.
    pub fn tick<P: PulseCounter>(&mut self, counter: &mut P, now_ms: u64) -> Option<u32> {
        if now_ms.saturating_sub(self.last_poll_ms) >= self.poll_interval_ms {
            self.poll(counter);
            self.last_poll_ms = now_ms;
        }

        if now_ms.saturating_sub(self.last_commit_ms) >= self.bucket_interval_ms {
            self.last_commit_ms = now_ms;
            return Some(core::mem::take(&mut self.pending));
        }

        None
    }

    fn poll<P: PulseCounter>(&mut self, counter: &mut P) {
        let current = counter.read();
        let diff = i32::from(current) - i32::from(self.last_count);
        self.last_count = current;

        if diff < 0 {
            // Counter cleared at its limit (or was reset) since the last poll
            trace!("Counter went backwards by {}, dropping poll", -diff);
            self.clamped_reads = self.clamped_reads.saturating_add(1);
            return;
        }

        self.pending = self.pending.saturating_add(diff as u32);
    }

    /// Pulses counted towards the second in progress.
    pub fn pending(&self) -> u32 {
        self.pending
    }

    pub fn clamped_reads(&self) -> u32 {
        self.clamped_reads
    }
}
