//! Pulse counter abstraction
//!
//! The Geiger tube output is counted in hardware. The pipeline only ever sees
//! the absolute counter value; turning that into per-interval counts is the
//! job of [`crate::bucketizer::SecondBucketizer`].

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::config::PCNT_HIGH_LIMIT;

/// A free-running hardware pulse counter.
///
/// `read` returns the current absolute value, which may wrap or be cleared by
/// the hardware at its limit. Reading has no side effects and does not clear
/// the counter; only [`PulseCounter::reset`] does.
pub trait PulseCounter {
    /// Read the current absolute count.
    fn read(&mut self) -> u16;

    /// Clear the counter back to zero.
    fn reset(&mut self);
}

impl<P: PulseCounter + ?Sized> PulseCounter for &mut P {
    fn read(&mut self) -> u16 {
        (**self).read()
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

/// Software pulse counter for tests and the desktop simulator.
///
/// Clones share the same count, so one handle can be given to the producer
/// while another injects pulses. Like the PCNT unit it wraps back to zero
/// once the count passes `limit`.
#[derive(Debug, Clone)]
pub struct SimulatedCounter {
    value: Arc<AtomicU32>,
    limit: u16,
}

impl Default for SimulatedCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedCounter {
    /// Counter that behaves like the PCNT unit (clears at 32767).
    pub fn new() -> Self {
        Self::with_limit(PCNT_HIGH_LIMIT)
    }

    /// Counter that clears once the count passes `limit`.
    pub fn with_limit(limit: u16) -> Self {
        Self {
            value: Arc::new(AtomicU32::new(0)),
            limit,
        }
    }

    /// Register `pulses` tube events.
    pub fn inject(&self, pulses: u32) {
        let modulus = u32::from(self.limit) + 1;
        let _ = self
            .value
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some((current + pulses % modulus) % modulus)
            });
    }

    /// Current absolute count.
    pub fn value(&self) -> u16 {
        self.value.load(Ordering::Acquire) as u16
    }
}

impl PulseCounter for SimulatedCounter {
    fn read(&mut self) -> u16 {
        self.value()
    }

    fn reset(&mut self) {
        self.value.store(0, Ordering::Release);
    }
}
