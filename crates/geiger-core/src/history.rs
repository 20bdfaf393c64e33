//! Per-second pulse history (one minute ring buffer)

use crate::config::SECOND_HISTORY_LEN;

/// Fixed-capacity ring of "pulses seen in this second" entries.
///
/// Summing every valid slot gives the total number of pulses over the
/// trailing `N` seconds (or fewer, during the first minute after boot).
#[derive(Debug, Clone)]
pub struct SecondHistory<const N: usize = SECOND_HISTORY_LEN> {
    slots: [u32; N],
    /// Next slot to be written
    cursor: usize,
    /// Number of slots ever written, saturating at `N`
    filled: usize,
}

impl<const N: usize> Default for SecondHistory<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SecondHistory<N> {
    pub const fn new() -> Self {
        Self {
            slots: [0; N],
            cursor: 0,
            filled: 0,
        }
    }

    /// Record one completed second, overwriting the oldest slot when full.
    pub fn push(&mut self, pulses: u32) {
        if N == 0 {
            return;
        }
        self.slots[self.cursor] = pulses;
        self.cursor = (self.cursor + 1) % N;
        if self.filled < N {
            self.filled += 1;
        }
    }

    /// Total pulses over the valid slots.
    pub fn sum(&self) -> u64 {
        self.iter().map(u64::from).sum()
    }

    /// Number of valid slots.
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn is_full(&self) -> bool {
        self.filled == N
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Iterate valid slots oldest → newest.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        let start = if self.filled < N { 0 } else { self.cursor };
        (0..self.filled).map(move |i| self.slots[(start + i) % N])
    }

    pub fn clear(&mut self) {
        self.slots = [0; N];
        self.cursor = 0;
        self.filled = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_history_sums_written_slots() {
        let mut history = SecondHistory::<60>::new();
        history.push(3);
        history.push(4);

        assert_eq!(history.len(), 2);
        assert_eq!(history.sum(), 7);
        assert!(!history.is_full());
    }

    #[test]
    fn test_full_history_overwrites_oldest() {
        let mut history = SecondHistory::<3>::new();
        for pulses in [1, 2, 3, 4] {
            history.push(pulses);
        }

        assert!(history.is_full());
        assert_eq!(history.sum(), 9);
        assert_eq!(history.iter().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn test_clear_forgets_everything() {
        let mut history = SecondHistory::<4>::new();
        history.push(10);
        history.clear();

        assert!(history.is_empty());
        assert_eq!(history.sum(), 0);
        assert_eq!(history.iter().count(), 0);
    }
}
