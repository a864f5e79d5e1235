//! Running sums shared between the sampler thread and the query side.

use std::sync::{Mutex, MutexGuard};

use crate::{ProtocolStats, Sample};

/// Everything the sampler has folded in since the last drain.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub sum_x: i64,
    pub sum_y: i64,
    pub sum_z: i64,
    pub sum_temperature: i64,
    /// Number of samples behind the sums.
    pub count: u64,
    /// Most recent intact self-test output, kept across drains.
    pub sto: Option<i16>,
    /// Cumulative frame counters, kept across drains.
    pub stats: ProtocolStats,
}

/// Lock-guarded running sums. The sampler is the only writer; every drain
/// takes the sums and zeroes them in one critical section.
#[derive(Debug, Default)]
pub struct Accumulator {
    inner: Mutex<Snapshot>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock can't leave the sums half-updated, so a
    // poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds one usable sample together with the frame counters as they stood
    /// after reading it.
    pub fn fold(&self, sample: &Sample, stats: ProtocolStats) {
        let mut totals = self.lock();
        totals.stats = stats;
        totals.sum_x += i64::from(sample.x);
        totals.sum_y += i64::from(sample.y);
        totals.sum_z += i64::from(sample.z);
        totals.sum_temperature += i64::from(sample.temperature);
        totals.count += 1;
        if let Some(sto) = sample.sto {
            totals.sto = Some(sto);
        }
    }

    /// Replaces the cumulative frame counters after a discarded cycle.
    pub fn publish_stats(&self, stats: ProtocolStats) {
        self.lock().stats = stats;
    }

    /// Returns the current totals and zeroes the sums and the counter.
    pub fn drain(&self) -> Snapshot {
        let mut totals = self.lock();
        let snapshot = *totals;
        totals.sum_x = 0;
        totals.sum_y = 0;
        totals.sum_z = 0;
        totals.sum_temperature = 0;
        totals.count = 0;
        snapshot
    }
}
