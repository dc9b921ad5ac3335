//! Peg counters.
//!
//! Every codec keeps two pegs, `processed` and `discards`. Each worker
//! increments its own [`PegCounts`] lane; the lanes are folded into a global
//! [`PegTotals`] by an explicit [`sum_stats`] call. Lanes are relaxed atomics
//! so the fold can run while workers keep counting: it only swaps each lane
//! back to zero and adds what it took into the total.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};

/// Named peg counters kept by every codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peg {
    /// Packets that reached the codec's parsing logic.
    Processed,
    /// Packets too short to parse and handed on as plain payload.
    Discards,
}

impl Peg {
    pub const ALL: [Peg; 2] = [Peg::Processed, Peg::Discards];
    pub const COUNT: usize = Self::ALL.len();

    pub const fn as_str(self) -> &'static str {
        match self {
            Peg::Processed => "processed",
            Peg::Discards => "discards",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl AsRef<str> for Peg {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// One worker's private peg lane.
#[derive(Debug, Default)]
pub struct PegCounts {
    pegs: [AtomicU64; Peg::COUNT],
}

impl PegCounts {
    #[inline]
    pub fn inc(&self, peg: Peg) {
        self.pegs[peg.index()].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self, peg: Peg) -> u64 {
        self.pegs[peg.index()].load(Ordering::Relaxed)
    }

    /// Reads and zeroes the lane in one step per peg.
    fn take(&self) -> [u64; Peg::COUNT] {
        let mut taken = [0; Peg::COUNT];
        for (slot, peg) in taken.iter_mut().zip(&self.pegs) {
            *slot = peg.swap(0, Ordering::Relaxed);
        }
        taken
    }
}

/// Process-lifetime totals, only ever grown by [`sum_stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PegTotals {
    pegs: [u64; Peg::COUNT],
}

impl PegTotals {
    #[inline]
    pub fn get(&self, peg: Peg) -> u64 {
        self.pegs[peg.index()]
    }

    /// `(name, value)` pairs in [`Peg::ALL`] order.
    pub fn snapshot(&self) -> Vec<(&'static str, u64)> {
        Peg::ALL
            .iter()
            .map(|peg| (peg.as_str(), self.get(*peg)))
            .collect()
    }

    fn add(&mut self, counts: [u64; Peg::COUNT]) {
        for (total, count) in self.pegs.iter_mut().zip(counts) {
            *total = total.saturating_add(count);
        }
    }
}

/// Folds every lane into `totals` and resets the lanes to zero.
///
/// Workers may keep incrementing their lanes while this runs; an increment
/// lands either in this fold or in the next one, never in both.
pub fn sum_stats(totals: &mut PegTotals, lanes: &[Arc<PegCounts>]) {
    for lane in lanes {
        totals.add(lane.take());
    }
}

/// The peg bookkeeping of one codec descriptor: the live lanes handed out to
/// workers plus the global totals.
#[derive(Debug, Default)]
pub struct PegLanes {
    lanes: Mutex<Vec<Arc<PegCounts>>>,
    totals: Mutex<PegTotals>,
}

impl PegLanes {
    /// Hands out a fresh lane for a new worker-owned codec instance.
    pub fn register(&self) -> Arc<PegCounts> {
        let lane = Arc::new(PegCounts::default());
        self.lanes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&lane));
        lane
    }

    /// Folds a lane one last time and stops tracking it.
    pub fn retire(&self, lane: &Arc<PegCounts>) {
        let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
        lanes.retain(|l| !Arc::ptr_eq(l, lane));
        drop(lanes);

        let mut totals = self.totals.lock().unwrap_or_else(PoisonError::into_inner);
        sum_stats(&mut totals, std::slice::from_ref(lane));
    }

    /// Folds all live lanes into the totals.
    pub fn sum(&self) {
        let lanes = self
            .lanes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let mut totals = self.totals.lock().unwrap_or_else(PoisonError::into_inner);
        sum_stats(&mut totals, &lanes);
    }

    pub fn totals(&self) -> PegTotals {
        *self.totals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of lanes currently handed out.
    pub fn live_lanes(&self) -> usize {
        self.lanes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
