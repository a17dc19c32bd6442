//! Transfer statistics: one slot per worker, summed on demand.
//!
//! Each fetch installs a fresh, fixed-size slot array. Workers only ever store
//! into their own slot; observers may call [`StatsRegistry::snapshot`] from any
//! thread at any time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::segmenter::ByteRange;

/// Bytes assigned vs. bytes transferred, for one worker or summed across all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stat {
    pub total_bytes: u64,
    pub read_bytes: u64,
}

impl Stat {
    /// Fraction complete in [0.0, 1.0]. An empty assignment counts as complete.
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.read_bytes as f64 / self.total_bytes as f64).min(1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.read_bytes == self.total_bytes
    }
}

#[derive(Debug)]
struct Slot {
    total: AtomicU64,
    read: AtomicU64,
}

impl Slot {
    fn load(&self) -> Stat {
        Stat {
            total_bytes: self.total.load(Ordering::Relaxed),
            read_bytes: self.read.load(Ordering::Relaxed),
        }
    }
}

/// Per-fetch statistics registry.
#[derive(Debug)]
pub struct StatsRegistry {
    slots: Mutex<Arc<[Slot]>>,
}

impl Default for StatsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Arc::from(Vec::new())),
        }
    }

    /// Replace the slot array with one slot per range (`total = range.len()`,
    /// `read = 0`) and hand back the write handle for each worker.
    pub(crate) fn reset(&self, ranges: &[ByteRange]) -> Vec<StatSlot> {
        let slots: Arc<[Slot]> = ranges
            .iter()
            .map(|r| Slot {
                total: AtomicU64::new(r.len()),
                read: AtomicU64::new(0),
            })
            .collect();
        *self.slots.lock().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&slots);
        (0..ranges.len())
            .map(|index| StatSlot {
                slots: Arc::clone(&slots),
                index,
            })
            .collect()
    }

    /// Sum of all worker slots. Zero before the first fetch.
    pub fn snapshot(&self) -> Stat {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.iter().map(Slot::load).fold(Stat::default(), |acc, s| Stat {
            total_bytes: acc.total_bytes + s.total_bytes,
            read_bytes: acc.read_bytes + s.read_bytes,
        })
    }

    /// Current value of every worker slot, in worker order.
    pub fn per_worker(&self) -> Vec<Stat> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.iter().map(Slot::load).collect()
    }
}

/// Write handle for one worker's slot.
#[derive(Debug, Clone)]
pub struct StatSlot {
    slots: Arc<[Slot]>,
    index: usize,
}

impl StatSlot {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Publish the number of bytes this worker has written so far.
    pub fn set_read(&self, read_bytes: u64) {
        self.slots[self.index].read.store(read_bytes, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::plan_ranges;

    #[test]
    fn snapshot_before_any_fetch_is_zero() {
        let reg = StatsRegistry::new();
        assert_eq!(reg.snapshot(), Stat::default());
        assert!(reg.per_worker().is_empty());
    }

    #[test]
    fn reset_sets_totals_from_ranges() {
        let reg = StatsRegistry::new();
        let handles = reg.reset(&plan_ranges(10, 4));
        assert_eq!(handles.len(), 4);
        assert_eq!(
            reg.snapshot(),
            Stat {
                total_bytes: 10,
                read_bytes: 0
            }
        );
        let per = reg.per_worker();
        assert_eq!(per[3].total_bytes, 4);
    }

    #[test]
    fn slot_updates_are_summed() {
        let reg = StatsRegistry::new();
        let handles = reg.reset(&plan_ranges(100, 2));
        handles[0].set_read(20);
        handles[1].set_read(50);
        assert_eq!(reg.snapshot().read_bytes, 70);
        assert_eq!(reg.per_worker()[1].read_bytes, 50);
        assert_eq!(handles[1].index(), 1);
    }

    #[test]
    fn reset_discards_previous_fetch() {
        let reg = StatsRegistry::new();
        let old = reg.reset(&plan_ranges(100, 2));
        old[0].set_read(50);
        reg.reset(&plan_ranges(8, 1));
        // Stale handles no longer affect the registry.
        old[1].set_read(50);
        assert_eq!(
            reg.snapshot(),
            Stat {
                total_bytes: 8,
                read_bytes: 0
            }
        );
    }

    #[test]
    fn concurrent_writers_and_observer() {
        let reg = StatsRegistry::new();
        let handles = reg.reset(&plan_ranges(4000, 4));
        std::thread::scope(|s| {
            for h in &handles {
                s.spawn(move || {
                    for n in 1..=1000 {
                        h.set_read(n);
                    }
                });
            }
            s.spawn(|| {
                for _ in 0..1000 {
                    let snap = reg.snapshot();
                    assert_eq!(snap.total_bytes, 4000);
                    assert!(snap.read_bytes <= snap.total_bytes);
                }
            });
        });
        let snap = reg.snapshot();
        assert_eq!(snap.read_bytes, 4000);
        assert!(snap.is_complete());
        assert_eq!(snap.fraction(), 1.0);
    }

    #[test]
    fn fraction_of_empty_is_complete() {
        assert_eq!(Stat::default().fraction(), 1.0);
        let half = Stat {
            total_bytes: 10,
            read_bytes: 5,
        };
        assert!((half.fraction() - 0.5).abs() < 1e-9);
        assert!(!half.is_complete());
    }
}
