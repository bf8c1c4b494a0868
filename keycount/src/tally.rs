use std::sync::{Mutex, MutexGuard, PoisonError};

/// Per-line keyword counts computed by a single worker, indexed by tally slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialTally {
    counts: Vec<u64>,
}

impl PartialTally {
    pub fn from_counts(counts: Vec<u64>) -> Self {
        Self { counts }
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Sum of all counts in this partial
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Owned copy of the tally taken after all workers have finished
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TallySnapshot {
    pub counts: Vec<u64>,
    pub total: u64,
}

#[derive(Debug, Default)]
struct TallyState {
    counts: Vec<u64>,
    total: u64,
}

/// Shared keyword counts plus the grand total.
///
/// The only mutation is [`KeywordTally::merge`], which holds the lock for the whole
/// partial so merges never interleave. `total` equals the sum of `counts` whenever
/// no merge is in flight.
#[derive(Debug, Default)]
pub struct KeywordTally {
    state: Mutex<TallyState>,
}

impl KeywordTally {
    /// Creates a tally with `slots` counters, all at zero
    pub fn new(slots: usize) -> Self {
        Self {
            state: Mutex::new(TallyState {
                counts: vec![0; slots],
                total: 0,
            }),
        }
    }

    // Poisoning is ignored, the state is plain counters
    fn lock(&self) -> MutexGuard<'_, TallyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a partial tally into the shared counts and the total
    pub fn merge(&self, partial: &PartialTally) {
        let mut state = self.lock();
        let TallyState { counts, total } = &mut *state;
        for (slot, count) in counts.iter_mut().zip(partial.counts()) {
            *slot += count;
            *total += count;
        }
    }

    /// Copies the current counts. Meant to be called once the workers have joined.
    pub fn snapshot(&self) -> TallySnapshot {
        let state = self.lock();
        TallySnapshot {
            counts: state.counts.clone(),
            total: state.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_new_tally_is_zeroed() {
        let tally = KeywordTally::new(3);
        let snapshot = tally.snapshot();
        assert_eq!(snapshot.counts, vec![0, 0, 0]);
        assert_eq!(snapshot.total, 0);
    }

    #[test]
    fn test_merge_adds_counts_and_total() {
        let tally = KeywordTally::new(2);
        tally.merge(&PartialTally::from_counts(vec![2, 0]));
        tally.merge(&PartialTally::from_counts(vec![1, 3]));

        let snapshot = tally.snapshot();
        assert_eq!(snapshot.counts, vec![3, 3]);
        assert_eq!(snapshot.total, 6);
    }

    #[test]
    fn test_concurrent_merges_lose_nothing() {
        let tally = Arc::new(KeywordTally::new(2));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tally = Arc::clone(&tally);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        tally.merge(&PartialTally::from_counts(vec![1, 2]));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = tally.snapshot();
        assert_eq!(snapshot.counts, vec![8000, 16000]);
        assert_eq!(snapshot.total, snapshot.counts.iter().sum::<u64>());
    }

    #[test]
    fn test_partial_total() {
        let partial = PartialTally::from_counts(vec![1, 4, 0]);
        assert_eq!(partial.total(), 5);
    }
}
