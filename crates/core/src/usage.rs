use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::routing::ModelTier;

/// Point-in-time snapshot of tier usage and accumulated cost.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    pub rule_based_count: u64,
    pub mini_count: u64,
    pub full_count: u64,
    pub total_estimated_cost: Decimal,
}

/// Shared usage accounting for all analyses that hold a clone of the same
/// tracker. Injected by the caller, never global; reset is explicit and only
/// ever caller-triggered (start of a billing period, start of a test).
#[derive(Clone, Debug, Default)]
pub struct UsageTracker {
    inner: Arc<Mutex<UsageStats>>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one executed stage. Negative costs cannot occur upstream
    /// (routing guarantees it); the floor keeps the invariant local anyway.
    pub fn record(&self, tier: ModelTier, estimated_cost: Decimal) {
        let mut stats = self.lock();
        match tier {
            ModelTier::RuleBased => stats.rule_based_count += 1,
            ModelTier::Mini => stats.mini_count += 1,
            ModelTier::Full => stats.full_count += 1,
        }
        stats.total_estimated_cost += estimated_cost.max(Decimal::ZERO);
    }

    pub fn snapshot(&self) -> UsageStats {
        self.lock().clone()
    }

    pub fn reset(&self) {
        *self.lock() = UsageStats::default();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, UsageStats> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use rust_decimal::Decimal;

    use crate::routing::ModelTier;

    use super::UsageTracker;

    #[test]
    fn records_per_tier_counts_and_accumulates_cost() {
        let tracker = UsageTracker::new();
        tracker.record(ModelTier::RuleBased, Decimal::ZERO);
        tracker.record(ModelTier::Mini, Decimal::new(75, 6));
        tracker.record(ModelTier::Full, Decimal::new(525, 5));
        tracker.record(ModelTier::Full, Decimal::new(525, 5));

        let stats = tracker.snapshot();
        assert_eq!(stats.rule_based_count, 1);
        assert_eq!(stats.mini_count, 1);
        assert_eq!(stats.full_count, 2);
        // 0.000075 + 0.00525 + 0.00525 = 0.010575
        assert_eq!(stats.total_estimated_cost, Decimal::new(10_575, 6));
    }

    #[test]
    fn clones_share_the_same_counters() {
        let tracker = UsageTracker::new();
        let shared = tracker.clone();
        shared.record(ModelTier::Mini, Decimal::ZERO);
        assert_eq!(tracker.snapshot().mini_count, 1);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let tracker = UsageTracker::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                thread::spawn(move || {
                    for _ in 0..100 {
                        tracker.record(ModelTier::Full, Decimal::new(1, 4));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker thread");
        }

        let stats = tracker.snapshot();
        assert_eq!(stats.full_count, 800);
        assert_eq!(stats.total_estimated_cost, Decimal::new(800, 4));
    }

    #[test]
    fn reset_is_explicit_and_total() {
        let tracker = UsageTracker::new();
        tracker.record(ModelTier::Mini, Decimal::new(1, 2));
        tracker.reset();
        assert_eq!(tracker.snapshot(), Default::default());
    }
}
