//! Weighted slot allocation across directive buckets.
//!
//! Lower priority numbers carry more weight. Every available bucket gets one
//! slot when the budget allows; the rest is apportioned by largest
//! remainder. When there are more buckets than slots, only the heaviest
//! buckets get a single slot each.

use serde::Serialize;

/// A directive bucket that holds at least one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailableBucket {
    /// Directive index in declaration order.
    pub entry: usize,
    pub priority: i64,
}

/// Slot count per directive bucket, in the order buckets are drawn from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllocationPlan {
    pub counts: Vec<(usize, usize)>,
}

impl AllocationPlan {
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }

    pub fn count_for(&self, entry: usize) -> usize {
        self.counts
            .iter()
            .find(|(e, _)| *e == entry)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

/// `(S - p) / S` per bucket, with `S = max(1, sum of priorities)`.
///
/// The sum is taken in `i128` so no set of `i64` priorities can overflow it.
pub fn weights(buckets: &[AvailableBucket]) -> Vec<f64> {
    let sum = buckets
        .iter()
        .map(|b| i128::from(b.priority))
        .sum::<i128>()
        .max(1) as f64;
    buckets
        .iter()
        .map(|b| (sum - b.priority as f64) / sum)
        .collect()
}

/// Bucket positions by descending weight; stable, so declaration order
/// breaks ties.
fn heaviest_first(weights: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by(|&a, &b| weights[b].total_cmp(&weights[a]));
    order
}

/// Split a budget of `k` slots across `buckets`.
///
/// The plan never exceeds `k`. With `buckets.len() <= k` it sums to exactly
/// `k` and every bucket holds at least one slot.
pub fn allocate(buckets: &[AvailableBucket], k: usize) -> AllocationPlan {
    if buckets.is_empty() || k == 0 {
        return AllocationPlan::default();
    }

    let weights = weights(buckets);
    let order = heaviest_first(&weights);

    if buckets.len() > k {
        let counts = order
            .into_iter()
            .take(k)
            .map(|i| (buckets[i].entry, 1))
            .collect();
        return AllocationPlan { counts };
    }

    let mut counts = vec![1usize; buckets.len()];
    let mut remaining = k - buckets.len();

    if remaining > 0 {
        // Negative weights only arise from negative priorities other than
        // the exclusion sentinel; they get no share beyond the baseline.
        let shares: Vec<f64> = weights.iter().map(|w| w.max(0.0)).collect();
        let total = shares.iter().sum::<f64>().max(1.0);
        let ideal: Vec<f64> = shares
            .iter()
            .map(|s| s / total * remaining as f64)
            .collect();

        for (count, share) in counts.iter_mut().zip(&ideal) {
            let whole = (share.floor() as usize).min(remaining);
            *count += whole;
            remaining -= whole;
        }

        let fraction = |i: usize| ideal[i] - ideal[i].floor();
        let mut by_fraction: Vec<usize> = (0..ideal.len()).filter(|&i| fraction(i) > 0.0).collect();
        by_fraction.sort_by(|&a, &b| fraction(b).total_cmp(&fraction(a)));
        for i in by_fraction {
            if remaining == 0 {
                break;
            }
            counts[i] += 1;
            remaining -= 1;
        }

        // Shares fall short of the remainder when the weights sum below one.
        while remaining > 0 {
            for &i in &order {
                if remaining == 0 {
                    break;
                }
                counts[i] += 1;
                remaining -= 1;
            }
        }
    }

    AllocationPlan {
        counts: buckets
            .iter()
            .zip(counts)
            .map(|(b, n)| (b.entry, n))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn buckets(priorities: &[i64]) -> Vec<AvailableBucket> {
        priorities
            .iter()
            .enumerate()
            .map(|(entry, &priority)| AvailableBucket { entry, priority })
            .collect()
    }

    #[test]
    fn test_weights_formula() {
        let w = weights(&buckets(&[1, 2, 3]));
        assert_relative_eq!(w[0], 5.0 / 6.0);
        assert_relative_eq!(w[1], 4.0 / 6.0);
        assert_relative_eq!(w[2], 3.0 / 6.0);
    }

    #[test]
    fn test_weights_zero_sum_floors_to_one() {
        let w = weights(&buckets(&[0, 0]));
        assert_relative_eq!(w[0], 1.0);
        assert_relative_eq!(w[1], 1.0);
    }

    #[test]
    fn test_largest_remainder_example() {
        let plan = allocate(&buckets(&[1, 2, 3]), 5);
        assert_eq!(plan.counts, vec![(0, 2), (1, 2), (2, 1)]);
        assert_eq!(plan.total(), 5);
    }

    #[test]
    fn test_oversubscribed_picks_heaviest() {
        let plan = allocate(&buckets(&[4, 0, 3, 1]), 2);
        assert_eq!(plan.counts, vec![(1, 1), (3, 1)]);
        assert_eq!(plan.count_for(0), 0);
        assert_eq!(plan.count_for(2), 0);
    }

    #[test]
    fn test_oversubscribed_ties_keep_declaration_order() {
        let plan = allocate(&buckets(&[2, 2, 2]), 2);
        assert_eq!(plan.counts, vec![(0, 1), (1, 1)]);
    }

    #[test]
    fn test_high_precedence_takes_remainder() {
        // weights 1 and 0: the whole remainder goes to priority 0
        let plan = allocate(&buckets(&[0, 5]), 4);
        assert_eq!(plan.counts, vec![(0, 3), (1, 1)]);
    }

    #[test]
    fn test_single_zero_weight_bucket_gets_everything() {
        let plan = allocate(&buckets(&[5]), 4);
        assert_eq!(plan.counts, vec![(0, 4)]);
    }

    #[test]
    fn test_exactly_subscribed_gives_one_each() {
        let plan = allocate(&buckets(&[0, 9, 3]), 3);
        assert_eq!(plan.counts, vec![(0, 1), (1, 1), (2, 1)]);
    }

    #[test]
    fn test_negative_priority_gets_baseline_only_share() {
        let plan = allocate(&buckets(&[-3, 5]), 6);
        assert_eq!(plan.total(), 6);
        assert_eq!(plan.count_for(1), 1);
    }

    #[test]
    fn test_extreme_priorities_do_not_overflow() {
        let w = weights(&buckets(&[i64::MAX, 1]));
        assert!(w.iter().all(|x| x.is_finite()));
        assert!(w[1] > w[0]);

        let plan = allocate(&buckets(&[i64::MAX, 1]), 4);
        assert_eq!(plan.total(), 4);
        assert!(plan.count_for(1) >= plan.count_for(0));

        let plan = allocate(&buckets(&[i64::MIN, i64::MAX, i64::MAX]), 7);
        assert_eq!(plan.total(), 7);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(allocate(&[], 4).total(), 0);
        assert_eq!(allocate(&buckets(&[1]), 0).total(), 0);
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_budget(
            priorities in proptest::collection::vec(0i64..20, 1..12),
            k in 0usize..30,
        ) {
            let plan = allocate(&buckets(&priorities), k);
            prop_assert!(plan.total() <= k);
        }

        #[test]
        fn prop_fills_budget_and_covers_buckets(
            priorities in proptest::collection::vec(-5i64..20, 1..12),
            extra in 0usize..30,
        ) {
            let b = buckets(&priorities);
            let k = b.len() + extra;
            let plan = allocate(&b, k);
            prop_assert_eq!(plan.total(), k);
            prop_assert!(plan.counts.iter().all(|(_, n)| *n >= 1));
            prop_assert_eq!(plan.counts.len(), b.len());
        }

        #[test]
        fn prop_oversubscribed_single_slots(
            priorities in proptest::collection::vec(0i64..20, 2..12),
        ) {
            let b = buckets(&priorities);
            let k = b.len() - 1;
            let plan = allocate(&b, k);
            prop_assert_eq!(plan.counts.len(), k);
            prop_assert!(plan.counts.iter().all(|(_, n)| *n == 1));
        }

        #[test]
        fn prop_lower_priority_never_gets_fewer(
            priorities in proptest::collection::vec(0i64..20, 1..8),
            extra in 0usize..20,
        ) {
            let b = buckets(&priorities);
            let plan = allocate(&b, b.len() + extra);
            for x in &b {
                for y in &b {
                    if x.priority < y.priority {
                        prop_assert!(plan.count_for(x.entry) + 1 >= plan.count_for(y.entry));
                    }
                }
            }
        }

        #[test]
        fn prop_any_i64_priorities_fill_budget(
            priorities in proptest::collection::vec(any::<i64>(), 1..10),
            k in 0usize..25,
        ) {
            let b = buckets(&priorities);
            let plan = allocate(&b, k);
            prop_assert_eq!(plan.total(), k);
            if b.len() <= k {
                prop_assert!(plan.counts.iter().all(|(_, n)| *n >= 1));
            } else {
                prop_assert!(plan.counts.iter().all(|(_, n)| *n == 1));
            }
        }

        #[test]
        fn prop_deterministic(
            priorities in proptest::collection::vec(0i64..20, 1..10),
            k in 0usize..25,
        ) {
            let b = buckets(&priorities);
            prop_assert_eq!(allocate(&b, k), allocate(&b, k));
        }
    }
}
