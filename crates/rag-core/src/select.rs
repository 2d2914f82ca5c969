use std::collections::HashSet;

use crate::allocate::AllocationPlan;
use crate::bucket::{Assignment, BucketId};

/// Outcome of drawing passages from the pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Pool indices in draw order.
    pub picked: Vec<usize>,
    /// How many of `picked` came from back-fill rather than a bucket quota.
    pub backfilled: usize,
}

/// The `k` most similar candidates, used when no directive is active.
pub fn top_k(pool_len: usize, k: usize) -> Selection {
    Selection {
        picked: (0..pool_len.min(k)).collect(),
        backfilled: 0,
    }
}

/// Draw each bucket's quota from the head of its list, then top up from
/// the whole pool in similarity order until `k` passages are picked or the
/// pool runs dry.
pub fn select_with_backfill(
    assignment: &Assignment,
    plan: &AllocationPlan,
    pool_len: usize,
    k: usize,
) -> Selection {
    let mut picked: Vec<usize> = Vec::with_capacity(k);
    for &(entry, count) in &plan.counts {
        let members = assignment.members(BucketId::Entry(entry));
        picked.extend(members.iter().take(count).copied());
    }
    picked.truncate(k);

    let quota = picked.len();
    if picked.len() < k {
        let taken: HashSet<usize> = picked.iter().copied().collect();
        let needed = k - picked.len();
        picked.extend((0..pool_len).filter(|i| !taken.contains(i)).take(needed));
    }

    Selection {
        backfilled: picked.len() - quota,
        picked,
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::allocate::allocate;
    use crate::bucket::assign_buckets;
    use crate::candidate::ranked;
    use crate::directive::parse_directives;

    #[test]
    fn test_top_k_truncates_to_pool() {
        assert_eq!(top_k(10, 3).picked, vec![0, 1, 2]);
        assert_eq!(top_k(2, 5).picked, vec![0, 1]);
    }

    #[test]
    fn test_quota_then_backfill_in_rank_order() {
        let entries = parse_directives("0,specs\n5,notes", Path::new("/kb")).unwrap();
        let pool = ranked([
            ("/kb/other/o1.md", "o1"),
            ("/kb/specs/s1.md", "s1"),
            ("/kb/notes/n1.md", "n1"),
            ("/kb/other/o2.md", "o2"),
        ]);
        let a = assign_buckets(&pool, &entries, Path::new("/kb"));
        // specs asks for 3 but only holds one candidate
        let plan = allocate(&a.available(&entries), 4);
        assert_eq!(plan.count_for(0), 3);
        let sel = select_with_backfill(&a, &plan, pool.len(), 4);
        assert_eq!(sel.picked, vec![1, 2, 0, 3]);
        assert_eq!(sel.backfilled, 2);
    }

    #[test]
    fn test_small_pool_is_not_an_error() {
        let entries = parse_directives("0,specs", Path::new("/kb")).unwrap();
        let pool = ranked([("/kb/specs/s1.md", "s1")]);
        let a = assign_buckets(&pool, &entries, Path::new("/kb"));
        let plan = allocate(&a.available(&entries), 4);
        let sel = select_with_backfill(&a, &plan, pool.len(), 4);
        assert_eq!(sel.picked, vec![0]);
    }
}
