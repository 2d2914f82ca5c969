//! Mapping ranked candidates onto directive buckets by longest path prefix.

use std::path::Path;

use serde::Serialize;

use crate::allocate::AvailableBucket;
use crate::candidate::Candidate;
use crate::directive::PriorityEntry;
use crate::paths;

/// Identity of a bucket: the index of its directive in declaration order,
/// or the reserved pool of candidates that matched nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum BucketId {
    Entry(usize),
    Unmatched,
}

/// Candidates matched to one directive, in similarity order.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    /// Indices into the candidate pool.
    pub members: Vec<usize>,
}

/// Result of bucket assignment over one candidate pool.
#[derive(Debug, Clone)]
pub struct Assignment {
    /// One bucket per directive, same order as the directive list.
    pub buckets: Vec<Bucket>,
    pub unmatched: Vec<usize>,
    /// Bucket of every candidate, indexed like the pool.
    pub membership: Vec<BucketId>,
}

impl Assignment {
    pub fn bucket_of(&self, candidate: usize) -> BucketId {
        self.membership
            .get(candidate)
            .copied()
            .unwrap_or(BucketId::Unmatched)
    }

    pub fn members(&self, id: BucketId) -> &[usize] {
        match id {
            BucketId::Entry(i) => self
                .buckets
                .get(i)
                .map(|b| b.members.as_slice())
                .unwrap_or(&[]),
            BucketId::Unmatched => &self.unmatched,
        }
    }

    /// Buckets holding at least one candidate, in declaration order.
    pub fn available(&self, entries: &[PriorityEntry]) -> Vec<AvailableBucket> {
        self.buckets
            .iter()
            .zip(entries)
            .enumerate()
            .filter(|(_, (bucket, _))| !bucket.members.is_empty())
            .map(|(entry, (_, e))| AvailableBucket {
                entry,
                priority: e.priority,
            })
            .collect()
    }
}

/// Index of the directive whose path is the longest prefix of `relative_source`.
/// Equal depths resolve to the first declared directive.
pub fn best_match(entries: &[PriorityEntry], relative_source: &str) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (idx, entry) in entries.iter().enumerate() {
        if let Some(depth) = paths::prefix_depth(&entry.relative_path, relative_source)
            && best.is_none_or(|(_, d)| depth > d)
        {
            best = Some((idx, depth));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Source identity of a candidate: its path relative to the base directory.
pub fn source_id(candidate: &Candidate, base_dir: &Path) -> String {
    paths::relative_to(Path::new(&candidate.source), base_dir)
}

/// Drop candidates governed by an exclusion directive.
///
/// The longest matching directive decides, so `-1,docs` with `2,docs/public`
/// still admits `docs/public/*`. Returns the kept pool and the number dropped.
pub fn drop_excluded(
    candidates: Vec<Candidate>,
    entries: &[PriorityEntry],
    base_dir: &Path,
) -> (Vec<Candidate>, usize) {
    let before = candidates.len();
    let kept: Vec<Candidate> = candidates
        .into_iter()
        .filter(|c| {
            best_match(entries, &source_id(c, base_dir)).is_none_or(|i| !entries[i].is_excluded())
        })
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

/// Assign each candidate (already in similarity order) to a bucket.
pub fn assign_buckets(
    candidates: &[Candidate],
    entries: &[PriorityEntry],
    base_dir: &Path,
) -> Assignment {
    let mut buckets = vec![Bucket::default(); entries.len()];
    let mut unmatched = Vec::new();
    let mut membership = Vec::with_capacity(candidates.len());

    for (idx, candidate) in candidates.iter().enumerate() {
        match best_match(entries, &source_id(candidate, base_dir)) {
            Some(entry) => {
                buckets[entry].members.push(idx);
                membership.push(BucketId::Entry(entry));
            }
            None => {
                unmatched.push(idx);
                membership.push(BucketId::Unmatched);
            }
        }
    }

    Assignment {
        buckets,
        unmatched,
        membership,
    }
}
