//! The assembly pipeline for one request: exclusion, bucket assignment,
//! allocation, selection with back-fill, then the history merge.

use std::path::Path;

use serde::Serialize;

use crate::allocate::{AllocationPlan, allocate};
use crate::bucket::{BucketId, assign_buckets, drop_excluded, source_id};
use crate::candidate::Candidate;
use crate::directive::{PriorityEntry, active_entries};
use crate::history::{HistoryExchange, merge_history};
use crate::select::{Selection, select_with_backfill, top_k};

/// A retrieved passage that made it into the context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Passage {
    /// Source identity, relative to the base directory.
    pub source: String,
    pub content: String,
    pub rank: usize,
    pub bucket: BucketId,
}

/// Counters describing one assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyMetrics {
    pub pool: usize,
    pub excluded: usize,
    pub buckets_available: usize,
    pub backfilled: usize,
    pub history_deduped: usize,
    pub retrieved: usize,
    pub history: usize,
}

/// Everything selected for one prompt, before rendering.
#[derive(Debug, Clone, Default)]
pub struct AssembledContext {
    /// Recent exchanges, newest first.
    pub history: Vec<HistoryExchange>,
    pub retrieved: Vec<Passage>,
    /// Directives that grouped the retrieved passages; empty means the
    /// passages render as one flat list.
    pub entries: Vec<PriorityEntry>,
    pub plan: AllocationPlan,
    pub metrics: AssemblyMetrics,
}

impl AssembledContext {
    /// Source identities in rendering order (history first), deduplicated.
    pub fn sources(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let all = self
            .history
            .iter()
            .map(|h| &h.source)
            .chain(self.retrieved.iter().map(|p| &p.source));
        for source in all {
            if !out.contains(source) {
                out.push(source.clone());
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.history.len() + self.retrieved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Assemble at most `k` passages and exchanges for one question.
///
/// `candidates` is the similarity-search pool, `directives` the parsed
/// directive file (exclusions included) and `history` the exchanges already
/// inside the lookback window, newest first.
pub fn assemble_context(
    mut candidates: Vec<Candidate>,
    directives: Option<&[PriorityEntry]>,
    history: &[HistoryExchange],
    base_dir: &Path,
    k: usize,
) -> AssembledContext {
    candidates.sort_by_key(|c| c.rank);
    let mut metrics = AssemblyMetrics {
        pool: candidates.len(),
        ..Default::default()
    };

    let directives = directives.unwrap_or(&[]);
    let (candidates, excluded) = drop_excluded(candidates, directives, base_dir);
    metrics.excluded = excluded;
    let entries = active_entries(directives);

    let (selection, membership, plan) = if entries.is_empty() {
        (
            top_k(candidates.len(), k),
            vec![BucketId::Unmatched; candidates.len()],
            AllocationPlan::default(),
        )
    } else {
        let assignment = assign_buckets(&candidates, &entries, base_dir);
        let available = assignment.available(&entries);
        metrics.buckets_available = available.len();
        let plan = allocate(&available, k);
        let selection = select_with_backfill(&assignment, &plan, candidates.len(), k);
        (selection, assignment.membership, plan)
    };
    let Selection { picked, backfilled } = selection;
    metrics.backfilled = backfilled;

    let picked_sources: Vec<String> = picked
        .iter()
        .map(|&i| source_id(&candidates[i], base_dir))
        .collect();
    let source_refs: Vec<&str> = picked_sources.iter().map(String::as_str).collect();
    let merged = merge_history(&source_refs, history, k);
    metrics.history_deduped = picked.len() - merged.retrieved.len();

    let retrieved: Vec<Passage> = merged
        .retrieved
        .iter()
        .map(|&pos| {
            let idx = picked[pos];
            let candidate = &candidates[idx];
            Passage {
                source: picked_sources[pos].clone(),
                content: candidate.content.clone(),
                rank: candidate.rank,
                bucket: membership[idx],
            }
        })
        .collect();
    let history: Vec<HistoryExchange> = merged
        .history
        .iter()
        .map(|&i| history[i].clone())
        .collect();

    metrics.retrieved = retrieved.len();
    metrics.history = history.len();

    AssembledContext {
        history,
        retrieved,
        entries,
        plan,
        metrics,
    }
}
