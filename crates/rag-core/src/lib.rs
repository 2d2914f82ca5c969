//! Priority-weighted retrieval context assembly.
//!
//! Given a similarity-ranked candidate pool, optional priority directives
//! over source path prefixes and optional recent conversation, selects at
//! most K passages, groups them by directive and renders them into a prompt.
//!
//! Zero I/O: callers hand in file contents, the candidate pool and the
//! clock.

pub mod allocate;
pub mod assemble;
pub mod bucket;
pub mod candidate;
pub mod chunk;
pub mod constants;
pub mod directive;
pub mod history;
pub mod paths;
pub mod preview;
pub mod render;
pub mod select;
pub mod template;
pub mod time;

pub use allocate::{AllocationPlan, AvailableBucket, allocate, weights};
pub use assemble::{AssembledContext, AssemblyMetrics, Passage, assemble_context};
pub use bucket::{Assignment, Bucket, BucketId, assign_buckets, best_match, drop_excluded};
pub use candidate::{Candidate, ranked};
pub use chunk::chunk_text;
pub use constants::{
    CHUNK_OVERLAP, CHUNK_SIZE, DEFAULT_K, DIRECTIVE_FILE, EXCLUDE_PRIORITY, HISTORY_DIR,
    HISTORY_SUFFIX, TEMPLATE_FILE, pool_size,
};
pub use directive::{PriorityEntry, active_entries, parse_directives};
pub use history::{
    HistoryExchange, format_exchange, merge_history, parse_exchange, parse_file_name,
    within_window,
};
pub use preview::render_preview;
pub use render::{AssembledPrompt, render_history, render_prompt, render_retrieved};
pub use select::{Selection, select_with_backfill, top_k};
pub use template::{EMPTY_CONTEXT, PromptTemplate};
pub use time::Timestamp;
