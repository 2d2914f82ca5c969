/// Default context budget (K) when nothing else is configured.
pub const DEFAULT_K: usize = 4;

/// Directive priority meaning "never use this source".
pub const EXCLUDE_PRIORITY: i64 = -1;

/// Candidate pool multiplier applied to K while directives are active.
pub const POOL_MULTIPLIER: usize = 5;

/// Lower bound on the candidate pool while directives are active.
pub const MIN_POOL: usize = 50;

/// Directive file name, relative to the base directory.
pub const DIRECTIVE_FILE: &str = ".rag_priorities";

/// Prompt template override, relative to the base directory.
pub const TEMPLATE_FILE: &str = ".rag_prompt.md";

/// Default chat history directory, relative to the base directory.
pub const HISTORY_DIR: &str = "chat_history";

/// Suffix every history exchange file name ends with.
pub const HISTORY_SUFFIX: &str = "_message.md";

/// Rendering label for candidates that match no directive.
pub const UNMATCHED_LABEL: &str = "Other";

/// Target chunk size in characters when splitting documents.
pub const CHUNK_SIZE: usize = 800;

/// Characters shared between consecutive chunks.
pub const CHUNK_OVERLAP: usize = 150;

/// Number of candidates to request from the similarity search.
///
/// Directives need a wide pool so every bucket has material to draw from.
pub fn pool_size(k: usize, directives_present: bool) -> usize {
    if directives_present {
        (k * POOL_MULTIPLIER).max(MIN_POOL)
    } else {
        k
    }
}
