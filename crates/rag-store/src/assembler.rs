//! One assembly request end to end: read the directive file, query the
//! similarity search, load recent conversation and the template, then hand
//! everything to the pure pipeline in `rag-core`.
//!
//! Every call re-reads the files, so edits to directives, templates or
//! history take effect on the next request.

use rag_core::{AssembledPrompt, Timestamp, assemble_context, pool_size, render_prompt};

use crate::config::AssemblerConfig;
use crate::directives::load_directives;
use crate::error::Result;
use crate::history::load_history;
use crate::search::SimilaritySearch;
use crate::template::load_template;

pub struct ContextAssembler<S> {
    config: AssemblerConfig,
    search: S,
}

impl<S: SimilaritySearch> ContextAssembler<S> {
    pub fn new(config: AssemblerConfig, search: S) -> Self {
        Self { config, search }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    pub fn assemble(&self, question: &str) -> Result<AssembledPrompt> {
        self.assemble_at(question, Timestamp::now())
    }

    /// Assemble against an explicit clock.
    pub fn assemble_at(&self, question: &str, now: Timestamp) -> Result<AssembledPrompt> {
        let cfg = &self.config;

        let directives = load_directives(&cfg.directive_path, &cfg.base_dir)?;
        let pool = pool_size(cfg.k, directives.is_some());
        let candidates = self.search.search(question, pool)?;

        let history = match cfg.history_window {
            Some(window) => load_history(&cfg.history_dir, &cfg.base_dir, now, window)?,
            None => Vec::new(),
        };
        let template = load_template(
            &cfg.template_path,
            &cfg.language,
            cfg.history_window.is_some(),
        );

        let ctx = assemble_context(
            candidates,
            directives.as_deref(),
            &history,
            &cfg.base_dir,
            cfg.k,
        );
        let prompt = render_prompt(&ctx, &template, question, cfg.k);

        let m = &prompt.metrics;
        tracing::debug!(
            pool = m.pool,
            excluded = m.excluded,
            buckets = m.buckets_available,
            backfilled = m.backfilled,
            history_deduped = m.history_deduped,
            retrieved = m.retrieved,
            history = m.history,
            "assembled context"
        );
        Ok(prompt)
    }
}
