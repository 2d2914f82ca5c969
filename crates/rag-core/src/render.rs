//! Turning an assembled context into prompt text.

use serde::Serialize;

use crate::assemble::{AssembledContext, AssemblyMetrics, Passage};
use crate::bucket::BucketId;
use crate::constants::UNMATCHED_LABEL;
use crate::history::HistoryExchange;
use crate::template::PromptTemplate;

const BLOCK_SEPARATOR: &str = "\n\n---\n\n";

/// Final output of one assembly call.
#[derive(Debug, Clone, Serialize)]
pub struct AssembledPrompt {
    pub prompt: String,
    /// Rendered retrieved-context block; empty when nothing was retrieved.
    pub context: String,
    /// Rendered recent-conversation block; empty without history.
    pub history: String,
    /// Cited source identities, deduplicated.
    pub sources: Vec<String>,
    pub k: usize,
    pub metrics: AssemblyMetrics,
}

/// One block per source, passages of the same source joined under a
/// single heading, sources in order of first appearance.
pub fn render_sources(passages: &[&Passage]) -> String {
    let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
    for p in passages {
        match groups.iter().position(|(s, _)| *s == p.source) {
            Some(i) => groups[i].1.push(p.content.as_str()),
            None => groups.push((p.source.as_str(), vec![p.content.as_str()])),
        }
    }
    groups
        .iter()
        .map(|(source, contents)| format!("### {source}\n\n{}", contents.join("\n\n")))
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

fn bucket_block(label: &str, passages: &[&Passage]) -> String {
    format!("---\n# {label}\n---\n\n{}", render_sources(passages))
}

/// The retrieved-context block.
///
/// With directives, passages are grouped per bucket in ascending priority
/// order (declaration order on ties) with unmatched passages last under
/// their own heading. Without directives they render as one flat list.
pub fn render_retrieved(ctx: &AssembledContext) -> String {
    if ctx.entries.is_empty() {
        let all: Vec<&Passage> = ctx.retrieved.iter().collect();
        return render_sources(&all);
    }

    let mut order: Vec<usize> = (0..ctx.entries.len()).collect();
    order.sort_by_key(|&i| ctx.entries[i].priority);

    let mut blocks = Vec::new();
    for i in order {
        let members: Vec<&Passage> = ctx
            .retrieved
            .iter()
            .filter(|p| p.bucket == BucketId::Entry(i))
            .collect();
        if !members.is_empty() {
            blocks.push(bucket_block(ctx.entries[i].label(), &members));
        }
    }
    let unmatched: Vec<&Passage> = ctx
        .retrieved
        .iter()
        .filter(|p| p.bucket == BucketId::Unmatched)
        .collect();
    if !unmatched.is_empty() {
        blocks.push(bucket_block(UNMATCHED_LABEL, &unmatched));
    }
    blocks.join("\n\n")
}

/// The recent-conversation block, one titled section per exchange.
pub fn render_history(history: &[HistoryExchange]) -> String {
    history
        .iter()
        .map(|h| format!("### {}\n\n{}", h.title, h.content()))
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

/// Render both blocks and interpolate them with the question.
pub fn render_prompt(
    ctx: &AssembledContext,
    template: &PromptTemplate,
    question: &str,
    k: usize,
) -> AssembledPrompt {
    let context = render_retrieved(ctx);
    let history = render_history(&ctx.history);
    let prompt = template.render(
        question,
        &context,
        (!history.is_empty()).then_some(history.as_str()),
    );
    AssembledPrompt {
        prompt,
        context,
        history,
        sources: ctx.sources(),
        k,
        metrics: ctx.metrics.clone(),
    }
}
