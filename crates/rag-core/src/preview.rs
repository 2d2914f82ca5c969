use crate::render::AssembledPrompt;
use crate::time::Timestamp;

/// Markdown report of an assembled prompt, for inspecting what the model
/// would receive without calling it.
pub fn render_preview(question: &str, prompt: &AssembledPrompt, generated_at: Timestamp) -> String {
    let mut md = format!(
        "# Final Prompt (RAG Preview)\n\n\
         **Date:** `{}`  \n\
         **Top K:** `{}`  \n\n\
         ---\n\n\
         ## Question\n\n```\n{}\n```\n\n\
         ---\n\n",
        generated_at.to_iso8601(),
        prompt.k,
        question.trim(),
    );

    if !prompt.history.is_empty() {
        md.push_str("## Recent Conversation\n\n");
        md.push_str(&prompt.history);
        md.push_str("\n\n---\n\n");
    }

    md.push_str("## Retrieved Context\n\n");
    if prompt.context.is_empty() {
        md.push_str("_No context found._");
    } else {
        md.push_str(&prompt.context);
    }

    md.push_str("\n\n---\n\n## Rendered Prompt\n\n```\n");
    md.push_str(prompt.prompt.trim());
    md.push_str("\n```\n\n---\n\n## Reference Files\n\n");

    let mut sources = prompt.sources.clone();
    sources.sort();
    sources.dedup();
    if sources.is_empty() {
        md.push_str("_No reference files found._\n");
    } else {
        for src in sources {
            md.push_str(&format!("- `{src}`\n"));
        }
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::AssemblyMetrics;

    fn prompt(context: &str, sources: &[&str]) -> AssembledPrompt {
        AssembledPrompt {
            prompt: format!("ctx: {context}"),
            context: context.into(),
            history: String::new(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
            k: 4,
            metrics: AssemblyMetrics::default(),
        }
    }

    #[test]
    fn test_preview_lists_sorted_sources() {
        let md = render_preview("why?", &prompt("### b.md\n\nx", &["b.md", "a.md"]), Timestamp::from_unix_secs(0));
        assert!(md.contains("**Date:** `1970-01-01T00:00:00Z`"));
        assert!(md.contains("**Top K:** `4`"));
        let a = md.find("- `a.md`").unwrap();
        let b = md.find("- `b.md`").unwrap();
        assert!(a < b);
        assert!(!md.contains("## Recent Conversation"));
    }

    #[test]
    fn test_preview_empty_context() {
        let md = render_preview("why?", &prompt("", &[]), Timestamp::from_unix_secs(0));
        assert!(md.contains("_No context found._"));
        assert!(md.contains("_No reference files found._"));
    }
}
