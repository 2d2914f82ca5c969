use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(history|context|question)\}").unwrap());

/// Stand-in for the context block when nothing was retrieved.
pub const EMPTY_CONTEXT: &str = "(no relevant context found)";

/// Prompt text with `{context}`, `{question}` and optionally `{history}`
/// placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Built-in template: answer strictly from the context, in `language`,
    /// and admit ignorance otherwise.
    pub fn default_for(language: &str, with_history: bool) -> Self {
        let mut text = format!(
            "\nUse ONLY the context below to answer.\n\
             Use the provided context even if it is written in another language.\n\
             \n\
             If you cannot find the answer in the context, say that you don't know.\n\
             Always answer in {language}.\n"
        );
        if with_history {
            text.push_str("\nRecent conversation:\n{history}\n");
        }
        text.push_str("\nContext:\n{context}\n\nQuestion:\n{question}\n");
        Self { text }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn has_history_slot(&self) -> bool {
        self.text.contains("{history}")
    }

    /// Substitute placeholders in one pass, so placeholder-like text inside
    /// the inserted values is left alone.
    ///
    /// History goes in front of the context when the template has no
    /// `{history}` slot of its own.
    pub fn render(&self, question: &str, context: &str, history: Option<&str>) -> String {
        let history = history.filter(|h| !h.is_empty());
        let context = if context.is_empty() { EMPTY_CONTEXT } else { context };
        let context = match history {
            Some(h) if !self.has_history_slot() => format!("{h}\n\n{context}"),
            _ => context.to_string(),
        };

        PLACEHOLDER
            .replace_all(&self.text, |caps: &Captures| match &caps[1] {
                "history" => history.unwrap_or("").to_string(),
                "context" => context.clone(),
                _ => question.to_string(),
            })
            .into_owned()
    }
}
