use std::fs;
use std::path::Path;

use rag_core::PromptTemplate;

/// The override template at `path` when it exists and is usable, else the
/// built-in template.
///
/// An override must carry both `{context}` and `{question}`; an unreadable
/// or malformed override falls back with a warning.
pub fn load_template(path: &Path, language: &str, with_history: bool) -> PromptTemplate {
    let fallback = || PromptTemplate::default_for(language, with_history);

    if !path.exists() {
        return fallback();
    }
    match fs::read_to_string(path) {
        Ok(text) if text.contains("{context}") && text.contains("{question}") => {
            tracing::debug!("using prompt template {}", path.display());
            PromptTemplate::new(text)
        }
        Ok(_) => {
            tracing::warn!(
                "template {} lacks {{context}} or {{question}}, using default",
                path.display()
            );
            fallback()
        }
        Err(e) => {
            tracing::warn!("failed to read template {}: {e}, using default", path.display());
            fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_override_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let t = load_template(&dir.path().join("none.md"), "English", false);
        assert_eq!(t, PromptTemplate::default_for("English", false));
    }

    #[test]
    fn test_valid_override_used_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.md");
        fs::write(&path, "Ctx {context}\nQ {question}").unwrap();
        assert_eq!(load_template(&path, "English", true).text(), "Ctx {context}\nQ {question}");
    }

    #[test]
    fn test_malformed_override_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.md");
        fs::write(&path, "no placeholders here").unwrap();
        assert_eq!(
            load_template(&path, "English", true),
            PromptTemplate::default_for("English", true)
        );
    }

    #[test]
    fn test_unreadable_override_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        // a directory exists but cannot be read as a file
        let t = load_template(dir.path(), "English", false);
        assert_eq!(t, PromptTemplate::default_for("English", false));
    }
}
