use serde::Serialize;

/// A passage returned by the similarity search, most similar first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    /// Source document path, absolute or relative to the base directory.
    pub source: String,
    pub content: String,
    /// Position in the search result; 0 is the best match.
    pub rank: usize,
}

impl Candidate {
    pub fn new(source: impl Into<String>, content: impl Into<String>, rank: usize) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
            rank,
        }
    }
}

/// Build a ranked pool from `(source, content)` pairs in similarity order.
pub fn ranked<S, C>(items: impl IntoIterator<Item = (S, C)>) -> Vec<Candidate>
where
    S: Into<String>,
    C: Into<String>,
{
    items
        .into_iter()
        .enumerate()
        .map(|(rank, (source, content))| Candidate::new(source, content, rank))
        .collect()
}
